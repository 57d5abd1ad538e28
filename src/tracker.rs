use crate::clock::{Clock, SystemClock};
use crate::config;
use crate::errors::{AppError, AppResult};
use crate::habits::{CompletionOutcome, HabitLedger};
use crate::logs::LogBook;
use crate::models::{
    DailyLog, EveningReflection, Goals, Habit, HabitsDocument, LifeModule, MorningCheckin, NewHabit,
    Stats, TrackerSettings, UserProfile, WeeklyReview,
};
use crate::stats::{aggregate, StatsWindow};
use crate::store::{RecordKind, RecordStore};
use crate::validation::{validate_goals, validate_profile};
use crate::weekly::{week_label, week_window, ReviewBook};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const PROFILE_ID: &str = "user_profile";
const GOALS_ID: &str = "goals";

/// The record store and statistics engine for one data root. Built once at
/// start-up and shared by reference.
pub struct TrackerCore {
    store: Arc<RecordStore>,
    habits: HabitLedger,
    logs: LogBook,
    reviews: ReviewBook,
    settings: RwLock<TrackerSettings>,
}

impl TrackerCore {
    pub fn open(data_dir: impl Into<PathBuf>) -> AppResult<Arc<Self>> {
        Self::open_with_clock(data_dir, Arc::new(SystemClock))
    }

    /// Opens the data root named by `SELF_MASTERY_DATA_DIR` (default `./data`).
    pub fn from_env() -> AppResult<Arc<Self>> {
        Self::open(config::data_dir_from_env())
    }

    pub fn open_with_clock(
        data_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Arc<Self>> {
        let data_dir = data_dir.into();
        let mut store = RecordStore::open(&data_dir, clock)?;
        let settings = config::load_settings(&store);
        if settings.read_cache_enabled {
            store = store.with_read_cache(settings.read_cache_capacity);
        }
        let store = Arc::new(store);

        tracing::info!(
            data_dir = %data_dir.display(),
            read_cache = settings.read_cache_enabled,
            "tracker opened"
        );

        Ok(Arc::new(Self {
            habits: HabitLedger::new(store.clone()),
            logs: LogBook::new(store.clone()),
            reviews: ReviewBook::new(store.clone()),
            store,
            settings: RwLock::new(settings),
        }))
    }

    pub fn data_dir(&self) -> &Path {
        self.store.root()
    }

    pub fn today(&self) -> NaiveDate {
        self.store.clock().today()
    }

    // Profile

    pub fn user_exists(&self) -> bool {
        self.store.exists(RecordKind::Profile, PROFILE_ID)
    }

    pub fn get_profile(&self) -> Option<UserProfile> {
        self.store.get_or_absent::<UserProfile>(PROFILE_ID)
    }

    pub fn save_profile(&self, mut profile: UserProfile) -> AppResult<UserProfile> {
        validate_profile(&profile)?;
        if let Some(previous) = self.store.get_for_update::<UserProfile>(PROFILE_ID)? {
            profile.created_at = profile.created_at.or(previous.created_at);
        }
        self.store
            .put(PROFILE_ID, &mut profile)
            .map_err(|error| error.while_saving("profile"))?;
        Ok(profile)
    }

    // Daily logs

    pub fn get_log(&self, date: NaiveDate) -> Option<DailyLog> {
        self.logs.get_log(date)
    }

    pub fn save_log(&self, log: DailyLog, date: NaiveDate) -> AppResult<DailyLog> {
        self.logs.save_log(log, date)
    }

    pub fn get_or_create_log(&self, date: NaiveDate) -> DailyLog {
        self.logs.get_or_create_log(date)
    }

    pub fn save_morning_checkin(
        &self,
        date: NaiveDate,
        checkin: MorningCheckin,
    ) -> AppResult<DailyLog> {
        self.logs.save_morning_checkin(date, checkin)
    }

    pub fn save_evening_reflection(
        &self,
        date: NaiveDate,
        reflection: EveningReflection,
    ) -> AppResult<DailyLog> {
        self.logs.save_evening_reflection(date, reflection)
    }

    pub fn logs_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<DailyLog>> {
        self.logs.logs_in_range(start, end)
    }

    pub fn recent_logs(&self, days: u32) -> AppResult<Vec<DailyLog>> {
        self.logs.recent_logs(days)
    }

    pub fn recent_wins(&self, days: u32) -> AppResult<Vec<String>> {
        self.logs.recent_wins(days)
    }

    pub fn recent_challenges(&self, days: u32) -> AppResult<Vec<String>> {
        self.logs.recent_challenges(days)
    }

    // Habits

    pub fn get_habits(&self) -> HabitsDocument {
        self.habits.snapshot()
    }

    pub fn habit(&self, habit_id: &str) -> Option<Habit> {
        self.habits.habit(habit_id)
    }

    pub fn habits_by_module(&self, module: LifeModule) -> Vec<Habit> {
        self.habits.habits_by_module(module)
    }

    pub fn add_habit(&self, spec: NewHabit) -> AppResult<Habit> {
        self.habits.add_habit(spec)
    }

    /// Records a completion on `date`, today when `None`.
    pub fn record_completion(
        &self,
        habit_id: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<CompletionOutcome> {
        let date = date.unwrap_or_else(|| self.today());
        self.habits.record_completion(habit_id, date)
    }

    pub fn remove_habit(&self, habit_id: &str) -> AppResult<Habit> {
        self.habits.remove_habit(habit_id)
    }

    pub fn is_completed_on(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.habits.is_completed_on(habit_id, date)
    }

    pub fn completions_on(&self, date: NaiveDate) -> Vec<String> {
        self.habits.completions_on(date)
    }

    pub fn habit_history(&self, habit_id: &str, days: u32) -> AppResult<Vec<(NaiveDate, bool)>> {
        self.habits.habit_history(habit_id, days)
    }

    // Goals

    /// Stored goals, or empty goals when none are stored or readable.
    pub fn get_goals(&self) -> Goals {
        self.store.get_or_absent::<Goals>(GOALS_ID).unwrap_or_default()
    }

    pub fn save_goals(&self, mut goals: Goals) -> AppResult<Goals> {
        validate_goals(&goals)?;
        match self.store.get::<Goals>(GOALS_ID) {
            Ok(_) => {}
            Err(AppError::Decode(error)) => {
                let moved = self.store.quarantine(RecordKind::Goals, GOALS_ID)?;
                tracing::warn!(
                    error = %error,
                    moved_to = ?moved,
                    "quarantined undecodable goals before rewrite"
                );
            }
            Err(error) => return Err(error),
        }
        self.store
            .put(GOALS_ID, &mut goals)
            .map_err(|error| error.while_saving("goals"))?;
        Ok(goals)
    }

    // Weekly reviews

    pub fn get_review(&self, week: &str) -> AppResult<Option<WeeklyReview>> {
        self.reviews.get_review(week)
    }

    pub fn save_review(&self, review: WeeklyReview, week: &str) -> AppResult<WeeklyReview> {
        self.reviews.save_review(review, week)
    }

    pub fn list_reviews(&self) -> AppResult<Vec<String>> {
        self.reviews.list_reviews()
    }

    /// Statistics for the Monday-to-Sunday week containing `date`.
    pub fn week_stats(&self, date: NaiveDate) -> AppResult<Stats> {
        let (monday, sunday) = week_window(date);
        let logs = self.logs.logs_in_range(monday, sunday)?;
        let window = StatsWindow::new(monday, sunday);
        Ok(aggregate(&logs, &self.habits.snapshot(), window))
    }

    /// An unsaved review for the week containing `date`, with its dates and
    /// statistics filled in and the week's wins as a starting point.
    pub fn draft_review(&self, date: NaiveDate) -> AppResult<WeeklyReview> {
        let (monday, sunday) = week_window(date);
        let logs = self.logs.logs_in_range(monday, sunday)?;
        let window = StatsWindow::new(monday, sunday);
        let stats = aggregate(&logs, &self.habits.snapshot(), window);
        let top_wins = logs
            .into_iter()
            .filter_map(|log| log.pm_reflection)
            .flat_map(|reflection| reflection.wins)
            .take(3)
            .collect();

        Ok(WeeklyReview {
            week: week_label(date),
            start_date: Some(monday),
            end_date: Some(sunday),
            stats,
            top_wins,
            ..WeeklyReview::default()
        })
    }

    // Statistics

    /// Statistics over the `window_days` days ending today.
    pub fn get_stats(&self, window_days: u32) -> AppResult<Stats> {
        if window_days == 0 {
            return Err(AppError::Validation(
                "stats window must be at least one day".to_string(),
            ));
        }
        let window = StatsWindow::ending_on(self.today(), window_days);
        let logs = self.logs.logs_in_range(window.start, window.end)?;
        Ok(aggregate(&logs, &self.habits.snapshot(), window))
    }

    /// Statistics over the configured default window (30 days unless changed).
    pub fn get_default_stats(&self) -> AppResult<Stats> {
        self.get_stats(self.settings().default_stats_window_days)
    }

    pub fn get_stats_for_ranges(&self, ranges: &[u32]) -> AppResult<BTreeMap<u32, Stats>> {
        let mut by_range = BTreeMap::new();
        for days in ranges {
            by_range.insert(*days, self.get_stats(*days)?);
        }
        Ok(by_range)
    }

    /// Statistics for every configured range (7/30/90 days by default).
    pub fn stats_overview(&self) -> AppResult<BTreeMap<u32, Stats>> {
        self.get_stats_for_ranges(&self.settings().stats_ranges)
    }

    // Settings

    pub fn settings(&self) -> TrackerSettings {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Deep-merges `update` into the settings. Cache settings apply on the next open.
    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<TrackerSettings> {
        let updated = config::update_settings(&self.store, update)?;
        let mut settings = self
            .settings
            .write()
            .map_err(|_| AppError::Internal("settings lock poisoned".to_string()))?;
        *settings = updated.clone();
        Ok(updated)
    }

    // Reset

    /// Deletes every user record: profile, logs, habits, goals and reviews.
    /// Settings are kept.
    pub fn reset_all(&self) -> AppResult<usize> {
        let mut removed = 0;
        for kind in RecordKind::ALL {
            if kind == RecordKind::Settings {
                continue;
            }
            for id in self.store.list_ids(kind)? {
                if self.store.remove(kind, &id)? {
                    removed += 1;
                }
            }
        }
        tracing::warn!(removed, data_dir = %self.store.root().display(), "all records reset");
        Ok(removed)
    }
}
