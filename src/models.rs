use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeModule {
    Money,
    Sales,
    Finance,
    Dating,
    Mindset,
    Health,
    Lifestyle,
    Business,
    Productivity,
    EmotionalIntelligence,
    CriticalThinking,
    Communication,
}

impl LifeModule {
    pub const ALL: [LifeModule; 12] = [
        Self::Money,
        Self::Sales,
        Self::Finance,
        Self::Dating,
        Self::Mindset,
        Self::Health,
        Self::Lifestyle,
        Self::Business,
        Self::Productivity,
        Self::EmotionalIntelligence,
        Self::CriticalThinking,
        Self::Communication,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Sales => "sales",
            Self::Finance => "finance",
            Self::Dating => "dating",
            Self::Mindset => "mindset",
            Self::Health => "health",
            Self::Lifestyle => "lifestyle",
            Self::Business => "business",
            Self::Productivity => "productivity",
            Self::EmotionalIntelligence => "emotional_intelligence",
            Self::CriticalThinking => "critical_thinking",
            Self::Communication => "communication",
        }
    }

    pub fn parse_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingStyle {
    Direct,
    Supportive,
    #[default]
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Custom,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NinetyDayGoal {
    pub goal: String,
    #[serde(default)]
    pub target_level: u8,
    #[serde(default)]
    pub start_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub coaching_style: CoachingStyle,
    #[serde(default)]
    pub focus_modules: BTreeSet<LifeModule>,
    #[serde(default)]
    pub module_levels: BTreeMap<LifeModule, u8>,
    #[serde(default)]
    pub daily_time_available_minutes: u32,
    #[serde(default)]
    pub top_goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub goals_90_day: BTreeMap<LifeModule, NinetyDayGoal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    /// Keys written by other tools; carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MorningCheckin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub top_3_priorities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_definition: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EveningReflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
    #[serde(default)]
    pub wins: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub lessons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_for_tomorrow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_win_achieved: Option<bool>,
    /// e.g. `gratitude` lists from older check-in flows.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlannedAction {
    pub module: String,
    #[serde(default)]
    pub module_name: String,
    pub text: String,
    /// Planned minutes.
    #[serde(default)]
    pub time: u32,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PlannedAction {
    pub fn same_action(&self, other: &PlannedAction) -> bool {
        self.module == other.module && self.text == other.text
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyMetrics {
    #[serde(default)]
    pub deep_work_hours: f64,
    #[serde(default)]
    pub workouts: u32,
    #[serde(flatten)]
    pub counters: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub am_checkin: Option<MorningCheckin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm_reflection: Option<EveningReflection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_actions: Vec<PlannedAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_actions: Vec<PlannedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DailyMetrics>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DailyLog {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            created_at: None,
            updated_at: None,
            am_checkin: None,
            pm_reflection: None,
            planned_actions: Vec::new(),
            completed_actions: Vec::new(),
            metrics: None,
            notes: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub module: LifeModule,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub total_completions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// Input for adding a habit. `id` is derived from `name` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub module: LifeModule,
    #[serde(default)]
    pub frequency: Frequency,
}

impl NewHabit {
    pub fn daily(name: impl Into<String>, module: LifeModule) -> Self {
        Self {
            id: None,
            name: name.into(),
            module,
            frequency: Frequency::Daily,
        }
    }
}

/// The `habits.json` document: definitions plus the date-indexed completion set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HabitsDocument {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: BTreeMap<NaiveDate, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl HabitsDocument {
    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    pub fn is_completed_on(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.completions
            .get(&date)
            .map(|ids| ids.contains(habit_id))
            .unwrap_or(false)
    }

    /// Every date on which `habit_id` was completed, ascending.
    pub fn completion_dates(&self, habit_id: &str) -> Vec<NaiveDate> {
        self.completions
            .iter()
            .filter(|(_, ids)| ids.contains(habit_id))
            .map(|(date, _)| *date)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub lifetime_vision: String,
    #[serde(default)]
    pub yearly_goals: Vec<String>,
    /// Older goal files store an empty list here.
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub quarterly_goals: BTreeMap<LifeModule, NinetyDayGoal>,
    #[serde(default)]
    pub monthly_goals: Vec<String>,
    #[serde(default)]
    pub weekly_goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GoalsByModule {
    Map(BTreeMap<LifeModule, NinetyDayGoal>),
    List(Vec<Value>),
}

/// Accepts a map, or a list (the legacy placeholder) as an empty map.
fn map_or_empty_list<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<LifeModule, NinetyDayGoal>, D::Error>
where
    D: Deserializer<'de>,
{
    match GoalsByModule::deserialize(deserializer)? {
        GoalsByModule::Map(goals) => Ok(goals),
        GoalsByModule::List(_) => Ok(BTreeMap::new()),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, alias = "total_days_logged")]
    pub days_logged: u32,
    #[serde(default)]
    pub am_checkins: u32,
    #[serde(default)]
    pub pm_reflections: u32,
    #[serde(default)]
    pub avg_sleep: f64,
    #[serde(default)]
    pub avg_energy: f64,
    #[serde(default)]
    pub avg_day_score: f64,
    #[serde(default, alias = "total_deep_work")]
    pub total_deep_work_hours: f64,
    #[serde(default)]
    pub total_workouts: u32,
    #[serde(default)]
    pub habit_completion_rate: f64,
    #[serde(default)]
    pub tasks_planned: u32,
    #[serde(default)]
    pub tasks_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyReview {
    #[serde(default)]
    pub week: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub module_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub top_wins: Vec<String>,
    #[serde(default)]
    pub key_lessons: Vec<String>,
    #[serde(default)]
    pub next_week_focus: String,
    #[serde(default)]
    pub next_week_targets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    pub read_cache_enabled: bool,
    pub read_cache_capacity: usize,
    pub default_stats_window_days: u32,
    pub stats_ranges: Vec<u32>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            read_cache_enabled: true,
            read_cache_capacity: 256,
            default_stats_window_days: 30,
            stats_ranges: vec![7, 30, 90],
        }
    }
}
