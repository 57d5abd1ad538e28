//! Habit definitions and the completion ledger.
//!
//! Completion events are the source of truth. `current_streak`, `best_streak`
//! and `total_completions` on each [`Habit`] are cached values, rewritten only
//! by [`HabitLedger::record_completion`] through [`recompute_habit_counters`].
//! A streak that lapses is not reset until the habit's next completion.

use crate::errors::{AppError, AppResult};
use crate::models::{Habit, HabitsDocument, LifeModule, NewHabit};
use crate::store::RecordStore;
use crate::validation::validate_new_habit;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

pub const HABITS_ID: &str = "habits";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub habit: Habit,
    /// False when the `(habit, date)` pair was already on record.
    pub recorded: bool,
}

pub struct HabitLedger {
    store: Arc<RecordStore>,
    write_lock: Mutex<()>,
}

impl HabitLedger {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The whole ledger document. Missing or unreadable yields the empty ledger.
    pub fn snapshot(&self) -> HabitsDocument {
        self.store.get_or_absent::<HabitsDocument>(HABITS_ID).unwrap_or_default()
    }

    pub fn habit(&self, habit_id: &str) -> Option<Habit> {
        self.snapshot().habit(habit_id).cloned()
    }

    pub fn habits_by_module(&self, module: LifeModule) -> Vec<Habit> {
        self.snapshot()
            .habits
            .into_iter()
            .filter(|habit| habit.module == module)
            .collect()
    }

    pub fn completions_on(&self, date: NaiveDate) -> Vec<String> {
        self.snapshot()
            .completions
            .get(&date)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_completed_on(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.snapshot().is_completed_on(habit_id, date)
    }

    /// One entry per day for the `days` days ending today, oldest first.
    pub fn habit_history(&self, habit_id: &str, days: u32) -> AppResult<Vec<(NaiveDate, bool)>> {
        let document = self.snapshot();
        if document.habit(habit_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Habit '{}' not found",
                habit_id
            )));
        }
        let today = self.store.clock().today();
        let mut history = Vec::with_capacity(days as usize);
        let mut day = today;
        for _ in 0..days {
            history.push((day, document.is_completed_on(habit_id, day)));
            match day.pred_opt() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        history.reverse();
        Ok(history)
    }

    pub fn add_habit(&self, spec: NewHabit) -> AppResult<Habit> {
        validate_new_habit(&spec)?;
        let now = self.store.clock().now();

        let habit = self.mutate("habit", |document| {
            let base = spec.id.clone().unwrap_or_else(|| habit_id_from_name(&spec.name));
            let habit = Habit {
                id: unique_habit_id(&base, &document.habits),
                name: spec.name.trim().to_string(),
                module: spec.module,
                frequency: spec.frequency,
                current_streak: 0,
                best_streak: 0,
                total_completions: 0,
                created_at: Some(now),
            };
            document.habits.push(habit.clone());
            Ok((habit, true))
        })?;

        tracing::info!(
            habit_id = %habit.id,
            module = habit.module.as_str(),
            frequency = habit.frequency.as_str(),
            "habit added"
        );
        Ok(habit)
    }

    /// Records `habit_id` as done on `date`. Recording the same pair twice is a no-op.
    pub fn record_completion(
        &self,
        habit_id: &str,
        date: NaiveDate,
    ) -> AppResult<CompletionOutcome> {
        let today = self.store.clock().today();
        if date > today {
            return Err(AppError::Validation(format!(
                "cannot record '{}' for {} which is after today ({})",
                habit_id, date, today
            )));
        }

        let outcome = self.mutate("habit completion", |document| {
            let Some(index) = document.habits.iter().position(|habit| habit.id == habit_id) else {
                return Err(AppError::NotFound(format!(
                    "Habit '{}' not found",
                    habit_id
                )));
            };
            if document.is_completed_on(habit_id, date) {
                let habit = document.habits[index].clone();
                let outcome = CompletionOutcome {
                    habit,
                    recorded: false,
                };
                return Ok((outcome, false));
            }

            document.completions.entry(date).or_default().insert(habit_id.to_string());
            let dates = document.completion_dates(habit_id);
            let habit = &mut document.habits[index];
            habit.total_completions = habit.total_completions.saturating_add(1);
            recompute_habit_counters(habit, &dates, today);

            let habit = habit.clone();
            let outcome = CompletionOutcome {
                habit,
                recorded: true,
            };
            Ok((outcome, true))
        })?;

        if outcome.recorded {
            tracing::info!(
                habit_id,
                date = %date,
                current_streak = outcome.habit.current_streak,
                best_streak = outcome.habit.best_streak,
                "habit completion recorded"
            );
        } else {
            tracing::debug!(habit_id, date = %date, "habit completion already recorded");
        }
        Ok(outcome)
    }

    /// Removes the definition. Its completion events stay in the ledger.
    pub fn remove_habit(&self, habit_id: &str) -> AppResult<Habit> {
        let removed = self.mutate("habit removal", |document| {
            let Some(index) = document.habits.iter().position(|habit| habit.id == habit_id) else {
                return Err(AppError::NotFound(format!(
                    "Habit '{}' not found",
                    habit_id
                )));
            };
            Ok((document.habits.remove(index), true))
        })?;
        tracing::info!(habit_id, "habit removed");
        Ok(removed)
    }

    /// One read-modify-write cycle on the ledger document, serialized in-process.
    fn mutate<T, F>(&self, what: &str, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut HabitsDocument) -> AppResult<(T, bool)>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Internal("habit ledger mutex poisoned".to_string()))?;

        let mut document = self
            .store
            .get_for_update::<HabitsDocument>(HABITS_ID)?
            .unwrap_or_default();
        let (value, changed) = apply(&mut document)?;
        if changed {
            self.store
                .put(HABITS_ID, &mut document)
                .map_err(|error| error.while_saving(what))?;
        }
        Ok(value)
    }
}

/// Lower-cased, underscored id for a habit name ("Deep Work" -> "deep_work").
pub fn habit_id_from_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    let cleaned = out.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "habit".to_string()
    } else {
        cleaned
    }
}

/// `base`, or `base_1`, `base_2`, ... whichever is first free.
pub fn unique_habit_id(base: &str, existing: &[Habit]) -> String {
    let taken = |candidate: &str| existing.iter().any(|habit| habit.id == candidate);
    if !taken(base) {
        return base.to_string();
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{}_{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Consecutive-day streak ending today or yesterday.
///
/// Dates are walked newest first. The newest may be today or yesterday (the
/// day is not over yet); each following date must be exactly one day before
/// the previous one. A gap, a duplicate or a date after today ends the walk.
pub fn compute_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut streak = 0u32;
    let mut expected = today;
    for date in sorted {
        let extends = if streak == 0 {
            date == expected || Some(date) == expected.pred_opt()
        } else {
            date == expected
        };
        if !extends {
            break;
        }
        streak += 1;
        match date.pred_opt() {
            Some(previous) => expected = previous,
            None => break,
        }
    }
    streak
}

/// Rewrites the cached streak fields from the habit's completion dates.
/// `best_streak` never decreases.
pub fn recompute_habit_counters(
    habit: &mut Habit,
    completion_dates: &[NaiveDate],
    today: NaiveDate,
) {
    habit.current_streak = compute_streak(completion_dates, today);
    habit.best_streak = habit.best_streak.max(habit.current_streak);
}
