pub mod clock;
pub mod codec;
pub mod config;
pub mod errors;
pub mod habits;
pub mod logs;
pub mod models;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod validation;
pub mod weekly;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::errors::{AppError, AppResult, DecodeError};
pub use crate::habits::{compute_streak, recompute_habit_counters, CompletionOutcome};
pub use crate::models::{
    CoachingStyle, DailyLog, DailyMetrics, EveningReflection, Frequency, Goals, Habit,
    HabitsDocument, LifeModule, MorningCheckin, NewHabit, NinetyDayGoal, PlannedAction, Stats,
    TrackerSettings, UserProfile, WeeklyReview,
};
pub use crate::stats::{aggregate, StatsWindow};
pub use crate::store::{RecordKind, RecordStore};
pub use crate::tracker::TrackerCore;
pub use crate::weekly::{week_label, week_window};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs JSON logging to a daily rolling `tracker.log` under
/// `<data_dir>/diagnostics/`. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("diagnostics");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
