use crate::codec::merge_json;
use crate::errors::{AppError, AppResult};
use crate::models::TrackerSettings;
use crate::store::RecordStore;
use std::ffi::OsString;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "SELF_MASTERY_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "data";

const SETTINGS_ID: &str = "settings";

/// Data root from `SELF_MASTERY_DATA_DIR`, else `./data`.
pub fn data_dir_from_env() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV))
}

fn data_dir_from(value: Option<OsString>) -> PathBuf {
    value
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Stored settings, or the defaults when none are stored or readable.
pub fn load_settings(store: &RecordStore) -> TrackerSettings {
    store.get_or_absent::<TrackerSettings>(SETTINGS_ID).unwrap_or_default()
}

pub fn save_settings(store: &RecordStore, settings: &mut TrackerSettings) -> AppResult<()> {
    validate_settings(settings)?;
    store
        .put(SETTINGS_ID, settings)
        .map_err(|error| error.while_saving("settings"))
}

/// Deep-merges `update` into the current settings and persists the result.
pub fn update_settings(
    store: &RecordStore,
    update: serde_json::Value,
) -> AppResult<TrackerSettings> {
    let current = load_settings(store);
    let mut merged = serde_json::to_value(current)?;
    merge_json(&mut merged, update);
    let mut settings: TrackerSettings = serde_json::from_value(merged)
        .map_err(|error| AppError::Validation(format!("invalid settings update: {}", error)))?;

    save_settings(store, &mut settings)?;
    tracing::info!(
        read_cache_enabled = settings.read_cache_enabled,
        default_stats_window_days = settings.default_stats_window_days,
        "settings updated"
    );
    Ok(settings)
}

fn validate_settings(settings: &TrackerSettings) -> AppResult<()> {
    if settings.read_cache_capacity == 0 {
        return Err(AppError::Validation(
            "readCacheCapacity must be at least 1".to_string(),
        ));
    }
    if settings.default_stats_window_days == 0 {
        return Err(AppError::Validation(
            "defaultStatsWindowDays must be at least 1".to_string(),
        ));
    }
    if settings.stats_ranges.contains(&0) {
        return Err(AppError::Validation(
            "statsRanges entries must be at least 1".to_string(),
        ));
    }
    Ok(())
}
