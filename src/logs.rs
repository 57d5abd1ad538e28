use crate::codec::merge_json;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyLog, DailyMetrics, EveningReflection, MorningCheckin};
use crate::store::{RecordKind, RecordStore};
use crate::validation::{date_key, parse_date_key, validate_evening, validate_log, validate_morning};
use chrono::{Days, NaiveDate};
use std::sync::{Arc, Mutex};

/// Per-day logs: reads, merging saves and date-range resolution.
pub struct LogBook {
    store: Arc<RecordStore>,
    write_lock: Mutex<()>,
}

impl LogBook {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn get_log(&self, date: NaiveDate) -> Option<DailyLog> {
        self.store.get_or_absent::<DailyLog>(&date_key(date))
    }

    /// The stored log, or an unsaved template with zeroed metrics.
    pub fn get_or_create_log(&self, date: NaiveDate) -> DailyLog {
        if let Some(existing) = self.get_log(date) {
            return existing;
        }
        let mut template = DailyLog::new(date);
        template.created_at = Some(self.store.clock().now());
        template.metrics = Some(DailyMetrics::default());
        template
    }

    /// Saves `log` under `date`, merging into whatever is already stored for
    /// that day. Fields absent from `log` keep their stored values. The
    /// read-merge-write cycle is serialized in-process.
    pub fn save_log(&self, mut log: DailyLog, date: NaiveDate) -> AppResult<DailyLog> {
        let key = date_key(date);
        log.date = date;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Internal("daily log mutex poisoned".to_string()))?;

        let (existing, corrupt) = match self.store.get::<DailyLog>(&key) {
            Ok(existing) => (existing, false),
            Err(AppError::Decode(_)) => (None, true),
            Err(error) => return Err(error),
        };
        let mut merged = match existing {
            Some(existing) => merge_logs(existing, log)?,
            None => log,
        };
        validate_log(&merged)?;

        if corrupt {
            let moved = self.store.quarantine(RecordKind::DailyLog, &key)?;
            tracing::warn!(
                date = %key,
                moved_to = ?moved,
                "quarantined undecodable daily log before rewrite"
            );
        }
        self.store
            .put(&key, &mut merged)
            .map_err(|error| error.while_saving("daily log"))?;
        Ok(merged)
    }

    pub fn save_morning_checkin(
        &self,
        date: NaiveDate,
        mut checkin: MorningCheckin,
    ) -> AppResult<DailyLog> {
        validate_morning(&checkin)?;
        checkin.time.get_or_insert_with(|| self.store.clock().now());
        let mut log = DailyLog::new(date);
        log.am_checkin = Some(checkin);
        self.save_log(log, date)
    }

    pub fn save_evening_reflection(
        &self,
        date: NaiveDate,
        mut reflection: EveningReflection,
    ) -> AppResult<DailyLog> {
        validate_evening(&reflection)?;
        reflection.time.get_or_insert_with(|| self.store.clock().now());
        let mut log = DailyLog::new(date);
        log.pm_reflection = Some(reflection);
        self.save_log(log, date)
    }

    /// Stored logs with `start <= date <= end`, ascending. Days without a
    /// readable log are skipped; an inverted range is empty.
    pub fn logs_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<DailyLog>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut logs = Vec::new();
        for id in self.store.list_ids(RecordKind::DailyLog)? {
            let Ok(date) = parse_date_key(&id) else {
                continue;
            };
            if date < start || date > end {
                continue;
            }
            if let Some(log) = self.store.get_or_absent::<DailyLog>(&id) {
                logs.push(log);
            }
        }
        Ok(logs)
    }

    /// Logs of the last `days` days, today included.
    pub fn recent_logs(&self, days: u32) -> AppResult<Vec<DailyLog>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let today = self.store.clock().today();
        self.logs_in_range(window_start(today, days), today)
    }

    pub fn recent_wins(&self, days: u32) -> AppResult<Vec<String>> {
        Ok(self
            .recent_logs(days)?
            .into_iter()
            .filter_map(|log| log.pm_reflection)
            .flat_map(|reflection| reflection.wins)
            .collect())
    }

    pub fn recent_challenges(&self, days: u32) -> AppResult<Vec<String>> {
        Ok(self
            .recent_logs(days)?
            .into_iter()
            .filter_map(|log| log.pm_reflection)
            .flat_map(|reflection| reflection.challenges)
            .collect())
    }
}

/// First day of a `days`-long window ending on `end`.
pub fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

fn merge_logs(base: DailyLog, update: DailyLog) -> AppResult<DailyLog> {
    let mut merged = serde_json::to_value(&base)?;
    merge_json(&mut merged, serde_json::to_value(&update)?);
    Ok(serde_json::from_value(merged)?)
}
