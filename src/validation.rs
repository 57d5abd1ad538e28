use crate::errors::{AppError, AppResult};
use crate::models::{
    DailyLog, EveningReflection, Goals, MorningCheckin, NewHabit, UserProfile, WeeklyReview,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MAX_PRIORITIES: usize = 3;

static WEEK_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-W\d{2}$").expect("valid regex"));
static HABIT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex"));

pub fn is_week_label(value: &str) -> bool {
    WEEK_LABEL.is_match(value)
}

pub fn is_habit_id(value: &str) -> bool {
    HABIT_ID.is_match(value)
}

/// Parses a strict `YYYY-MM-DD` key; `2024-1-5` is rejected so one date has one file name.
pub fn parse_date_key(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == value)
        .ok_or_else(|| AppError::Validation(format!("'{}' is not a YYYY-MM-DD date", value)))
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn ensure_week_label(value: &str) -> AppResult<()> {
    if is_week_label(value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{}' is not a YYYY-WNN week label",
            value
        )))
    }
}

fn ensure_score(field: &str, value: Option<u8>) -> AppResult<()> {
    match value {
        Some(score) if !(1..=10).contains(&score) => Err(AppError::Validation(format!(
            "{} must be between 1 and 10, got {}",
            field, score
        ))),
        _ => Ok(()),
    }
}

pub fn validate_morning(checkin: &MorningCheckin) -> AppResult<()> {
    if let Some(hours) = checkin.sleep_hours {
        if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
            return Err(AppError::Validation(format!(
                "sleep_hours must be between 0 and 24, got {}",
                hours
            )));
        }
    }
    ensure_score("sleep_quality", checkin.sleep_quality)?;
    ensure_score("energy_level", checkin.energy_level)?;
    if checkin.top_3_priorities.len() > MAX_PRIORITIES {
        return Err(AppError::Validation(format!(
            "at most {} priorities allowed, got {}",
            MAX_PRIORITIES,
            checkin.top_3_priorities.len()
        )));
    }
    Ok(())
}

pub fn validate_evening(reflection: &EveningReflection) -> AppResult<()> {
    ensure_score("day_score", reflection.day_score)
}

pub fn validate_log(log: &DailyLog) -> AppResult<()> {
    if let Some(checkin) = log.am_checkin.as_ref() {
        validate_morning(checkin)?;
    }
    if let Some(reflection) = log.pm_reflection.as_ref() {
        validate_evening(reflection)?;
    }
    if let Some(metrics) = log.metrics.as_ref() {
        let counters_ok = metrics.counters.values().all(|value| value.is_finite());
        if !metrics.deep_work_hours.is_finite() || metrics.deep_work_hours < 0.0 || !counters_ok {
            return Err(AppError::Validation(
                "metrics must be finite and deep_work_hours non-negative".to_string(),
            ));
        }
    }
    validate_completed_subset(log)
}

/// Completed actions must come from the day's plan. A log without a plan
/// accepts nothing as completed.
fn validate_completed_subset(log: &DailyLog) -> AppResult<()> {
    for done in &log.completed_actions {
        if !log.planned_actions.iter().any(|planned| planned.same_action(done)) {
            return Err(AppError::Validation(format!(
                "completed action '{}' is not in the day's planned actions",
                done.text
            )));
        }
    }
    Ok(())
}

pub fn validate_profile(profile: &UserProfile) -> AppResult<()> {
    if profile.name.trim().is_empty() {
        return Err(AppError::Validation(
            "profile name must not be empty".to_string(),
        ));
    }
    for (module, level) in &profile.module_levels {
        ensure_score(&format!("{} level", module.as_str()), Some(*level))?;
    }
    for (module, goal) in &profile.goals_90_day {
        ensure_score(
            &format!("{} target level", module.as_str()),
            Some(goal.target_level),
        )?;
    }
    Ok(())
}

pub fn validate_goals(goals: &Goals) -> AppResult<()> {
    for (module, goal) in &goals.quarterly_goals {
        if goal.goal.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{} goal must not be empty",
                module.as_str()
            )));
        }
    }
    Ok(())
}

pub fn validate_review(review: &WeeklyReview) -> AppResult<()> {
    if let (Some(start), Some(end)) = (review.start_date, review.end_date) {
        if start > end {
            return Err(AppError::Validation(format!(
                "review starts {} after it ends {}",
                start, end
            )));
        }
    }
    Ok(())
}

pub fn validate_new_habit(spec: &NewHabit) -> AppResult<()> {
    if spec.name.trim().is_empty() {
        return Err(AppError::Validation(
            "habit name must not be empty".to_string(),
        ));
    }
    if let Some(id) = spec.id.as_deref() {
        if !is_habit_id(id) {
            return Err(AppError::Validation(format!(
                "habit id '{}' may only contain lowercase letters, digits, '_' and '-'",
                id
            )));
        }
    }
    Ok(())
}
