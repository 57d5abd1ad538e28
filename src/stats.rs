//! Rolling statistics over daily logs and the habit ledger. Stateless.

use crate::logs::window_start;
use crate::models::{DailyLog, HabitsDocument, Stats};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Inclusive date range the statistics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StatsWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending on `end`, `end` included.
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self {
            start: window_start(end, days),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Logs outside `window` are ignored. Averages cover only the logs where the
/// value is present; the completion rate is 0 when there are no habits or no
/// logged days.
pub fn aggregate(logs: &[DailyLog], ledger: &HabitsDocument, window: StatsWindow) -> Stats {
    let mut stats = Stats::default();
    let mut sleep = Mean::default();
    let mut energy = Mean::default();
    let mut day_score = Mean::default();

    for log in logs.iter().filter(|log| window.contains(log.date)) {
        stats.days_logged = stats.days_logged.saturating_add(1);

        if let Some(checkin) = log.am_checkin.as_ref() {
            stats.am_checkins = stats.am_checkins.saturating_add(1);
            if let Some(hours) = checkin.sleep_hours {
                sleep.push(hours);
            }
            if let Some(level) = checkin.energy_level {
                energy.push(f64::from(level));
            }
        }

        if let Some(reflection) = log.pm_reflection.as_ref() {
            stats.pm_reflections = stats.pm_reflections.saturating_add(1);
            if let Some(score) = reflection.day_score {
                day_score.push(f64::from(score));
            }
        }

        if let Some(metrics) = log.metrics.as_ref() {
            stats.total_deep_work_hours += metrics.deep_work_hours;
            stats.total_workouts = stats.total_workouts.saturating_add(metrics.workouts);
        }

        stats.tasks_planned = stats.tasks_planned.saturating_add(count(&log.planned_actions));
        stats.tasks_completed = stats.tasks_completed.saturating_add(count(&log.completed_actions));
    }

    stats.avg_sleep = sleep.value();
    stats.avg_energy = energy.value();
    stats.avg_day_score = day_score.value();
    stats.habit_completion_rate = completion_rate(ledger, window, stats.days_logged);
    stats
}

fn count<T>(items: &[T]) -> u32 {
    u32::try_from(items.len()).unwrap_or(u32::MAX)
}

fn completion_rate(ledger: &HabitsDocument, window: StatsWindow, days_logged: u32) -> f64 {
    let habit_count = ledger.habits.len();
    if habit_count == 0 || days_logged == 0 {
        return 0.0;
    }
    let current: BTreeSet<&str> = ledger.habits.iter().map(|habit| habit.id.as_str()).collect();
    let completed = ledger
        .completions
        .range(window.start..=window.end)
        .flat_map(|(_, ids)| ids.iter())
        .filter(|id| current.contains(id.as_str()))
        .count();

    let possible = habit_count as f64 * f64::from(days_logged);
    completed as f64 / possible * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DailyMetrics, EveningReflection, Frequency, Habit, LifeModule, MorningCheckin,
        PlannedAction,
    };

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn habit(id: &str) -> Habit {
        Habit {
            id: id.to_string(),
            name: id.to_string(),
            module: LifeModule::Health,
            frequency: Frequency::Daily,
            current_streak: 0,
            best_streak: 0,
            total_completions: 0,
            created_at: None,
        }
    }

    #[test]
    fn empty_inputs_give_all_zeros() {
        let window = StatsWindow::ending_on(date("2024-02-01"), 30);
        assert_eq!(
            aggregate(&[], &HabitsDocument::default(), window),
            Stats::default()
        );
    }

    #[test]
    fn morning_only_log_averages_what_is_present() {
        let mut log = DailyLog::new(date("2024-02-01"));
        log.am_checkin = Some(MorningCheckin {
            sleep_hours: Some(7.5),
            energy_level: Some(6),
            ..MorningCheckin::default()
        });

        let window = StatsWindow::ending_on(date("2024-02-01"), 30);
        let stats = aggregate(&[log], &HabitsDocument::default(), window);
        assert_eq!(stats.days_logged, 1);
        assert_eq!(stats.am_checkins, 1);
        assert_eq!(stats.pm_reflections, 0);
        assert_eq!(stats.avg_sleep, 7.5);
        assert_eq!(stats.avg_energy, 6.0);
        assert_eq!(stats.avg_day_score, 0.0);
        assert_eq!(stats.total_deep_work_hours, 0.0);
    }

    #[test]
    fn totals_and_averages_across_days() {
        let mut first = DailyLog::new(date("2024-02-01"));
        first.pm_reflection = Some(EveningReflection {
            day_score: Some(6),
            ..EveningReflection::default()
        });
        first.metrics = Some(DailyMetrics {
            deep_work_hours: 2.5,
            workouts: 1,
            ..DailyMetrics::default()
        });
        let task = PlannedAction {
            module: "health".to_string(),
            text: "run".to_string(),
            ..PlannedAction::default()
        };
        first.planned_actions = vec![task.clone()];
        first.completed_actions = vec![task];

        let mut second = DailyLog::new(date("2024-02-02"));
        second.pm_reflection = Some(EveningReflection {
            day_score: Some(9),
            ..EveningReflection::default()
        });
        second.metrics = Some(DailyMetrics {
            deep_work_hours: 1.0,
            workouts: 0,
            ..DailyMetrics::default()
        });

        let outside = DailyLog::new(date("2023-12-01"));

        let stats = aggregate(
            &[outside, first, second],
            &HabitsDocument::default(),
            StatsWindow::ending_on(date("2024-02-02"), 7),
        );
        assert_eq!(stats.days_logged, 2);
        assert_eq!(stats.pm_reflections, 2);
        assert_eq!(stats.avg_day_score, 7.5);
        assert_eq!(stats.total_deep_work_hours, 3.5);
        assert_eq!(stats.total_workouts, 1);
        assert_eq!((stats.tasks_planned, stats.tasks_completed), (1, 1));
    }

    #[test]
    fn oversized_hand_edited_workouts_saturate() {
        let logs: Vec<DailyLog> = ["2024-02-01", "2024-02-02"]
            .into_iter()
            .map(|day| {
                let mut log = DailyLog::new(date(day));
                log.metrics = Some(DailyMetrics {
                    workouts: u32::MAX - 1,
                    ..DailyMetrics::default()
                });
                log
            })
            .collect();

        let stats = aggregate(
            &logs,
            &HabitsDocument::default(),
            StatsWindow::ending_on(date("2024-02-02"), 7),
        );
        assert_eq!(stats.total_workouts, u32::MAX);
        assert_eq!(stats.days_logged, 2);
    }

    #[test]
    fn completion_rate_counts_current_habits_inside_the_window() {
        let mut ledger = HabitsDocument {
            habits: vec![habit("walk"), habit("read")],
            ..HabitsDocument::default()
        };
        for (day, id) in [
            ("2024-02-01", "walk"),
            ("2024-02-01", "read"),
            ("2024-02-02", "walk"),
            ("2024-02-02", "removed_habit"),
            ("2023-12-01", "walk"),
        ] {
            ledger.completions.entry(date(day)).or_default().insert(id.to_string());
        }
        let logs = vec![DailyLog::new(date("2024-02-01")), DailyLog::new(date("2024-02-02"))];

        let stats = aggregate(
            &logs,
            &ledger,
            StatsWindow::ending_on(date("2024-02-02"), 30),
        );
        assert_eq!(stats.habit_completion_rate, 75.0);

        let none_logged = aggregate(&[], &ledger, StatsWindow::ending_on(date("2024-02-02"), 30));
        assert_eq!(none_logged.habit_completion_rate, 0.0);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = StatsWindow::ending_on(date("2024-02-07"), 7);
        assert_eq!(window.start, date("2024-02-01"));
        assert!(window.contains(date("2024-02-01")));
        assert!(window.contains(date("2024-02-07")));
        assert!(!window.contains(date("2024-01-31")));
    }
}
