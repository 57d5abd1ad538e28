use chrono::NaiveDate;
use self_mastery_core::{
    AppError, DailyLog, FixedClock, HabitsDocument, LifeModule, MorningCheckin, NewHabit, Stats,
    TrackerCore,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}

fn open(root: &Path, today: &str) -> Arc<TrackerCore> {
    TrackerCore::open_with_clock(root, Arc::new(FixedClock::on(date(today))))
        .expect("tracker opens")
}

#[test]
fn empty_store_reports_zeroed_stats() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-02-01");

    let stats = tracker.get_stats(30).expect("stats");
    assert_eq!(stats, Stats::default());
    assert_eq!(stats.days_logged, 0);
    assert_eq!(
        tracker.get_default_stats().expect("stats"),
        Stats::default()
    );
}

#[test]
fn deep_work_habit_builds_a_three_day_streak() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-01-12");

    let habit = tracker
        .add_habit(NewHabit::daily("Deep Work", LifeModule::Productivity))
        .expect("add habit");
    assert_eq!(habit.id, "deep_work");

    for day in ["2024-01-10", "2024-01-11", "2024-01-12"] {
        tracker.record_completion("deep_work", Some(date(day))).expect("record");
    }

    let habit = tracker.habit("deep_work").expect("habit stored");
    assert_eq!(habit.current_streak, 3);
    assert_eq!(habit.best_streak, 3);
    assert_eq!(habit.total_completions, 3);
}

#[test]
fn gap_in_completions_resets_the_current_streak() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-01-12");
    tracker.add_habit(NewHabit::daily("Stretch", LifeModule::Health)).expect("add");

    tracker.record_completion("stretch", Some(date("2024-01-10"))).expect("record");
    let outcome = tracker.record_completion("stretch", None).expect("record today");
    assert_eq!(outcome.habit.current_streak, 1);
    assert!(tracker.is_completed_on("stretch", date("2024-01-12")));
}

#[test]
fn duplicate_completion_is_a_no_op() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-01-12");
    tracker.add_habit(NewHabit::daily("Meditate", LifeModule::Mindset)).expect("add");

    let first = tracker.record_completion("meditate", None).expect("first");
    let second = tracker.record_completion("meditate", None).expect("second");
    assert_eq!(first.habit.total_completions, 1);
    assert_eq!(second.habit.total_completions, 1);
    assert_eq!(
        tracker.completions_on(date("2024-01-12")),
        vec!["meditate".to_string()]
    );
}

#[test]
fn same_name_twice_gets_a_suffix() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-01-12");
    let first = tracker.add_habit(NewHabit::daily("Reading", LifeModule::Mindset)).expect("add");
    let second = tracker.add_habit(NewHabit::daily("Reading", LifeModule::Mindset)).expect("add");
    assert_eq!(first.id, "reading");
    assert_eq!(second.id, "reading_1");
    assert_eq!(tracker.habits_by_module(LifeModule::Mindset).len(), 2);
}

#[test]
fn morning_only_log_drives_the_averages() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-02-01");
    tracker
        .save_morning_checkin(
            date("2024-02-01"),
            MorningCheckin {
                sleep_hours: Some(7.5),
                energy_level: Some(6),
                ..MorningCheckin::default()
            },
        )
        .expect("check-in");

    let stats = tracker.get_stats(30).expect("stats");
    assert_eq!(stats.days_logged, 1);
    assert_eq!(stats.avg_sleep, 7.5);
    assert_eq!(stats.avg_energy, 6.0);
    assert_eq!(stats.avg_day_score, 0.0);
}

#[test]
fn corrupt_habit_file_reads_as_an_empty_ledger() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-02-01");
    fs::write(root.path().join("habits.json"), b"{\"habits\": [{\"id\": ").expect("corrupt");

    let ledger = tracker.get_habits();
    assert_eq!(ledger, HabitsDocument::default());
    assert!(ledger.habits.is_empty());
    assert!(ledger.completions.is_empty());

    let error = tracker.record_completion("anything", None).expect_err("no habits");
    assert!(matches!(error, AppError::NotFound(_)));
}

#[test]
fn habits_file_keeps_the_documented_shape() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-01-12");
    tracker.add_habit(NewHabit::daily("Deep Work", LifeModule::Productivity)).expect("add");
    tracker.record_completion("deep_work", None).expect("record");

    let bytes = fs::read(root.path().join("habits.json")).expect("read");
    let raw: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(raw["habits"][0]["id"], "deep_work");
    assert_eq!(raw["habits"][0]["module"], "productivity");
    assert_eq!(
        raw["completions"]["2024-01-12"],
        serde_json::json!(["deep_work"])
    );

    let text = fs::read_to_string(root.path().join("habits.json")).expect("read");
    assert!(text.starts_with("{\n  \"habits\""));
}

#[test]
fn logs_written_by_earlier_tooling_are_read() {
    let root = tempfile::tempdir().expect("temp root");
    fs::create_dir_all(root.path().join("logs")).expect("logs dir");
    fs::write(
        root.path().join("logs/2024-01-31.json"),
        br#"{"date": "2024-01-31", "created_at": "2024-01-31T06:58:02.118274",
            "am_checkin": {"time": "2024-01-31T06:58:02", "sleep_hours": 6.5,
                           "sleep_quality": 7, "energy_level": 8,
                           "top_3_priorities": ["deck"], "win_definition": "send deck"},
            "planned_actions": [], "completed_actions": [], "pm_reflection": null,
            "metrics": {"deep_work_hours": 3, "workouts": 1, "sales_calls": 4, "steps": 0},
            "habits": {}, "notes": ""}"#,
    )
    .expect("legacy log");

    let tracker = open(root.path(), "2024-02-01");
    let stats = tracker.get_stats(7).expect("stats");
    assert_eq!(stats.days_logged, 1);
    assert_eq!(stats.avg_sleep, 6.5);
    assert_eq!(stats.total_deep_work_hours, 3.0);
    assert_eq!(stats.total_workouts, 1);

    let log = tracker.get_log(date("2024-01-31")).expect("log");
    let sales_calls = log
        .metrics
        .and_then(|metrics| metrics.counters.get("sales_calls").copied());
    assert_eq!(sales_calls, Some(4.0));
}

#[test]
fn weekly_review_cycle() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-02-01");
    tracker.save_log(DailyLog::new(date("2024-01-29")), date("2024-01-29")).expect("log");

    let draft = tracker.draft_review(tracker.today()).expect("draft");
    let week = draft.week.clone();
    assert_eq!(week, "2024-W05");
    assert_eq!(
        tracker.week_stats(tracker.today()).expect("week stats"),
        draft.stats
    );

    tracker.save_review(draft, &week).expect("save");
    let stored = tracker.get_review(&week).expect("get").expect("stored");
    assert_eq!(stored.stats.days_logged, 1);
    assert!(root.path().join("reviews/week-2024-W05.json").is_file());
    assert_eq!(tracker.list_reviews().expect("list"), vec![week]);
}

#[test]
fn multi_window_stats_cover_each_range() {
    let root = tempfile::tempdir().expect("temp root");
    let tracker = open(root.path(), "2024-03-31");
    for day in ["2024-03-31", "2024-03-20", "2024-01-15"] {
        tracker.save_log(DailyLog::new(date(day)), date(day)).expect("log");
    }

    let by_range = tracker.get_stats_for_ranges(&[7, 30, 90]).expect("ranges");
    assert_eq!(by_range[&7].days_logged, 1);
    assert_eq!(by_range[&30].days_logged, 2);
    assert_eq!(by_range[&90].days_logged, 3);
}
