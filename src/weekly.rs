use crate::errors::AppResult;
use crate::models::WeeklyReview;
use crate::store::{RecordKind, RecordStore};
use crate::validation::{ensure_week_label, validate_review};
use chrono::{Datelike, Days, NaiveDate};
use std::sync::Arc;

/// `YYYY-WNN` with a Monday-based week number; days before the year's first
/// Monday fall in week `00`.
pub fn week_label(date: NaiveDate) -> String {
    date.format("%Y-W%W").to_string()
}

/// Monday and Sunday of the week containing `date`.
pub fn week_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
    (monday, sunday)
}

pub struct ReviewBook {
    store: Arc<RecordStore>,
}

impl ReviewBook {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn get_review(&self, week: &str) -> AppResult<Option<WeeklyReview>> {
        ensure_week_label(week)?;
        Ok(self.store.get_or_absent::<WeeklyReview>(week))
    }

    /// Full overwrite of the week's review.
    pub fn save_review(&self, mut review: WeeklyReview, week: &str) -> AppResult<WeeklyReview> {
        ensure_week_label(week)?;
        validate_review(&review)?;

        let previous = self.store.get_for_update::<WeeklyReview>(week)?;
        if let Some(previous) = previous {
            review.created_at = review.created_at.or(previous.created_at);
            tracing::info!(week, "replacing weekly review");
        }
        self.store
            .put(week, &mut review)
            .map_err(|error| error.while_saving("weekly review"))?;
        Ok(review)
    }

    /// Stored week labels, oldest first.
    pub fn list_reviews(&self) -> AppResult<Vec<String>> {
        self.store.list_ids(RecordKind::WeeklyReview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::errors::AppError;
    use std::collections::BTreeMap;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn book(root: &std::path::Path) -> ReviewBook {
        let clock = Arc::new(FixedClock::on(date("2024-02-04")));
        ReviewBook::new(Arc::new(RecordStore::open(root, clock).expect("store")))
    }

    #[test]
    fn labels_use_monday_based_week_numbers() {
        assert_eq!(week_label(date("2024-01-01")), "2024-W01");
        assert_eq!(week_label(date("2024-02-01")), "2024-W05");
        assert_eq!(week_label(date("2023-01-01")), "2023-W00");
    }

    #[test]
    fn window_runs_monday_to_sunday() {
        assert_eq!(
            week_window(date("2024-02-01")),
            (date("2024-01-29"), date("2024-02-04"))
        );
        assert_eq!(
            week_window(date("2024-01-29")),
            (date("2024-01-29"), date("2024-02-04"))
        );
        assert_eq!(
            week_window(date("2024-02-04")),
            (date("2024-01-29"), date("2024-02-04"))
        );
    }

    #[test]
    fn redo_overwrites_and_keeps_creation_time() {
        let root = tempfile::tempdir().expect("temp root");
        let reviews = book(root.path());

        let targets = BTreeMap::from([("health".to_string(), "run 3x".to_string())]);
        let first = reviews
            .save_review(
                WeeklyReview {
                    top_wins: vec!["launch".to_string()],
                    next_week_targets: targets,
                    ..WeeklyReview::default()
                },
                "2024-W05",
            )
            .expect("first save");
        assert_eq!(first.week, "2024-W05");

        let redo = reviews
            .save_review(
                WeeklyReview {
                    key_lessons: vec!["plan mornings".to_string()],
                    ..WeeklyReview::default()
                },
                "2024-W05",
            )
            .expect("redo");
        assert_eq!(redo.created_at, first.created_at);

        let stored = reviews.get_review("2024-W05").expect("get").expect("present");
        assert!(stored.top_wins.is_empty());
        assert_eq!(stored.key_lessons, vec!["plan mornings".to_string()]);
        assert_eq!(
            reviews.list_reviews().expect("list"),
            vec!["2024-W05".to_string()]
        );
    }

    #[test]
    fn bad_labels_are_rejected() {
        let root = tempfile::tempdir().expect("temp root");
        let reviews = book(root.path());
        assert!(matches!(
            reviews.get_review("week-5"),
            Err(AppError::Validation(_))
        ));
        assert!(reviews.save_review(WeeklyReview::default(), "2024-5").is_err());
        assert!(reviews.list_reviews().expect("list").is_empty());
    }
}
