use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

use crate::models::StudyTopic;

/// Calendar days (UTC) on which at least one topic was completed.
pub fn completion_days(topics: &[StudyTopic]) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = topics
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| t.completed_at)
        .map(|at| at.date_naive())
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

/// Number of consecutive days, ending on `today`, with a completion.
///
/// A streak is current momentum: if nothing was completed today the streak
/// is 0, even when yesterday was part of a long run.
pub fn compute_streak(completion_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = completion_dates.iter().copied().collect();

    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}
