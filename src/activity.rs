use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::metrics::compute_job_metrics;
use crate::models::{JobApplication, Section, StudyTopic};
use crate::streak::{completion_days, compute_streak};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingInterview {
    pub job_id: i64,
    pub company: String,
    pub role: String,
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTopic {
    pub topic_id: String,
    pub label: String,
    pub section: Section,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeed {
    pub upcoming_interview: Option<UpcomingInterview>,
    pub weekly_applications: u32,
    pub suggested_topic: Option<SuggestedTopic>,
    pub study_streak: u32,
}

pub fn build_activity(
    jobs: &[JobApplication],
    topics: &[StudyTopic],
    now: DateTime<Utc>,
) -> ActivityFeed {
    let today = now.date_naive();

    ActivityFeed {
        upcoming_interview: upcoming_interview(jobs, today),
        weekly_applications: compute_job_metrics(jobs, now).weekly_applications,
        suggested_topic: suggested_topic(topics),
        study_streak: compute_streak(&completion_days(topics), today),
    }
}

/// Next interview on or after `today`; undated interviews come after dated ones.
fn upcoming_interview(jobs: &[JobApplication], today: NaiveDate) -> Option<UpcomingInterview> {
    jobs.iter()
        .filter(|j| j.status.is_interviewing())
        .filter(|j| j.follow_up_date.is_none_or(|d| d >= today))
        .min_by_key(|j| (j.follow_up_date.is_none(), j.follow_up_date, j.id))
        .map(|j| UpcomingInterview {
            job_id: j.id,
            company: j.company.clone(),
            role: j.role.clone(),
            follow_up_date: j.follow_up_date,
        })
}

fn suggested_topic(topics: &[StudyTopic]) -> Option<SuggestedTopic> {
    topics
        .iter()
        .filter(|t| !t.completed)
        .min_by_key(|t| t.id)
        .map(|t| SuggestedTopic {
            topic_id: t.topic_id.clone(),
            label: t.label.clone(),
            section: t.section,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 18, 0, 0).unwrap()
    }

    fn job(id: i64, status: JobStatus, follow_up_in: Option<i64>) -> JobApplication {
        JobApplication {
            id,
            company: format!("Co{}", id),
            role: "Backend Intern".to_string(),
            status,
            notes: None,
            applied_at: Some(now().date_naive() - Duration::days(2)),
            deadline: None,
            location: None,
            salary_range: None,
            job_url: None,
            resume_url: None,
            resume_version: None,
            follow_up_date: follow_up_in.map(|n| now().date_naive() + Duration::days(n)),
            created_at: now(),
        }
    }

    fn topic(id: i64, completed_days_ago: Option<i64>) -> StudyTopic {
        StudyTopic {
            id,
            topic_id: format!("t{}", id),
            section: Section::SystemDesign,
            label: format!("Topic {}", id),
            completed: completed_days_ago.is_some(),
            completed_at: completed_days_ago.map(|n| now() - Duration::days(n)),
        }
    }

    #[test]
    fn picks_earliest_future_interview() {
        let jobs = vec![
            job(1, JobStatus::Interview, None),
            job(2, JobStatus::InterviewScheduled, Some(5)),
            job(3, JobStatus::Interview, Some(-1)),
            job(4, JobStatus::Offer, Some(1)),
            job(5, JobStatus::Interview, Some(0)),
        ];
        let feed = build_activity(&jobs, &[], now());
        assert_eq!(feed.upcoming_interview.map(|i| i.job_id), Some(5));
        assert_eq!(feed.weekly_applications, 5);
    }

    #[test]
    fn undated_interview_is_used_when_nothing_is_scheduled() {
        let jobs = vec![
            job(7, JobStatus::Interview, None),
            job(8, JobStatus::Applied, Some(1)),
        ];
        let feed = build_activity(&jobs, &[], now());
        assert_eq!(feed.upcoming_interview.map(|i| i.job_id), Some(7));
    }

    #[test]
    fn suggests_first_incomplete_topic_and_counts_streak() {
        let topics = vec![
            topic(3, None),
            topic(1, Some(0)),
            topic(2, Some(1)),
            topic(4, None),
        ];
        let feed = build_activity(&[], &topics, now());
        assert_eq!(feed.suggested_topic.map(|t| t.topic_id), Some("t3".to_string()));
        assert_eq!(feed.study_streak, 2);
        assert_eq!(feed.upcoming_interview, None);
    }

    #[test]
    fn empty_everything() {
        let feed = build_activity(&[], &[], now());
        assert_eq!(
            feed,
            ActivityFeed {
                upcoming_interview: None,
                weekly_applications: 0,
                suggested_topic: None,
                study_streak: 0,
            }
        );
    }
}
