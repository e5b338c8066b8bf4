use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invalid status '{0}' (expected one of: Wishlist, Applied, OA, Interview Scheduled, \
     Interview, Offer, Accepted, Rejected)"
)]
pub struct ParseStatusError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown study section '{0}'")]
pub struct ParseSectionError(pub String);

/// Where a job application sits in the funnel.
///
/// The order of [`JobStatus::ALL`] is the board order, left to right.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum JobStatus {
    Wishlist,
    #[default]
    Applied,
    #[serde(rename = "OA")]
    Oa,
    #[serde(rename = "Interview Scheduled")]
    InterviewScheduled,
    Interview,
    Offer,
    Accepted,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Wishlist,
        JobStatus::Applied,
        JobStatus::Oa,
        JobStatus::InterviewScheduled,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Accepted,
        JobStatus::Rejected,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Wishlist => "Wishlist",
            JobStatus::Applied => "Applied",
            JobStatus::Oa => "OA",
            JobStatus::InterviewScheduled => "Interview Scheduled",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Accepted => "Accepted",
            JobStatus::Rejected => "Rejected",
        }
    }

    pub fn is_interviewing(self) -> bool {
        matches!(self, JobStatus::Interview | JobStatus::InterviewScheduled)
    }

    pub fn is_offer(self) -> bool {
        matches!(self, JobStatus::Offer | JobStatus::Accepted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == trimmed)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: i64,
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub applied_at: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_url: Option<String>,
    pub resume_url: Option<String>,
    pub resume_version: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A `jobs` row as stored, before the status has been validated.
///
/// Historical rows may carry a status outside the current enumeration; the
/// aggregator still has to count them.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: i64,
    pub status: Option<String>,
    pub applied_at: Option<NaiveDate>,
}

/// Fields accepted when creating a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewJob {
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub notes: Option<String>,
    pub applied_at: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_url: Option<String>,
    pub resume_url: Option<String>,
    pub resume_version: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

/// Partial edit of a job; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<JobStatus>,
    pub notes: Option<String>,
    pub applied_at: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub job_url: Option<String>,
    pub resume_url: Option<String>,
    pub resume_version: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl JobUpdate {
    pub fn apply_to(self, job: &mut JobApplication) {
        if let Some(company) = self.company {
            job.company = company;
        }
        if let Some(role) = self.role {
            job.role = role;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if self.notes.is_some() {
            job.notes = self.notes;
        }
        if self.applied_at.is_some() {
            job.applied_at = self.applied_at;
        }
        if self.deadline.is_some() {
            job.deadline = self.deadline;
        }
        if self.location.is_some() {
            job.location = self.location;
        }
        if self.salary_range.is_some() {
            job.salary_range = self.salary_range;
        }
        if self.job_url.is_some() {
            job.job_url = self.job_url;
        }
        if self.resume_url.is_some() {
            job.resume_url = self.resume_url;
        }
        if self.resume_version.is_some() {
            job.resume_version = self.resume_version;
        }
        if self.follow_up_date.is_some() {
            job.follow_up_date = self.follow_up_date;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "DSA")]
    Dsa,
    #[serde(rename = "System Design")]
    SystemDesign,
    Behavioral,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Dsa, Section::SystemDesign, Section::Behavioral];

    pub const fn as_str(self) -> &'static str {
        match self {
            Section::Dsa => "DSA",
            Section::SystemDesign => "System Design",
            Section::Behavioral => "Behavioral",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s.trim())
            .ok_or_else(|| ParseSectionError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyTopic {
    pub id: i64,
    pub topic_id: String,
    pub section: Section,
    pub label: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StudyTopic {
    /// Flip completion, keeping `completed_at` set exactly when completed.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_round_trips_through_display() {
        for status in JobStatus::ALL {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_parse_rejects_unknown_and_wrong_case() {
        assert_eq!(
            "Bogus".parse::<JobStatus>(),
            Err(ParseStatusError("Bogus".to_string()))
        );
        assert!("applied".parse::<JobStatus>().is_err());
        assert_eq!(" OA ".parse::<JobStatus>().unwrap(), JobStatus::Oa);
    }

    #[test]
    fn section_parse_reports_the_bad_value() {
        assert_eq!("System Design".parse::<Section>(), Ok(Section::SystemDesign));
        let err = "Trivia".parse::<Section>().unwrap_err();
        assert_eq!(err.to_string(), "unknown study section 'Trivia'");
    }

    #[test]
    fn status_serializes_as_display_string() {
        let json = serde_json::to_string(&JobStatus::InterviewScheduled).unwrap();
        assert_eq!(json, "\"Interview Scheduled\"");
        let back: JobStatus = serde_json::from_str("\"OA\"").unwrap();
        assert_eq!(back, JobStatus::Oa);
    }

    #[test]
    fn new_jobs_default_to_applied() {
        assert_eq!(NewJob::default().status, JobStatus::Applied);
    }

    #[test]
    fn toggle_keeps_completed_at_in_step() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let mut topic = StudyTopic {
            id: 1,
            topic_id: "arrays".to_string(),
            section: Section::Dsa,
            label: "Arrays & Hashing".to_string(),
            completed: false,
            completed_at: None,
        };

        topic.toggle(now);
        assert!(topic.completed);
        assert_eq!(topic.completed_at, Some(now));

        topic.toggle(now);
        assert!(!topic.completed);
        assert_eq!(topic.completed_at, None);
    }
}
