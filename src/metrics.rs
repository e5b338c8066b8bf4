use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{JobApplication, JobRow, JobStatus, Section, StudyTopic};

/// What the funnel aggregator needs to know about a job.
///
/// `status` is `None` for records whose stored status is missing or not a
/// recognised [`JobStatus`]; such records still count towards the total.
pub trait FunnelEntry {
    fn status(&self) -> Option<JobStatus>;
    fn applied_at(&self) -> Option<NaiveDate>;
}

impl FunnelEntry for JobApplication {
    fn status(&self) -> Option<JobStatus> {
        Some(self.status)
    }

    fn applied_at(&self) -> Option<NaiveDate> {
        self.applied_at
    }
}

impl FunnelEntry for JobRow {
    fn status(&self) -> Option<JobStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    fn applied_at(&self) -> Option<NaiveDate> {
        self.applied_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    pub total: u32,
    pub applied: u32,
    pub oa: u32,
    pub interviewing: u32,
    pub offers: u32,
    pub rejected: u32,
    pub responded: u32,
    pub response_rate: f64,
    pub weekly_applications: u32,
    pub weekly_trend: i64,
}

/// Funnel counts, response rate and week-over-week trend.
///
/// Weeks are counted in whole UTC days ending on `now`'s date: this week is
/// `[today - 7d, today]`, last week is `[today - 14d, today - 7d)`.
pub fn compute_job_metrics<J: FunnelEntry>(jobs: &[J], now: DateTime<Utc>) -> JobMetrics {
    let today = now.date_naive();
    let week_start = today - Duration::days(7);
    let last_week_start = today - Duration::days(14);

    let mut m = JobMetrics {
        total: 0,
        applied: 0,
        oa: 0,
        interviewing: 0,
        offers: 0,
        rejected: 0,
        responded: 0,
        response_rate: 0.0,
        weekly_applications: 0,
        weekly_trend: 0,
    };
    let mut last_week = 0u32;

    for job in jobs {
        m.total += 1;

        match job.status() {
            Some(JobStatus::Applied) => m.applied += 1,
            Some(JobStatus::Oa) => m.oa += 1,
            Some(s) if s.is_interviewing() => m.interviewing += 1,
            Some(s) if s.is_offer() => m.offers += 1,
            Some(JobStatus::Rejected) => m.rejected += 1,
            _ => {}
        }

        if let Some(day) = job.applied_at() {
            if day >= week_start && day <= today {
                m.weekly_applications += 1;
            } else if day >= last_week_start && day < week_start {
                last_week += 1;
            }
        }
    }

    m.responded = m.interviewing + m.offers + m.rejected;
    m.response_rate = percent_one_decimal(m.responded, m.total);
    m.weekly_trend = weekly_trend(m.weekly_applications, last_week);
    m
}

/// Percentage change from last week to this week, rounded half away from zero.
pub fn weekly_trend(this_week: u32, last_week: u32) -> i64 {
    if last_week > 0 {
        let change = (f64::from(this_week) - f64::from(last_week)) / f64::from(last_week);
        (change * 100.0).round() as i64
    } else if this_week > 0 {
        100
    } else {
        0
    }
}

fn percent_one_decimal(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) / f64::from(whole) * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCount {
    pub status: JobStatus,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total: u32,
    pub stages: Vec<StageCount>,
    pub interviews: u32,
    pub offers: u32,
    pub conversion_rate: f64,
}

/// Per-stage breakdown of the job list, `None` when there are no jobs.
///
/// Like [`compute_job_metrics`], entries without a recognised status count
/// towards `total` but towards no stage.
pub fn compute_pipeline<J: FunnelEntry>(jobs: &[J]) -> Option<PipelineSummary> {
    if jobs.is_empty() {
        return None;
    }

    let count = |pred: &dyn Fn(JobStatus) -> bool| -> u32 {
        jobs.iter().filter(|j| j.status().is_some_and(pred)).count() as u32
    };

    let stages = JobStatus::ALL
        .into_iter()
        .map(|status| StageCount {
            status,
            count: count(&|s| s == status),
        })
        .collect();
    let total = jobs.len() as u32;
    let offers = count(&JobStatus::is_offer);

    Some(PipelineSummary {
        total,
        stages,
        interviews: count(&JobStatus::is_interviewing),
        offers,
        conversion_rate: percent_one_decimal(offers, total),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepMetrics {
    pub progress_percent: f64,
    pub completed_count: u32,
    pub total_count: u32,
    pub weakest_domain: Option<Section>,
    pub last_studied_topic: Option<String>,
    pub last_studied_at: Option<DateTime<Utc>>,
}

/// Study progress summary.
///
/// The weakest domain is the section with the most incomplete topics; ties go
/// to the section listed first in [`Section::ALL`].
pub fn compute_prep_metrics(topics: &[StudyTopic]) -> PrepMetrics {
    let total_count = topics.len() as u32;
    let completed_count = topics.iter().filter(|t| t.completed).count() as u32;

    let mut weakest: Option<(Section, usize)> = None;
    for section in Section::ALL {
        let in_section: Vec<&StudyTopic> = topics.iter().filter(|t| t.section == section).collect();
        if in_section.is_empty() {
            continue;
        }
        let incomplete = in_section.iter().filter(|t| !t.completed).count();
        if weakest.is_none_or(|(_, most)| incomplete > most) {
            weakest = Some((section, incomplete));
        }
    }

    let last = topics
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| t.completed_at.map(|at| (at, t)))
        .max_by_key(|(at, _)| *at);

    PrepMetrics {
        progress_percent: percent_one_decimal(completed_count, total_count),
        completed_count,
        total_count,
        weakest_domain: weakest.map(|(section, _)| section),
        last_studied_topic: last.map(|(_, t)| t.label.clone()),
        last_studied_at: last.map(|(at, _)| at),
    }
}
