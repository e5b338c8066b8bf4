use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{JobApplication, JobStatus, ParseStatusError};

#[derive(Debug, Error)]
pub enum TransitionError {
    /// The requested status is not one of [`JobStatus::ALL`].
    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    #[error("job #{0} not found")]
    JobNotFound(i64),

    /// The store refused the write; the board has been rolled back.
    #[error("failed to save status change for job #{id}: {reason}")]
    Persist { id: i64, reason: String },
}

/// Validate `new_status` and return a copy of `job` carrying it.
///
/// Any status may move to any other, including itself: the board models
/// free re-categorization, not a workflow. On error `job` is untouched.
pub fn apply_status_transition(
    job: &JobApplication,
    new_status: &str,
) -> Result<JobApplication, TransitionError> {
    let status: JobStatus = new_status.parse()?;
    debug!(job_id = job.id, from = %job.status, to = %status, "status transition");
    Ok(JobApplication {
        status,
        ..job.clone()
    })
}

/// Kanban view of the job list: one column per status, in board order.
#[derive(Debug, Clone, Default)]
pub struct Board {
    jobs: Vec<JobApplication>,
}

impl Board {
    pub fn from_jobs(jobs: Vec<JobApplication>) -> Self {
        Self { jobs }
    }

    pub fn job(&self, id: i64) -> Option<&JobApplication> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Every status with the jobs currently in it. Empty columns are kept.
    pub fn columns(&self) -> Vec<(JobStatus, Vec<&JobApplication>)> {
        JobStatus::ALL
            .into_iter()
            .map(|status| {
                let cards = self.jobs.iter().filter(|j| j.status == status).collect();
                (status, cards)
            })
            .collect()
    }

    /// Move a card to `new_status`, optimistically.
    ///
    /// The local board changes first, then `persist` is asked to store the
    /// updated record. If it fails the previous record is put back.
    pub fn move_job<F>(
        &mut self,
        id: i64,
        new_status: &str,
        persist: F,
    ) -> Result<&JobApplication, TransitionError>
    where
        F: FnOnce(&JobApplication) -> anyhow::Result<()>,
    {
        let idx = self
            .jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or(TransitionError::JobNotFound(id))?;

        let updated = apply_status_transition(&self.jobs[idx], new_status)?;
        let previous = std::mem::replace(&mut self.jobs[idx], updated);

        if let Err(e) = persist(&self.jobs[idx]) {
            warn!(job_id = id, error = %e, "status write failed, rolling back");
            self.jobs[idx] = previous;
            return Err(TransitionError::Persist {
                id,
                reason: format!("{:#}", e),
            });
        }

        Ok(&self.jobs[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn job(id: i64, status: JobStatus) -> JobApplication {
        JobApplication {
            id,
            company: format!("Company {}", id),
            role: "SWE Intern".to_string(),
            status,
            notes: None,
            applied_at: None,
            deadline: None,
            location: None,
            salary_range: None,
            job_url: None,
            resume_url: None,
            resume_version: None,
            follow_up_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn applied_to_offer_succeeds() {
        let before = job(1, JobStatus::Applied);
        let after = apply_status_transition(&before, "Offer").unwrap();
        assert_eq!(after.status, JobStatus::Offer);
        assert_eq!(
            JobApplication {
                status: JobStatus::Applied,
                ..after
            },
            before
        );
    }

    #[test]
    fn unknown_status_is_rejected_without_mutation() {
        let before = job(1, JobStatus::Applied);
        let err = apply_status_transition(&before, "Bogus").unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidStatus(ParseStatusError(ref s)) if s == "Bogus"
        ));
        assert!(err.to_string().starts_with("invalid status 'Bogus'"));
        assert_eq!(before.status, JobStatus::Applied);
    }

    #[test]
    fn any_status_may_move_anywhere() {
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                let moved = apply_status_transition(&job(1, from), to.as_str()).unwrap();
                assert_eq!(moved.status, to);
            }
        }
    }

    #[test]
    fn columns_cover_every_status_in_board_order() {
        let board = Board::from_jobs(vec![
            job(1, JobStatus::Oa),
            job(2, JobStatus::Applied),
            job(3, JobStatus::Oa),
        ]);
        let columns = board.columns();
        let order: Vec<JobStatus> = columns.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, JobStatus::ALL.to_vec());

        let oa: Vec<i64> = columns[2].1.iter().map(|j| j.id).collect();
        assert_eq!(oa, vec![1, 3]);
        assert!(columns[0].1.is_empty());
    }

    #[test]
    fn move_job_persists_the_updated_record() {
        let mut board =
            Board::from_jobs(vec![job(1, JobStatus::Applied), job(2, JobStatus::Wishlist)]);
        let mut saved = None;

        let moved = board
            .move_job(2, "Interview Scheduled", |j| {
                saved = Some(j.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(moved.status, JobStatus::InterviewScheduled);

        assert_eq!(saved.map(|j| j.status), Some(JobStatus::InterviewScheduled));
        assert_eq!(board.job(2).unwrap().status, JobStatus::InterviewScheduled);
        assert_eq!(board.job(1).unwrap().status, JobStatus::Applied);
    }

    #[test]
    fn move_job_rolls_back_when_the_write_fails() {
        let mut board = Board::from_jobs(vec![job(1, JobStatus::Applied)]);

        let err = board
            .move_job(1, "Rejected", |j| {
                assert_eq!(j.status, JobStatus::Rejected);
                Err(anyhow!("disk full"))
            })
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::Persist { id: 1, ref reason } if reason == "disk full"
        ));
        assert_eq!(board.job(1).unwrap().status, JobStatus::Applied);
    }

    #[test]
    fn move_job_rejects_bad_input_before_persisting() {
        let mut board = Board::from_jobs(vec![job(1, JobStatus::Applied)]);

        let err = board
            .move_job(9, "Offer", |_| panic!("must not persist"))
            .unwrap_err();
        assert!(matches!(err, TransitionError::JobNotFound(9)));

        let err = board
            .move_job(1, "Hired", |_| panic!("must not persist"))
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidStatus(_)));
        assert_eq!(board.job(1).unwrap().status, JobStatus::Applied);
    }
}
