use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{JobApplication, JobRow, JobStatus, JobUpdate, NewJob, Section, StudyTopic};

/// Default study catalog: (topic_id, section, label).
pub const SEED_TOPICS: [(&str, Section, &str); 5] = [
    ("arrays", Section::Dsa, "Arrays & Hashing"),
    ("two-pointers", Section::Dsa, "Two Pointers"),
    ("scaling", Section::SystemDesign, "Scaling Fundamentals"),
    ("databases", Section::SystemDesign, "SQL vs NoSQL"),
    ("star", Section::Behavioral, "STAR Method Practice"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Company,
    Role,
    Status,
    AppliedAt,
    FollowUpDate,
    #[default]
    CreatedAt,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::Company => "LOWER(company)",
            SortField::Role => "LOWER(role)",
            SortField::Status => "status",
            SortField::AppliedAt => "applied_at",
            SortField::FollowUpDate => "follow_up_date",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub sort: SortField,
    pub descending: bool,
}

const JOB_COLUMNS: &str = "id, company, role, status, notes, applied_at, deadline, location,
     salary_range, job_url, resume_url, resume_version, follow_up_date, created_at";

const TOPIC_COLUMNS: &str = "id, topic_id, section, label, completed, completed_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
    user_id: i64,
}

impl Database {
    pub fn open(path: Option<&Path>, user_id: i64) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        debug!(path = %path.display(), user_id, "opened database");
        Ok(Self { conn, path, user_id })
    }

    #[cfg(test)]
    pub fn open_in_memory(user_id: i64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            user_id,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // XDG data directory, or the current directory as a last resort
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "prep") {
            proj_dirs.data_dir().join("prep.db")
        } else {
            PathBuf::from("prep.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Applied' CHECK (status IN (
                    'Wishlist', 'Applied', 'OA', 'Interview Scheduled',
                    'Interview', 'Offer', 'Accepted', 'Rejected'
                )),
                notes TEXT,
                applied_at TEXT,
                deadline TEXT,
                location TEXT,
                salary_range TEXT,
                job_url TEXT,
                resume_url TEXT,
                resume_version TEXT,
                follow_up_date TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS study_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                topic_id TEXT NOT NULL,
                section TEXT NOT NULL CHECK (section IN ('DSA', 'System Design', 'Behavioral')),
                label TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                UNIQUE (user_id, topic_id)
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_study_user ON study_progress(user_id);
            "#,
        )?;
        info!(path = %self.path.display(), "database schema ready");
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('jobs', 'study_progress')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(anyhow!("Database not initialized. Run 'prep init' first."));
        }
        Ok(())
    }

    // --- Job operations ---

    pub fn create_job(&self, job: &NewJob, now: DateTime<Utc>) -> Result<JobApplication> {
        validate_required("company", &job.company)?;
        validate_required("role", &job.role)?;

        self.conn.execute(
            "INSERT INTO jobs
                (user_id, company, role, status, notes, applied_at, deadline, location,
                 salary_range, job_url, resume_url, resume_version, follow_up_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                self.user_id,
                job.company.trim(),
                job.role.trim(),
                job.status.as_str(),
                job.notes,
                job.applied_at,
                job.deadline,
                job.location,
                job.salary_range,
                job.job_url,
                job.resume_url,
                job.resume_version,
                job.follow_up_date,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(job_id = id, company = %job.company, status = %job.status, "created job");
        self.get_job(id)?
            .ok_or_else(|| anyhow!("Job #{} vanished after insert", id))
    }

    pub fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobApplication>> {
        let mut sql = format!("SELECT {} FROM jobs WHERE user_id = ?1", JOB_COLUMNS);
        if filter.status.is_some() {
            sql.push_str(" AND status = ?2");
        }
        let direction = if filter.descending { "DESC" } else { "ASC" };
        // NULL dates sort as the oldest value
        sql.push_str(&format!(
            " ORDER BY {col} IS NOT NULL {dir}, {col} {dir}, id {dir}",
            col = filter.sort.column(),
            dir = direction
        ));
        debug!(%sql, "listing jobs");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match filter.status {
            Some(status) => {
                stmt.query_map(params![self.user_id, status.as_str()], Self::row_to_job)?
            }
            None => stmt.query_map(params![self.user_id], Self::row_to_job)?,
        };

        let mut jobs = Vec::new();
        for row in rows {
            match row {
                Ok(job) => jobs.push(job),
                Err(rusqlite::Error::FromSqlConversionFailure(3, _, e)) => {
                    warn!(error = %e, "skipping job with unrecognised status");
                }
                Err(e) => return Err(e).context("Failed to list jobs"),
            }
        }
        Ok(jobs)
    }

    /// Raw `(id, status, applied_at)` rows for aggregation.
    ///
    /// Unlike [`Database::list_jobs`] this never fails on an unrecognised
    /// status; such rows are logged and passed through untouched.
    pub fn list_job_rows(&self) -> Result<Vec<JobRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, status, applied_at FROM jobs WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([self.user_id], |row| {
                Ok(JobRow {
                    id: row.get(0)?,
                    status: row.get(1)?,
                    applied_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read job rows")?;

        for row in &rows {
            let known = row
                .status
                .as_deref()
                .is_some_and(|s| s.parse::<JobStatus>().is_ok());
            if !known {
                warn!(
                    job_id = row.id,
                    status = ?row.status,
                    "job has no recognised status; counted in total only"
                );
            }
        }
        Ok(rows)
    }

    pub fn get_job(&self, id: i64) -> Result<Option<JobApplication>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1 AND user_id = ?2", JOB_COLUMNS),
                params![id, self.user_id],
                Self::row_to_job,
            )
            .optional()
            .with_context(|| format!("Failed to load job #{}", id))
    }

    /// Apply `update` to job `id`. Returns `None` when the job does not exist.
    pub fn update_job(&self, id: i64, update: JobUpdate) -> Result<Option<JobApplication>> {
        let Some(mut job) = self.get_job(id)? else {
            return Ok(None);
        };
        update.apply_to(&mut job);
        validate_required("company", &job.company)?;
        validate_required("role", &job.role)?;

        self.conn.execute(
            "UPDATE jobs
             SET company = ?1, role = ?2, status = ?3, notes = ?4, applied_at = ?5,
                 deadline = ?6, location = ?7, salary_range = ?8, job_url = ?9,
                 resume_url = ?10, resume_version = ?11, follow_up_date = ?12
             WHERE id = ?13 AND user_id = ?14",
            params![
                job.company.trim(),
                job.role.trim(),
                job.status.as_str(),
                job.notes,
                job.applied_at,
                job.deadline,
                job.location,
                job.salary_range,
                job.job_url,
                job.resume_url,
                job.resume_version,
                job.follow_up_date,
                id,
                self.user_id,
            ],
        )?;
        info!(job_id = id, "updated job");
        self.get_job(id)
    }

    pub fn update_job_status(&self, id: i64, status: JobStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2 AND user_id = ?3",
            params![status.as_str(), id, self.user_id],
        )?;
        if changed == 0 {
            return Err(anyhow!("Job #{} not found", id));
        }
        info!(job_id = id, %status, "moved job");
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn delete_job(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM jobs WHERE id = ?1 AND user_id = ?2",
            params![id, self.user_id],
        )?;
        if removed > 0 {
            info!(job_id = id, "deleted job");
        }
        Ok(removed > 0)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<JobApplication> {
        let status: String = row.get(3)?;
        let status = status.parse::<JobStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(JobApplication {
            id: row.get(0)?,
            company: row.get(1)?,
            role: row.get(2)?,
            status,
            notes: row.get(4)?,
            applied_at: row.get(5)?,
            deadline: row.get(6)?,
            location: row.get(7)?,
            salary_range: row.get(8)?,
            job_url: row.get(9)?,
            resume_url: row.get(10)?,
            resume_version: row.get(11)?,
            follow_up_date: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    // --- Study progress operations ---

    /// Insert the default catalog, leaving existing topics (and their progress) alone.
    pub fn seed_topics(&self) -> Result<Vec<StudyTopic>> {
        let mut inserted = 0;
        for (topic_id, section, label) in SEED_TOPICS {
            inserted += self.conn.execute(
                "INSERT INTO study_progress (user_id, topic_id, section, label)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, topic_id) DO NOTHING",
                params![self.user_id, topic_id, section.as_str(), label],
            )?;
        }
        info!(inserted, "seeded study topics");
        self.list_topics()
    }

    pub fn list_topics(&self) -> Result<Vec<StudyTopic>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM study_progress WHERE user_id = ?1 ORDER BY id ASC",
            TOPIC_COLUMNS
        ))?;
        let rows = stmt.query_map([self.user_id], Self::row_to_topic)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list study topics")
    }

    /// Flip a topic's completion. Returns `None` for an unknown topic.
    pub fn toggle_topic(&self, topic_id: &str, now: DateTime<Utc>) -> Result<Option<StudyTopic>> {
        let current = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM study_progress WHERE topic_id = ?1 AND user_id = ?2",
                    TOPIC_COLUMNS
                ),
                params![topic_id, self.user_id],
                Self::row_to_topic,
            )
            .optional()?;

        let Some(mut topic) = current else {
            return Ok(None);
        };
        topic.toggle(now);

        self.conn.execute(
            "UPDATE study_progress SET completed = ?1, completed_at = ?2 WHERE id = ?3",
            params![topic.completed, topic.completed_at, topic.id],
        )?;
        info!(topic_id, completed = topic.completed, "toggled topic");
        Ok(Some(topic))
    }

    fn row_to_topic(row: &rusqlite::Row) -> rusqlite::Result<StudyTopic> {
        let section: String = row.get(2)?;
        let section = section.parse::<Section>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(StudyTopic {
            id: row.get(0)?,
            topic_id: row.get(1)?,
            section,
            label: row.get(3)?,
            completed: row.get(4)?,
            completed_at: row.get(5)?,
        })
    }
}

fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} is required", field));
    }
    Ok(())
}
