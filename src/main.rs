mod activity;
mod config;
mod db;
mod metrics;
mod models;
mod streak;
mod transition;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use db::{Database, JobFilter, SortField};
use models::{JobApplication, JobStatus, JobUpdate, NewJob, StudyTopic};
use serde::Serialize;
use transition::Board;

#[derive(Parser)]
#[command(name = "prep")]
#[command(about = "Career prep tracker - job applications, study topics, and progress dashboard")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Track a new job application
    Add {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        role: String,

        /// Wishlist, Applied, OA, "Interview Scheduled", Interview, Offer, Accepted, Rejected
        #[arg(short, long, default_value = "Applied")]
        status: JobStatus,

        #[command(flatten)]
        details: JobDetails,
    },

    /// List job applications
    List {
        /// Only show jobs with this status
        #[arg(short, long)]
        status: Option<JobStatus>,

        #[arg(long, value_enum, default_value = "created-at")]
        sort: SortArg,

        /// Sort ascending (oldest first for dates)
        #[arg(long, conflicts_with = "desc")]
        asc: bool,

        /// Sort descending (default for created-at)
        #[arg(long)]
        desc: bool,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Edit a job application
    Edit {
        /// Job ID
        id: i64,

        #[arg(short, long)]
        company: Option<String>,

        #[arg(short, long)]
        role: Option<String>,

        #[arg(short, long)]
        status: Option<JobStatus>,

        #[command(flatten)]
        details: JobDetails,
    },

    /// Move a job to another board column
    Move {
        /// Job ID
        id: i64,

        /// Target status
        status: String,
    },

    /// Delete a job application
    Delete {
        /// Job ID
        id: i64,
    },

    /// Show jobs grouped by status
    Board,

    /// Track study topics
    Study {
        #[command(subcommand)]
        command: StudyCommands,
    },

    /// Job funnel, preparation progress, and recent activity
    Dashboard,
}

#[derive(Subcommand)]
enum StudyCommands {
    /// Add the default topic catalog (keeps existing progress)
    Seed,

    /// List topics and completion
    List,

    /// Mark a topic complete, or incomplete if it already is
    Toggle {
        /// Topic ID, e.g. "arrays"
        topic_id: String,
    },
}

#[derive(Args)]
struct JobDetails {
    #[arg(long)]
    notes: Option<String>,

    /// Date the application was submitted (YYYY-MM-DD)
    #[arg(long)]
    applied_at: Option<NaiveDate>,

    /// Application deadline (YYYY-MM-DD)
    #[arg(long)]
    deadline: Option<NaiveDate>,

    /// Next follow-up or interview date (YYYY-MM-DD)
    #[arg(long)]
    follow_up: Option<NaiveDate>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    salary: Option<String>,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    resume_url: Option<String>,

    #[arg(long)]
    resume_version: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Company,
    Role,
    Status,
    AppliedAt,
    FollowUp,
    CreatedAt,
}

impl SortArg {
    /// Newest-first for creation time, A-Z / oldest-first for everything else.
    fn descending(self, asc: bool, desc: bool) -> bool {
        if asc || desc {
            return desc;
        }
        matches!(self, SortArg::CreatedAt)
    }
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Company => SortField::Company,
            SortArg::Role => SortField::Role,
            SortArg::Status => SortField::Status,
            SortArg::AppliedAt => SortField::AppliedAt,
            SortArg::FollowUp => SortField::FollowUpDate,
            SortArg::CreatedAt => SortField::CreatedAt,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    job_metrics: metrics::JobMetrics,
    pipeline: Option<metrics::PipelineSummary>,
    prep_metrics: metrics::PrepMetrics,
    activity: activity::ActivityFeed,
}

fn init_tracing(quiet: bool, verbose: bool, default_level: &str) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        default_level
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("PREP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize tracing subscriber: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load().context("Failed to load configuration")?;
    init_tracing(cli.quiet, cli.verbose, &config.log_level)?;

    let db = Database::open(config.database_path.as_deref(), config.user_id)?;
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            company,
            role,
            status,
            details,
        } => {
            db.ensure_initialized()?;
            let new_job = NewJob {
                company,
                role,
                status,
                notes: details.notes,
                applied_at: details.applied_at,
                deadline: details.deadline,
                location: details.location,
                salary_range: details.salary,
                job_url: details.url,
                resume_url: details.resume_url,
                resume_version: details.resume_version,
                follow_up_date: details.follow_up,
            };
            let job = db.create_job(&new_job, Utc::now())?;
            if json {
                print_json(&job)?;
            } else {
                println!("Added job #{} ({} at {})", job.id, job.role, job.company);
            }
        }

        Commands::List {
            status,
            sort,
            asc,
            desc,
        } => {
            db.ensure_initialized()?;
            let jobs = db.list_jobs(&JobFilter {
                status,
                sort: sort.into(),
                descending: sort.descending(asc, desc),
            })?;
            if json {
                print_json(&jobs)?;
            } else if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                print_job_table(&jobs);
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_job(id)? {
                Some(job) if json => print_json(&job)?,
                Some(job) => print_job_detail(&job),
                None => return Err(anyhow!("Job #{} not found", id)),
            }
        }

        Commands::Edit {
            id,
            company,
            role,
            status,
            details,
        } => {
            db.ensure_initialized()?;
            let update = JobUpdate {
                company,
                role,
                status,
                notes: details.notes,
                applied_at: details.applied_at,
                deadline: details.deadline,
                location: details.location,
                salary_range: details.salary,
                job_url: details.url,
                resume_url: details.resume_url,
                resume_version: details.resume_version,
                follow_up_date: details.follow_up,
            };
            let job = db
                .update_job(id, update)?
                .ok_or_else(|| anyhow!("Job #{} not found", id))?;
            if json {
                print_json(&job)?;
            } else {
                println!("Updated job #{}", job.id);
            }
        }

        Commands::Move { id, status } => {
            db.ensure_initialized()?;
            let mut board = Board::from_jobs(db.list_jobs(&JobFilter::default())?);
            let previous = board.job(id).map(|j| j.status);
            let persist = |job: &JobApplication| db.update_job_status(job.id, job.status);
            let job = board.move_job(id, &status, persist)?;
            if json {
                print_json(job)?;
            } else if let Some(previous) = previous {
                println!("Moved job #{} from {} to {}", job.id, previous, job.status);
            }
        }

        Commands::Delete { id } => {
            db.ensure_initialized()?;
            if !db.delete_job(id)? {
                return Err(anyhow!("Job #{} not found", id));
            }
            println!("Deleted job #{}", id);
        }

        Commands::Board => {
            db.ensure_initialized()?;
            let board = Board::from_jobs(db.list_jobs(&JobFilter::default())?);
            let columns = board.columns();
            if json {
                let by_status: Vec<_> = columns
                    .iter()
                    .map(|(status, cards)| serde_json::json!({ "status": status, "jobs": cards }))
                    .collect();
                print_json(&by_status)?;
            } else {
                for (status, cards) in columns {
                    println!("{} ({})", status, cards.len());
                    for job in cards {
                        println!(
                            "  #{:<5} {} - {}",
                            job.id,
                            truncate(&job.company, 20),
                            truncate(&job.role, 30)
                        );
                    }
                }
            }
        }

        Commands::Study { command } => {
            db.ensure_initialized()?;
            match command {
                StudyCommands::Seed => {
                    let topics = db.seed_topics()?;
                    if json {
                        print_json(&topics)?;
                    } else {
                        println!("Seed complete: {} topics", topics.len());
                    }
                }

                StudyCommands::List => {
                    let topics = db.list_topics()?;
                    if json {
                        print_json(&topics)?;
                    } else if topics.is_empty() {
                        println!("No study topics. Run 'prep study seed' first.");
                    } else {
                        print_topic_table(&topics);
                    }
                }

                StudyCommands::Toggle { topic_id } => {
                    let topic = db
                        .toggle_topic(&topic_id, Utc::now())?
                        .ok_or_else(|| anyhow!("Topic '{}' not found", topic_id))?;
                    if json {
                        print_json(&topic)?;
                    } else if topic.completed {
                        println!("Completed '{}'", topic.label);
                    } else {
                        println!("Marked '{}' as not done", topic.label);
                    }
                }
            }
        }

        Commands::Dashboard => {
            db.ensure_initialized()?;
            let now = Utc::now();
            let rows = db.list_job_rows()?;
            let jobs = db.list_jobs(&JobFilter::default())?;
            let topics = db.list_topics()?;

            let dashboard = Dashboard {
                job_metrics: metrics::compute_job_metrics(&rows, now),
                pipeline: metrics::compute_pipeline(&rows),
                prep_metrics: metrics::compute_prep_metrics(&topics),
                activity: activity::build_activity(&jobs, &topics, now),
            };
            if json {
                print_json(&dashboard)?;
            } else {
                print_dashboard(&dashboard);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_job_table(jobs: &[JobApplication]) {
    println!(
        "{:<6} {:<20} {:<20} {:<26} {:>10}",
        "ID", "STATUS", "COMPANY", "ROLE", "APPLIED"
    );
    println!("{}", "-".repeat(86));
    for job in jobs {
        println!(
            "{:<6} {:<20} {:<20} {:<26} {:>10}",
            job.id,
            job.status,
            truncate(&job.company, 18),
            truncate(&job.role, 24),
            job.applied_at
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_job_detail(job: &JobApplication) {
    println!("Job #{}", job.id);
    println!("Company: {}", job.company);
    println!("Role: {}", job.role);
    println!("Status: {}", job.status);
    if let Some(location) = &job.location {
        println!("Location: {}", location);
    }
    if let Some(salary) = &job.salary_range {
        println!("Salary: {}", salary);
    }
    if let Some(date) = job.applied_at {
        println!("Applied: {}", date);
    }
    if let Some(date) = job.deadline {
        println!("Deadline: {}", date);
    }
    if let Some(date) = job.follow_up_date {
        println!("Follow up: {}", date);
    }
    if let Some(url) = &job.job_url {
        println!("URL: {}", url);
    }
    match (&job.resume_version, &job.resume_url) {
        (Some(version), Some(url)) => println!("Resume: {} ({})", version, url),
        (Some(version), None) => println!("Resume: {}", version),
        (None, Some(url)) => println!("Resume: {}", url),
        (None, None) => {}
    }
    println!("Created: {}", job.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(notes) = &job.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn print_topic_table(topics: &[StudyTopic]) {
    println!(
        "{:<4} {:<16} {:<15} {:<26} {:<16}",
        "", "TOPIC", "SECTION", "LABEL", "COMPLETED"
    );
    println!("{}", "-".repeat(80));
    for topic in topics {
        println!(
            "{:<4} {:<16} {:<15} {:<26} {:<16}",
            if topic.completed { "[x]" } else { "[ ]" },
            truncate(&topic.topic_id, 14),
            topic.section,
            truncate(&topic.label, 24),
            topic
                .completed_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default()
        );
    }
}

fn print_dashboard(d: &Dashboard) {
    let m = &d.job_metrics;
    println!("Job Metrics");
    println!("  Total applications: {}", m.total);
    println!(
        "  Applied: {}  OA: {}  Interviewing: {}  Offers: {}  Rejected: {}",
        m.applied, m.oa, m.interviewing, m.offers, m.rejected
    );
    println!(
        "  Response rate: {}% ({} of {} responded)",
        m.response_rate, m.responded, m.total
    );
    println!(
        "  This week: {} ({:+}% vs last week)",
        m.weekly_applications, m.weekly_trend
    );

    if let Some(p) = &d.pipeline {
        println!("\nPipeline");
        for stage in &p.stages {
            println!("  {:<20} {}", stage.status, stage.count);
        }
        println!("  Offer conversion: {}%", p.conversion_rate);
    }

    let prep = &d.prep_metrics;
    println!("\nPreparation");
    println!(
        "  Progress: {}% ({} of {} topics)",
        prep.progress_percent, prep.completed_count, prep.total_count
    );
    println!(
        "  Weakest domain: {}",
        prep.weakest_domain
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Last studied: {}",
        prep.last_studied_topic.as_deref().unwrap_or("-")
    );

    let a = &d.activity;
    println!("\nActivity");
    match &a.upcoming_interview {
        Some(i) => println!(
            "  Upcoming interview: {} - {} ({})",
            i.company,
            i.role,
            i.follow_up_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "date TBD".to_string())
        ),
        None => println!("  Upcoming interview: none"),
    }
    if let Some(t) = &a.suggested_topic {
        println!("  Suggested topic: {} ({})", t.label, t.section);
    }
    println!("  Study streak: {} day(s)", a.study_streak);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_dates_and_status() {
        let cli = Cli::try_parse_from([
            "prep",
            "add",
            "-c",
            "Google",
            "-r",
            "SWE Intern",
            "-s",
            "Interview Scheduled",
            "--applied-at",
            "2026-02-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { status, details, .. } => {
                assert_eq!(status, JobStatus::InterviewScheduled);
                assert_eq!(details.applied_at, NaiveDate::from_ymd_opt(2026, 2, 1));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn rejects_unknown_status_flag() {
        assert!(Cli::try_parse_from(["prep", "list", "--status", "Ghosted"]).is_err());
    }

    fn list_order(args: &[&str]) -> bool {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::List { sort, asc, desc, .. } => sort.descending(asc, desc),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn list_defaults_to_newest_first() {
        assert!(list_order(&["prep", "list"]));
        assert!(!list_order(&["prep", "list", "--asc"]));
        assert!(!list_order(&["prep", "list", "--sort", "company"]));
        assert!(list_order(&["prep", "list", "--sort", "company", "--desc"]));
    }

    #[test]
    fn list_rejects_both_directions() {
        assert!(Cli::try_parse_from(["prep", "list", "--asc", "--desc"]).is_err());
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Überlange Firma GmbH", 10), "Überlan...");
    }
}
