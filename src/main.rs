use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod accounts;
mod config;
mod db;
mod error;
mod gpa;
mod grades;
mod models;
mod report;
mod roster;
mod session;

use config::AppConfig;
use gpa::format_gpa;
use models::{ClassDraft, ClassId, GpaSnapshot};
use report::ReportInput;
use roster::RosterStore;

#[derive(Parser)]
#[command(name = "gpa-tracker")]
#[command(about = "Weighted and unweighted GPA tracker for Group Scholar", long_about = None)]
struct Cli {
    /// Roster file to read and update (defaults to GPA_ROSTER_PATH or roster.json)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a class to a marking period (the last one by default)
    AddClass {
        #[arg(long)]
        name: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        credits: String,
        #[arg(long, default_value = "Regular")]
        track: String,
        #[arg(long)]
        period: Option<u32>,
    },
    /// Replace every field of an existing class
    EditClass {
        #[arg(long)]
        id: ClassId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        credits: String,
        #[arg(long)]
        track: String,
    },
    /// Remove a class
    DeleteClass {
        #[arg(long)]
        id: ClassId,
    },
    /// Start a new marking period
    AddPeriod,
    /// Remove a marking period and its classes
    DeletePeriod {
        #[arg(long)]
        period: u32,
    },
    /// Reset to a single empty marking period
    Clear,
    /// Print every marking period and the current GPA
    Show,
    /// Import classes from a CSV file (period,name,grade,credits,track)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Create an account for saving GPA history
    CreateAccount {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Render a report and save a GPA snapshot to your history
    Save {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// List saved GPA snapshots, newest first
    History {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Delete one saved snapshot
    DeleteSnapshot {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        id: i64,
    },
    /// Delete every saved snapshot
    DeleteHistory {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Render the GPA report without saving a snapshot
    Report {
        #[arg(long)]
        username: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("GPA_TRACKER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_gpa(roster: &RosterStore) {
    let gpa = roster.gpa();
    println!(
        "Weighted GPA: {}  Unweighted GPA: {}",
        format_gpa(gpa.weighted),
        format_gpa(gpa.unweighted)
    );
}

fn print_roster(roster: &RosterStore) {
    for period in roster.periods() {
        println!("Marking Period {}", period.ordinal);
        if period.classes.is_empty() {
            println!("  (no classes)");
        }
        for record in &period.classes {
            println!(
                "  {} {} | {} | {} credits | {} | {:.2}",
                record.id,
                record.name,
                record.grade,
                record.credits,
                record.track,
                grades::resolve(record.grade, record.track)
            );
        }
    }
    print_gpa(roster);
}

/// Applies one roster mutation and persists the roster only if it succeeded.
fn mutate<T>(
    path: &std::path::Path,
    apply: impl FnOnce(&mut RosterStore) -> anyhow::Result<T>,
) -> anyhow::Result<(RosterStore, T)> {
    let mut roster = session::load_roster(path)?;
    let value = apply(&mut roster)?;
    session::save_roster(path, &roster)?;
    print_gpa(&roster);
    Ok((roster, value))
}

/// Renders the report, then stores a snapshot pointing at it. A failed insert
/// removes the report so no file is left without a snapshot.
async fn save_with_report(
    pool: &sqlx::SqlitePool,
    user_id: &str,
    roster: &RosterStore,
    config: &AppConfig,
) -> anyhow::Result<(i64, PathBuf)> {
    let generated_at = Utc::now();
    let input = ReportInput {
        username: user_id,
        periods: roster.periods(),
        gpa: roster.gpa(),
        generated_at,
        rows_per_page: config.rows_per_page,
    };
    let report_path = report::render_to_dir(&input, &config.report_dir)
        .context("report generation failed; nothing was saved")?;

    let snapshot = GpaSnapshot {
        period_count: roster.period_count(),
        weighted_gpa: roster.gpa().weighted,
        unweighted_gpa: roster.gpa().unweighted,
        saved_at: generated_at,
        report_ref: report_path.display().to_string(),
    };
    match db::save_snapshot(pool, user_id, &snapshot).await {
        Ok(id) => Ok((id, report_path)),
        Err(err) => {
            if let Err(remove_err) = std::fs::remove_file(&report_path) {
                warn!(path = %report_path.display(), error = %remove_err, "failed to remove orphaned report");
            }
            Err(anyhow::Error::new(err).context("failed to save GPA snapshot"))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.roster {
        config.roster_path = path;
    }
    let roster_path = config.roster_path.clone();

    match cli.command {
        Commands::AddClass {
            name,
            grade,
            credits,
            track,
            period,
        } => {
            let draft = ClassDraft::parse(&name, &grade, &credits, &track)?;
            let (_, record) = mutate(&roster_path, |roster| Ok(roster.add_class(period, draft)?))?;
            println!("Added {} ({}).", record.name, record.id);
        }
        Commands::EditClass {
            id,
            name,
            grade,
            credits,
            track,
        } => {
            let draft = ClassDraft::parse(&name, &grade, &credits, &track)?;
            let (_, name) = mutate(&roster_path, |roster| {
                roster.edit_class(id, draft)?;
                Ok(roster.class(id).map(|record| record.name.clone()))
            })?;
            println!("Updated {} ({id}).", name.unwrap_or_default());
        }
        Commands::DeleteClass { id } => {
            mutate(&roster_path, |roster| Ok(roster.delete_class(id)?))?;
            println!("Deleted {id}.");
        }
        Commands::AddPeriod => {
            let (_, ordinal) = mutate(&roster_path, |roster| Ok(roster.add_period().ordinal))?;
            println!("Marking Period {ordinal} added.");
        }
        Commands::DeletePeriod { period } => {
            mutate(&roster_path, |roster| Ok(roster.delete_period(period)?))?;
            println!("Marking Period {period} deleted.");
        }
        Commands::Clear => {
            mutate(&roster_path, |roster| {
                roster.clear_all();
                Ok(())
            })?;
            println!("All classes cleared.");
        }
        Commands::Show => {
            let roster = session::load_roster(&roster_path)?;
            print_roster(&roster);
        }
        Commands::Import { csv } => {
            let (_, imported) = mutate(&roster_path, |roster| session::import_csv(roster, &csv))?;
            println!("Imported {imported} classes from {}.", csv.display());
        }
        Commands::CreateAccount {
            username,
            password,
            confirm_password,
        } => {
            let pool = open_store(&config).await?;
            accounts::create_account(&pool, &username, &password, &confirm_password).await?;
            println!("Account {username} created.");
        }
        Commands::Save { username, password } => {
            let pool = open_store(&config).await?;
            let user_id = accounts::authenticate(&pool, &username, &password).await?;
            let roster = session::load_roster(&roster_path)?;
            let (id, report_path) = save_with_report(&pool, &user_id, &roster, &config).await?;
            println!("Saved snapshot {id}; report at {}.", report_path.display());
        }
        Commands::History { username, password } => {
            let pool = open_store(&config).await?;
            let user_id = accounts::authenticate(&pool, &username, &password).await?;
            let snapshots = db::load_snapshots(&pool, &user_id).await?;

            if snapshots.is_empty() {
                println!("No saved snapshots.");
                return Ok(());
            }
            for saved in snapshots {
                let snapshot = &saved.snapshot;
                println!(
                    "[{}] {} | {} marking periods | weighted {} | unweighted {} | {}",
                    saved.id,
                    snapshot.saved_at.date_naive(),
                    snapshot.period_count,
                    format_gpa(snapshot.weighted_gpa),
                    format_gpa(snapshot.unweighted_gpa),
                    snapshot.report_ref
                );
            }
        }
        Commands::DeleteSnapshot {
            username,
            password,
            id,
        } => {
            let pool = open_store(&config).await?;
            let user_id = accounts::authenticate(&pool, &username, &password).await?;
            db::delete_snapshot(&pool, &user_id, id).await?;
            println!("Deleted snapshot {id}.");
        }
        Commands::DeleteHistory { username, password } => {
            let pool = open_store(&config).await?;
            let user_id = accounts::authenticate(&pool, &username, &password).await?;
            let removed = db::delete_all_snapshots(&pool, &user_id).await?;
            println!("Deleted {removed} snapshots.");
        }
        Commands::Report { username, out } => {
            let roster = session::load_roster(&roster_path)?;
            let input = ReportInput {
                username: &username,
                periods: roster.periods(),
                gpa: roster.gpa(),
                generated_at: Utc::now(),
                rows_per_page: config.rows_per_page,
            };
            let path = match out {
                Some(path) => report::render_to_file(&input, &path)?,
                None => report::render_to_dir(&input, &config.report_dir)?,
            };
            println!("Report written to {}.", path.display());
        }
    }

    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    db::init_db(&pool).await?;
    Ok(pool)
}
