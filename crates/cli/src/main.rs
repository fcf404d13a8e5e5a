//! FitTrack CLI - daily workout and meal log with a weekly progress report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fittrack_core::{parse_date, CategoryId, RecordId, RoutineDraft, RoutineRecord};
use fittrack_progress::{DashboardStats, ProgressReport, ProgressTracker, WeeklyProgressTracker};
use fittrack_storage::{JsonStore, RecordStore};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fittrack")]
#[command(about = "Daily workout and meal tracker", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(long, env = "FITTRACK_DATA", default_value = ".fittrack", global = true)]
    data: PathBuf,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = Backend::Json, global = true)]
    backend: Backend,

    /// Day to treat as today (YYYY-MM-DD)
    #[arg(long, value_parser = parse_day, global = true)]
    today: Option<NaiveDate>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// One JSON file per entry
    Json,
    /// SQLite database (requires the `sqlite` feature)
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a workout and meal
    Log {
        /// Workout category
        category: String,
        /// Minutes trained
        #[arg(long)]
        minutes: u32,
        /// What was eaten
        #[arg(long, default_value = "")]
        meal: String,
        /// Day of the workout (defaults to today)
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// Change fields of a logged entry
    Edit {
        /// Entry ID
        id: RecordId,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// New minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// New meal
        #[arg(long)]
        meal: Option<String>,
        /// New day
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// Delete a logged entry
    Delete {
        /// Entry ID
        id: RecordId,
    },
    /// List all entries, newest first
    History,
    /// Categories, history and this week's totals
    Dashboard,
    /// This week's totals and progress report
    Progress,
    /// Manage workout categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// List stored entries that are skipped because they are malformed
    Check,
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List categories
    List,
    /// Add a category
    Add {
        /// Category name
        name: String,
    },
    /// Rename a category
    Rename {
        /// Category ID
        id: CategoryId,
        /// New name
        name: String,
    },
    /// Delete a category (logged entries keep their label)
    Delete {
        /// Category ID
        id: CategoryId,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    categories: Vec<String>,
    history: Vec<RoutineRecord>,
    stats: DashboardStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressView {
    stats: DashboardStats,
    progress: ProgressReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    debug!("Using {} as today", today);

    let mut store = open_store(cli.backend, &cli.data).await?;

    match cli.command {
        Commands::Log { category, minutes, meal, date } => {
            let draft = RoutineDraft::new(date.unwrap_or(today), category, minutes, meal);
            let id = store.insert_record(&draft).await?;
            info!("Logged entry {}", id);
            println!("Logged entry {}: {} | {} | {} min", id, draft.date, draft.category, draft.duration);
        }
        Commands::Edit { id, category, minutes, meal, date } => {
            let Some(current) = store.load_record(id).await? else {
                anyhow::bail!("entry {} not found", id);
            };
            let draft = RoutineDraft {
                date: date.unwrap_or(current.date),
                category: category.unwrap_or(current.category),
                duration: minutes.unwrap_or(current.duration),
                meal: meal.unwrap_or(current.meal),
            };
            store.update_record(id, &draft).await?;
            info!("Updated entry {}", id);
            println!("Updated entry {}", id);
        }
        Commands::Delete { id } => {
            store.delete_record(id).await?;
            info!("Deleted entry {}", id);
            println!("Deleted entry {}", id);
        }
        Commands::History => {
            let history = store.list_records().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                println!("History ({})", history.len());
                print_history(&history);
            }
        }
        Commands::Dashboard => {
            let categories = store
                .list_categories()
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();
            let history = store.list_records().await?;
            let tracker = WeeklyProgressTracker::new(Arc::<dyn RecordStore>::from(store));
            let view = DashboardView {
                categories,
                history,
                stats: tracker.dashboard_stats(today).await?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("FitTrack Dashboard ({})", tracker.window(today));
                print_stats(&view.stats);
                println!("Categories: {}", format_list(&view.categories));
                println!("History ({})", view.history.len());
                print_history(&view.history);
            }
        }
        Commands::Progress => {
            let tracker = WeeklyProgressTracker::new(Arc::<dyn RecordStore>::from(store));
            let view = ProgressView {
                stats: tracker.dashboard_stats(today).await?,
                progress: tracker.progress_report(today).await?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("FitTrack Progress ({})", tracker.window(today));
                print_stats(&view.stats);
                println!("  Score: {}/100", view.progress.score);
                println!("  Level: {}", view.progress.level);
                println!("  Food: {}", view.progress.food_status);
                println!("  Consistency: {}%", view.progress.consistency);
            }
        }
        Commands::Category { action } => run_category(store.as_mut(), action, cli.json).await?,
        Commands::Check => {
            let problems = store.malformed_records().await?;
            if cli.json {
                let messages: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if problems.is_empty() {
                println!("All entries are well formed");
            } else {
                println!("Malformed entries ({}), excluded from stats:", problems.len());
                for problem in &problems {
                    println!("  {}", problem);
                }
            }
        }
    }

    Ok(())
}

async fn open_store(backend: Backend, data: &Path) -> Result<Box<dyn RecordStore>> {
    match backend {
        Backend::Json => {
            let store = JsonStore::new(data)
                .await
                .with_context(|| format!("opening JSON store at {}", data.display()))?;
            Ok(Box::new(store))
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            tokio::fs::create_dir_all(data).await?;
            let path = data.join("fittrack.db");
            let store = fittrack_storage::SqliteStore::new_from_path(&path)
                .await
                .with_context(|| format!("opening SQLite store at {}", path.display()))?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => anyhow::bail!("built without SQLite support; rebuild with --features sqlite"),
    }
}

async fn run_category(store: &mut dyn RecordStore, action: CategoryCommand, json: bool) -> Result<()> {
    match action {
        CategoryCommand::List => {
            let categories = store.list_categories().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                println!("Categories ({})", categories.len());
                for category in categories {
                    println!("  {} | {}", category.id, category.name);
                }
            }
        }
        CategoryCommand::Add { name } => {
            let id = store.insert_category(&name).await?;
            info!("Added category {}", id);
            println!("Added category {}: {}", id, name.trim());
        }
        CategoryCommand::Rename { id, name } => {
            store.rename_category(id, &name).await?;
            info!("Renamed category {}", id);
            println!("Renamed category {} to {}", id, name.trim());
        }
        CategoryCommand::Delete { id } => {
            store.delete_category(id).await?;
            info!("Deleted category {}", id);
            println!("Deleted category {}", id);
        }
    }
    Ok(())
}

fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("expected a date like 2026-01-31, got '{}'", s))
}

fn print_stats(stats: &DashboardStats) {
    println!("  Workouts: {}", stats.total_workouts);
    println!("  Minutes: {}", stats.total_minutes);
    println!("  Most trained: {}", stats.most_trained);
}

fn print_history(history: &[RoutineRecord]) {
    for record in history {
        println!(
            "  {} | {} | {} | {} min | {}",
            record.id, record.date, record.category, record.duration, record.meal
        );
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_with_global_flags() {
        let cli = Cli::try_parse_from([
            "fittrack", "log", "Cardio", "--minutes", "45", "--meal", "rice", "--today", "2026-10-16", "--json",
        ])
        .unwrap();

        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2026, 10, 16));
        assert!(cli.json);
        assert_eq!(cli.backend, Backend::Json);
        match cli.command {
            Commands::Log { category, minutes, meal, date } => {
                assert_eq!(category, "Cardio");
                assert_eq!(minutes, 45);
                assert_eq!(meal, "rice");
                assert!(date.is_none());
            }
            _ => panic!("expected log"),
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["fittrack", "log", "Cardio", "--minutes", "-5"]).is_err());
        assert!(Cli::try_parse_from(["fittrack", "progress", "--today", "16/10/2026"]).is_err());
        assert!(Cli::try_parse_from(["fittrack", "delete", "abc"]).is_err());
    }

    #[test]
    fn test_parse_category_rename() {
        let cli = Cli::try_parse_from(["fittrack", "category", "rename", "3", "Leg Day"]).unwrap();
        match cli.command {
            Commands::Category { action: CategoryCommand::Rename { id, name } } => {
                assert_eq!(id, CategoryId::new(3));
                assert_eq!(name, "Leg Day");
            }
            _ => panic!("expected category rename"),
        }
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[]), "-");
        assert_eq!(format_list(&["Cardio".to_string(), "Legs".to_string()]), "Cardio, Legs");
    }
}
