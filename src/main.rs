use std::path::{Path, PathBuf};

use chrono::Datelike;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keepgoing::client::SyncClient;
use keepgoing::models::{CreateHabitInput, Habit, UpdateHabitInput};
use keepgoing::{api, db, mcp, week};

#[derive(Parser)]
#[command(name = "keepgoing")]
#[command(about = "Weekly habit tracking with streaks")]
struct Cli {
    /// Path to the habits database (defaults to the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Base URL of a running server; data commands go through it instead of
    /// opening the database file directly
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the keepgoing server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Start MCP server via stdio (for agent integration)
    Mcp,
    /// Show this week's habits, progress and streaks
    List,
    /// Start tracking a new habit
    Add { name: String },
    /// Mark a day done (0-6 or sun..sat; defaults to today)
    Check { id: i64, day: Option<String> },
    /// Mark a day not done
    Uncheck { id: i64, day: Option<String> },
    /// Stop tracking a habit
    Rm { id: i64 },
    /// Download the whole store as a snapshot file
    Export { output: PathBuf },
    /// Replace the whole store from a snapshot file
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "keepgoing=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::List);

    match command {
        Commands::Serve { port } => {
            tracing::info!("Starting keepgoing server on port {}", port);

            let db = open_database(cli.db.as_deref())?;
            let app = api::create_router(db);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("keepgoing server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Mcp => {
            let db = open_database(cli.db.as_deref())?;
            mcp::run_stdio_server(db).await?;
        }
        Commands::List => {
            let habits = match &cli.url {
                Some(url) => {
                    let mut client = SyncClient::new(url.clone());
                    client.refresh().await?.to_vec()
                }
                None => open_database(cli.db.as_deref())?.all_habits()?,
            };
            print_week_header();
            if habits.is_empty() {
                println!("No habits yet. Add one with: kpg add <name>");
            }
            for habit in &habits {
                print_habit(habit);
            }
        }
        Commands::Add { name } => {
            let habit = match &cli.url {
                Some(url) => {
                    let mut client = SyncClient::new(url.clone());
                    client.add(&name).await?
                }
                None => open_database(cli.db.as_deref())?
                    .create_habit(&CreateHabitInput { name })?,
            };
            println!("Tracking \"{}\" with id {}", habit.name, habit.id);
        }
        Commands::Check { id, day } => set_day(&cli, id, day.as_deref(), true).await?,
        Commands::Uncheck { id, day } => set_day(&cli, id, day.as_deref(), false).await?,
        Commands::Rm { id } => {
            match &cli.url {
                Some(url) => {
                    let mut client = SyncClient::new(url.clone());
                    client.refresh().await?;
                    client.remove(id).await?;
                }
                None => open_database(cli.db.as_deref())?.delete_habit(id)?,
            }
            println!("Deleted habit {}", id);
        }
        Commands::Export { output } => {
            let bytes = match &cli.url {
                Some(url) => SyncClient::new(url.clone()).export_to(&output).await?,
                None => {
                    let snapshot = open_database(cli.db.as_deref())?.export_snapshot()?;
                    std::fs::write(&output, &snapshot)?;
                    snapshot.len() as u64
                }
            };
            println!("Wrote {} bytes to {}", bytes, output.display());
        }
        Commands::Import { file } => {
            match &cli.url {
                Some(url) => {
                    let mut client = SyncClient::new(url.clone());
                    let count = client.import_from(&file).await?;
                    println!("Imported snapshot, now tracking {} habits", count);
                }
                None => {
                    let db = open_database(cli.db.as_deref())?;
                    db.import_snapshot(&std::fs::read(&file)?)?;
                    println!(
                        "Imported snapshot, now tracking {} habits",
                        db.all_habits()?.len()
                    );
                }
            }
        }
    }

    Ok(())
}

fn open_database(path: Option<&Path>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn set_day(cli: &Cli, id: i64, day: Option<&str>, done: bool) -> anyhow::Result<()> {
    let day = match day {
        Some(raw) => {
            week::parse_day(raw).ok_or_else(|| anyhow::anyhow!("unknown day: {raw}"))?
        }
        None => chrono::Local::now()
            .date_naive()
            .weekday()
            .num_days_from_sunday() as usize,
    };

    let habit = match &cli.url {
        Some(url) => {
            let mut client = SyncClient::new(url.clone());
            client.refresh().await?;
            client.set_day(id, day, done).await?
        }
        None => {
            let db = open_database(cli.db.as_deref())?;
            let habit = db
                .get_habit(id)?
                .ok_or_else(|| anyhow::anyhow!("no habit with id {id}"))?;
            let mut days = habit.days_checked;
            days[day] = done;
            db.update_habit(
                id,
                &UpdateHabitInput {
                    days_checked: days.to_vec(),
                    name: None,
                },
            )?
        }
    };
    print_habit(&habit);
    Ok(())
}

fn print_week_header() {
    let today = chrono::Local::now().date_naive();
    let (start, end) = week::current_week_range(today);
    println!("{} ({} to {})", week::week_label(today), start, end);
}

fn print_habit(habit: &Habit) {
    let days: String = habit
        .days_checked
        .iter()
        .map(|done| if *done { 'x' } else { '.' })
        .collect();
    println!(
        "{:>4}  {:<32} {}  {}/7  streak {}",
        habit.id,
        habit.name,
        days,
        habit.days_done(),
        habit.streak
    );
}
