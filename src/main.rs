use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use newsdesk::category::Category;
use newsdesk::config::Config;
use newsdesk::ingest::Ingestor;
use newsdesk::storage::Database;

/// Get the config directory path (~/.config/newsdesk/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdesk"))
}

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Categorized RSS/Atom content ingestion")]
struct Args {
    /// Path to the config file (default: ~/.config/newsdesk/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the SQLite database (default: ~/.config/newsdesk/content.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an ingestion cycle
    Ingest {
        /// Category to ingest
        #[arg(long, value_enum, conflicts_with = "all")]
        category: Option<Category>,

        /// Ingest every category
        #[arg(long)]
        all: bool,
    },
    /// Delete content older than the retention window
    Prune {
        /// Retention window in days (default: from config)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Manage registry-backed feed sources
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
    /// Show stored item counts per category
    Status,
    /// List the most recent items in a category
    Recent {
        #[arg(long, value_enum)]
        category: Category,

        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[derive(Subcommand, Debug)]
enum SourcesAction {
    /// Register a feed (updates name/category if the URL exists)
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        url: String,

        #[arg(long, value_enum)]
        category: Category,
    },
    /// List registered feeds
    List {
        #[arg(long, value_enum)]
        category: Option<Category>,
    },
    /// Re-enable a feed
    Enable { id: i64 },
    /// Stop polling a feed without deleting it
    Disable { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = args.db.unwrap_or_else(|| config_dir.join("content.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .context("Failed to open database")?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Ingest { category, all } => {
            let ingestor = Ingestor::new(db, client, config);
            if all {
                for result in ingestor.run_all().await {
                    match result {
                        Ok(summary) => println!(
                            "{}: {} inserted ({} feeds ok, {} failed)",
                            summary.category.label(),
                            summary.inserted,
                            summary.feeds_ok,
                            summary.feeds_failed
                        ),
                        Err(e) => eprintln!("category run failed: {}", e),
                    }
                }
            } else {
                let category = category
                    .ok_or_else(|| anyhow::anyhow!("specify --category <tag> or --all"))?;
                let summary = ingestor.run_category(category).await?;
                println!(
                    "{}: {} inserted ({} feeds ok, {} failed)",
                    summary.category.label(),
                    summary.inserted,
                    summary.feeds_ok,
                    summary.feeds_failed
                );
            }
        }
        Command::Prune { days } => {
            let retention_days = days.unwrap_or(config.retention_days);
            let ingestor = Ingestor::new(db, client, config);
            let summary = ingestor.prune_all(retention_days).await?;
            for (category, deleted) in &summary.per_category {
                if *deleted > 0 {
                    println!("{}: {} deleted", category.label(), deleted);
                }
            }
            println!("total: {} deleted", summary.total);
        }
        Command::Sources { action } => match action {
            SourcesAction::Add {
                name,
                url,
                category,
            } => {
                let id = db.add_source(&name, &url, category).await?;
                println!("registered source {} ({})", id, url);
            }
            SourcesAction::List { category } => {
                for source in db.list_sources(category).await? {
                    let state = if source.is_active { "active" } else { "disabled" };
                    let error = source
                        .fetch_error
                        .map(|e| format!(" [last error: {}]", e))
                        .unwrap_or_default();
                    println!(
                        "{:>4}  {:<20} {:<10} {}{}",
                        source.id,
                        source.category.to_string(),
                        state,
                        source.url,
                        error
                    );
                }
            }
            SourcesAction::Enable { id } => {
                db.set_source_active(id, true).await?;
                println!("source {} enabled", id);
            }
            SourcesAction::Disable { id } => {
                db.set_source_active(id, false).await?;
                println!("source {} disabled", id);
            }
        },
        Command::Status => {
            for category in Category::ALL {
                let count = db.count_content(category).await?;
                println!("{:<24} {}", category.label(), count);
            }
        }
        Command::Recent { category, limit } => {
            for record in db.recent_content(category, limit).await? {
                let date = chrono::DateTime::from_timestamp(record.pub_date, 0)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| record.pub_date.to_string());
                println!("{}  {}  [{}]", date, record.title, record.source_name);
            }
        }
    }

    Ok(())
}
