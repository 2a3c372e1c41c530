use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{info, info_span};

use mediaprogress::backend::create_store;
use mediaprogress::cli::{Cli, Command, InsertExample, ReadExample};
use mediaprogress::config::{Config, StoreBackend};
use mediaprogress::{ProgressRepository, logging, scenarios};

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if cli.memory {
        config.store.backend = StoreBackend::Memory;
    }
    if let Some(path) = &cli.store {
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = path.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _logging = logging::init(&config.logging, cli.verbose).context("Failed to setup logging")?;

    info!(table = %config.store.table, backend = ?config.store.backend, "mediaprogress starting");

    let store = create_store(&config.store).context("Failed to open store")?;
    let repo = ProgressRepository::from_config(store, &config).with_span(info_span!("repository"));
    let now = chrono::Utc::now().timestamp();

    match cli.command {
        Command::Insert { example } => match example {
            InsertExample::One => {
                let progress = scenarios::insert_one(&repo, now).await?;
                println!("{} Wrote {}", "✓".green(), progress.key()?.row_key().cyan());
            }
            InsertExample::Conditional => {
                for (progress, applied) in scenarios::insert_conditional(&repo, now).await? {
                    let row_key = progress.key()?.row_key();
                    if applied {
                        println!("{} Applied {} (event_at {})", "✓".green(), row_key.cyan(), progress.event_at);
                    } else {
                        println!("{} Skipped {} (event_at {})", "-".yellow(), row_key.cyan(), progress.event_at);
                    }
                }
            }
            InsertExample::Batch => {
                let report = scenarios::insert_batch(&repo, now).await?;
                for row in &report.rows {
                    match &row.result {
                        Ok(()) => println!("{} Wrote {}", "✓".green(), row.row_key.cyan()),
                        Err(e) => println!("{} Failed {}: {}", "✗".red(), row.row_key.cyan(), e),
                    }
                }
                if !report.is_success() {
                    return Err(eyre::eyre!(
                        "{} of {} rows failed",
                        report.rows.len() - report.applied_count(),
                        report.rows.len()
                    ));
                }
            }
        },
        Command::Read { example } => match example {
            ReadExample::One => print_json(&scenarios::read_one(&repo).await?)?,
            ReadExample::Multiple => print_json(&scenarios::read_multiple(&repo).await?)?,
            ReadExample::PartialKey => print_json(&scenarios::read_partial_key(&repo).await?)?,
        },
        Command::Delete => {
            let key = scenarios::delete(&repo).await?;
            println!("{} Deleted {}", "✓".green(), key.row_key().cyan());
        }
    }

    Ok(())
}
