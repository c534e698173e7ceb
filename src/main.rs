// src/main.rs

//! torivahti: tori.fi listing monitor CLI
//!
//! Long-running process: scans the classifieds index per topic, detects
//! new listings against a retained baseline, and alarms subscribed users
//! on matching saved searches.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use torivahti::error::Result;
use torivahti::models::Config;
use torivahti::notify::{LogNotifier, Notifier};
use torivahti::pipeline;
use torivahti::storage::{ItemStore, JsonStore};

/// torivahti - classifieds monitor
#[derive(Parser, Debug)]
#[command(name = "torivahti", version, about = "tori.fi listing monitor")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor all enabled topics until interrupted
    Monitor,

    /// Run a single scan cycle per topic, then exit
    Scan,

    /// Validate the configuration file
    Validate,

    /// Show the persisted baselines
    Show,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn show_baselines(store: &JsonStore) -> Result<()> {
    let items = store.get_items(None).await?;
    let cars = store.get_cars().await?;
    println!("general: {} items", items.len());
    for item in &items {
        println!("{}", item);
    }
    println!("cars: {} items", cars.len());
    for item in &cars {
        println!("{}", item);
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Arc::new(Config::load_or_default(&cli.config));
    let store = JsonStore::new(&config.storage.data_dir);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    match cli.command {
        Command::Monitor => {
            config.validate()?;
            pipeline::run_monitor(config.clone(), Arc::new(store), notifier).await?;
        }
        Command::Scan => {
            config.validate()?;
            pipeline::run_scan(config.clone(), Arc::new(store), notifier).await?;
        }
        Command::Validate => {
            config.validate()?;
            println!("configuration OK");
        }
        Command::Show => {
            show_baselines(&store).await?;
        }
    }

    Ok(())
}
