pub mod history;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use history::{process_history_command, HistoryCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    storage::store::JsonFileStore,
    tracker::{
        control::{handle_control, ControlRequest, ControlResponse},
        start_tracker,
    },
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

const DIR_HELP: &str =
    "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state";

#[derive(Parser, Debug)]
#[command(name = "Webtime", version, long_about = None)]
#[command(about = "Tracks and classifies time spent on websites", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the tracker in the current console, reading browser events from stdin"
    )]
    Serve {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Show today's, this week's and archived activity")]
    Stats {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Display raw observations from the history log")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Print the entire store as JSON")]
    Export {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Reset today's counters")]
    Reset {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Delete all tracked data and start over")]
    Clear {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Serve { dir } => {
            let dir = resolve_dir(dir)?;
            enable_logging(DAEMON_PREFIX, &dir, logging_level, args.log)?;
            start_tracker(dir).await
        }
        Commands::Stats { dir } => {
            let store = open_store(dir, logging_level, args.log)?;
            let response =
                handle_control(&store, ControlRequest::GetStats, Utc::now().date_naive()).await?;
            if let ControlResponse::Stats(stats) = response {
                output::render_stats(&stats);
            }
            Ok(())
        }
        Commands::History { command, dir } => {
            let store = open_store(dir, logging_level, args.log)?;
            process_history_command(command, &store).await
        }
        Commands::Export { dir } => {
            let store = open_store(dir, logging_level, args.log)?;
            let response =
                handle_control(&store, ControlRequest::ExportData, Utc::now().date_naive()).await?;
            if let ControlResponse::Export(snapshot) = response {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(())
        }
        Commands::Reset { dir } => {
            let store = open_store(dir, logging_level, args.log)?;
            handle_control(&store, ControlRequest::ResetData, Utc::now().date_naive()).await?;
            println!("Daily counters reset");
            Ok(())
        }
        Commands::Clear { dir } => {
            let store = open_store(dir, logging_level, args.log)?;
            handle_control(&store, ControlRequest::ClearAllData, Utc::now().date_naive()).await?;
            println!("All tracked data deleted");
            Ok(())
        }
    }
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        }
        None => create_application_default_path(),
    }
}

fn open_store(
    dir: Option<PathBuf>,
    logging_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<JsonFileStore> {
    let dir = resolve_dir(dir)?;
    enable_logging(CLI_PREFIX, &dir, logging_level, show_std)?;
    Ok(JsonFileStore::new(dir.join("state"))?)
}
