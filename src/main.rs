use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchdown::landing_log::parse_landing_log;
use touchdown::log_watcher::{LogWatcher, WatchPaths};
use touchdown::logbook::parse_logbook;
use touchdown::settings::{self, LinkSettings};
use touchdown::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "touchdown",
    about = "Correlate X-Plane logbook flights with landing sensor log entries."
)]
struct Cli {
    /// Settings file (default: $TOUCHDOWN_SETTINGS or ./touchdown.toml)
    #[arg(long = "settings")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse both logs once and print the link maps as JSON
    Link {
        #[arg(long = "logbook")]
        logbook: PathBuf,
        #[arg(long = "landings")]
        landings: PathBuf,
    },
    /// Print logbook and landing summaries as JSON
    Summary {
        #[arg(long = "logbook")]
        logbook: PathBuf,
        #[arg(long = "landings")]
        landings: PathBuf,
    },
    /// Watch both logs and re-link on every change until interrupted
    Watch {
        #[arg(long = "logbook")]
        logbook: PathBuf,
        #[arg(long = "landings")]
        landings: PathBuf,
    },
    /// Set the clustering time window in minutes (1-60)
    SetWindow { minutes: u32 },
    /// Manually link a landing index to a flight index
    SetOverride { landing: usize, flight: usize },
    /// Remove the manual link for a landing index
    ClearOverride { landing: usize },
    /// Remove all manual links
    ClearOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(settings::settings_path);
    let state = AppState::new(
        LinkSettings::load(&settings_path)?,
        Some(settings_path.clone()),
    );

    match cli.command {
        Command::Link { logbook, landings } => {
            state
                .replace_records(parse_logbook(&logbook)?, parse_landing_log(&landings)?)
                .await;
            println!("{}", serde_json::to_string_pretty(&state.links().await)?);
        }
        Command::Summary { logbook, landings } => {
            state
                .replace_records(parse_logbook(&logbook)?, parse_landing_log(&landings)?)
                .await;
            let summaries = serde_json::json!({
                "logbook": state.logbook_summary().await,
                "landings": state.landing_summary().await,
            });
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Watch { logbook, landings } => {
            let mut watcher = LogWatcher::new();
            watcher
                .start(
                    WatchPaths {
                        logbook,
                        landing_log: landings,
                    },
                    state.clone(),
                )
                .await;

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            watcher.stop().await;
        }
        Command::SetWindow { minutes } => {
            state.set_cluster_window(minutes).await?;
            info!(minutes, "Cluster window updated");
        }
        Command::SetOverride { landing, flight } => {
            state.set_override(landing, flight).await;
            info!(landing, flight, "Override set");
        }
        Command::ClearOverride { landing } => {
            if state.clear_override(landing).await {
                info!(landing, "Override cleared");
            } else {
                info!(landing, "No override for landing");
            }
        }
        Command::ClearOverrides => {
            state.clear_overrides().await;
            info!("All overrides cleared");
        }
    }

    Ok(())
}
