//! kongarc CLI
//!
//! Archives shared user-created content from Kongregate game pages into a
//! local, resumable archive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use kongarc::{
    config::Settings,
    error::{AppError, Result},
    pipeline,
    services::ContentTypeDiscovery,
    utils::http,
};

/// kongarc - Kongregate shared-content archiver
#[derive(Parser, Debug)]
#[command(name = "kongarc", version, about = "Kongregate shared-content archiver")]
struct Cli {
    /// Directory holding the archive, checkpoints, and settings file
    #[arg(short, long, default_value = ".")]
    storage_dir: PathBuf,

    /// Path to the settings file (default: {storage_dir}/settings.toml)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover and archive all shared content of a game
    Archive {
        /// Account name of the game's owner
        owner: String,

        /// Game name as it appears in the URL
        game: String,
    },

    /// List a game's crawlable content types without archiving
    Discover { owner: String, game: String },

    /// Validate the settings file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings_path = cli
        .settings
        .unwrap_or_else(|| cli.storage_dir.join("settings.toml"));
    let settings = Settings::load_or_default(&settings_path);
    settings.validate()?;

    // Ctrl-C flips the token; in-flight writes observe it and the run ends
    // with an orderly exit instead of a partial archive entry.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, finishing safely...");
            signal_token.cancel();
        }
    });

    match cli.command {
        Command::Archive { owner, game } => {
            log::info!("Archiving shared content of {}/{}", owner, game);
            match pipeline::run_archive(&settings, &owner, &game, &cli.storage_dir, cancel).await {
                Ok(()) => log::info!("Archive complete!"),
                Err(AppError::Cancelled) => {
                    log::info!("Safely exited from I/O operation.");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        Command::Discover { owner, game } => {
            let client = http::create_client(&settings.user_agent, settings.timeout_secs)?;
            let discovery = ContentTypeDiscovery::new(&client, &settings.origin);
            let content_types = discovery.discover(&owner, &game).await?;

            if content_types.is_empty() {
                log::info!("No shared content found for {}/{}", owner, game);
            } else {
                log::info!("Content types for {}/{}:", owner, game);
                for content_type in &content_types {
                    println!("{content_type}");
                }
            }
        }

        Command::Validate => {
            log::info!("Settings OK: {}", settings_path.display());
            log::info!(
                "origin={} thumbnails={} compression={} pool={}",
                settings.origin,
                settings.download_thumbnails,
                settings.compress,
                settings.pool_size
            );
        }
    }

    Ok(())
}
