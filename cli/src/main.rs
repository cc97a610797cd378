//! tidal-bridge CLI - authenticated TIDAL session for tools and agents

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tidal_bridge::cli::{commands, AuthCommands, Cli, Commands};
use tidal_bridge::config::settings::env::LOG_LEVEL;
use tidal_bridge::error::Result;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login { flow, no_browser } => {
                commands::handle_login(flow.map(Into::into), no_browser).await
            }
            AuthCommands::Logout => commands::handle_logout().await,
            AuthCommands::Status => commands::handle_status().await,
            AuthCommands::Refresh => commands::handle_refresh().await,
        },
        Commands::Get { path, query } => commands::handle_get(&path, query).await,
        Commands::Track {
            id,
            lyrics,
            recommendations,
        } => commands::handle_track(&id, lyrics, recommendations).await,
        Commands::Album { id, tracks, review } => commands::handle_album(&id, tracks, review).await,
        Commands::Artist {
            id,
            top_tracks,
            albums,
        } => commands::handle_artist(&id, top_tracks, albums.map(Into::into)).await,
        Commands::Mixes { mix } => commands::handle_mixes(mix.as_deref()).await,
        Commands::Completions { shell } => commands::handle_completions(shell),
    }
}
