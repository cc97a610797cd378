//! Command implementations.

pub mod api;
pub mod auth;

pub use api::{handle_album, handle_artist, handle_get, handle_mixes, handle_track};
pub use auth::{handle_login, handle_logout, handle_refresh, handle_status};

use crate::cli::args::ShellType;
use crate::error::Result;

/// Handles the `tidal-bridge completions <shell>` command.
///
/// Generates shell completion scripts.
pub fn handle_completions(shell: ShellType) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell};

    let mut cmd = crate::cli::Cli::command();
    let shell = match shell {
        ShellType::Bash => Shell::Bash,
        ShellType::Zsh => Shell::Zsh,
        ShellType::Fish => Shell::Fish,
    };

    generate(shell, &mut cmd, "tidal-bridge", &mut std::io::stdout());

    Ok(())
}
