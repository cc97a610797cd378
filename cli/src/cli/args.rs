//! Command-line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

use crate::auth::LoginFlow;
use crate::endpoints::AlbumFilter;

/// Authenticated TIDAL session for tools and agents.
///
/// Logs in with the device or PKCE OAuth flow, keeps the session file
/// current and sends authenticated API requests.
#[derive(Parser, Debug)]
#[command(name = "tidal-bridge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage authentication.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Send an authenticated GET and print the JSON response.
    Get {
        /// Path relative to the API base, e.g. `tracks/123`.
        path: String,

        /// Query parameter as key=value. Repeatable.
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },

    /// Show a track.
    Track {
        id: String,

        /// Include lyrics.
        #[arg(long)]
        lyrics: bool,

        /// Include this many recommended tracks.
        #[arg(long, value_name = "N")]
        recommendations: Option<usize>,
    },

    /// Show an album.
    Album {
        id: String,

        /// Include up to this many tracks.
        #[arg(long, value_name = "N")]
        tracks: Option<usize>,

        /// Include the editorial review.
        #[arg(long)]
        review: bool,
    },

    /// Show an artist.
    Artist {
        id: String,

        /// Include top tracks.
        #[arg(long, value_name = "N")]
        top_tracks: Option<usize>,

        /// Include releases of this kind.
        #[arg(long, value_enum)]
        albums: Option<AlbumFilterArg>,
    },

    /// List your mixes, or the tracks of one mix.
    Mixes {
        /// Mix to list tracks for.
        #[arg(long)]
        mix: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Outputs completion script for the specified shell.
    /// Follow shell-specific instructions to install.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: ShellType,
    },
}

/// Supported shells for completions.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

/// Authentication subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Log in to TIDAL using OAuth.
    Login {
        /// OAuth flow to use. Defaults to PKCE when a client secret is
        /// configured, device flow otherwise.
        #[arg(short, long, value_enum)]
        flow: Option<FlowArg>,

        /// Skip opening the browser automatically.
        #[arg(long)]
        no_browser: bool,
    },

    /// Log out and remove the stored session.
    Logout,

    /// Show current authentication status.
    Status,

    /// Refresh the access token now.
    Refresh,
}

/// Flow argument for CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlowArg {
    Device,
    Pkce,
}

impl From<FlowArg> for LoginFlow {
    fn from(arg: FlowArg) -> Self {
        match arg {
            FlowArg::Device => Self::Device,
            FlowArg::Pkce => Self::Pkce,
        }
    }
}

/// Album filter argument for CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlbumFilterArg {
    Albums,
    EpSingles,
    Other,
}

impl From<AlbumFilterArg> for AlbumFilter {
    fn from(arg: AlbumFilterArg) -> Self {
        match arg {
            AlbumFilterArg::Albums => Self::Albums,
            AlbumFilterArg::EpSingles => Self::EpsAndSingles,
            AlbumFilterArg::Other => Self::Other,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_login_flow_override() {
        let cli = Cli::try_parse_from(["tidal-bridge", "auth", "login", "--flow", "pkce"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth {
                command: AuthCommands::Login {
                    flow: Some(FlowArg::Pkce),
                    no_browser: false
                }
            }
        ));
    }

    #[test]
    fn parses_repeated_query_params() {
        let cli = Cli::try_parse_from([
            "tidal-bridge",
            "get",
            "/tracks/1",
            "-q",
            "countryCode=US",
            "--query",
            "limit=5",
        ])
        .unwrap();

        let Commands::Get { path, query } = cli.command else {
            panic!("expected get");
        };
        assert_eq!(path, "/tracks/1");
        assert_eq!(query[1], ("limit".to_string(), "5".to_string()));
    }

    #[test]
    fn rejects_malformed_query_param() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
    }
}
