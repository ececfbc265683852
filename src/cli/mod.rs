//! CLI definitions using clap.

use crate::config::{load_config, Overrides, Settings};
use crate::error::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod backend;
pub mod commands;

/// Parish CMS - REST backend and admin tooling for a parish website
#[derive(Parser, Debug)]
#[command(name = "parish", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.parish/data/parish.db)
    #[arg(long, global = true, env = "PARISH_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "PARISH_ACTOR")]
    pub actor: Option<String>,

    /// Locale for day and month names (en_US, pl_PL, ...)
    #[arg(long, global = true, env = "PARISH_LOCALE")]
    pub locale: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Resolve settings from global flags, `extra` command flags and the
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the config file is unreadable or a value
    /// cannot be parsed.
    pub fn settings(&self, extra: Overrides) -> Result<Settings> {
        let overrides = Overrides {
            db_path: self.db.clone(),
            locale: self.locale.clone(),
            ..extra
        };
        Settings::resolve(&overrides, &load_config()?)
    }

    /// Actor recorded in the audit trail for writes made by this process.
    #[must_use]
    pub fn actor(&self) -> String {
        self.actor
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map_or_else(crate::config::default_actor, ToString::to_string)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST API server
    Serve(ServeArgs),

    /// Open the database and run pending upgrade steps
    Migrate,

    /// Monthly Mass intentions
    Intentions {
        #[command(subcommand)]
        command: IntentionsCommands,
    },

    /// Contact form messages
    Messages {
        #[command(subcommand)]
        command: MessagesCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on (default: 127.0.0.1:3000)
    #[arg(long, env = "PARISH_BIND")]
    pub bind: Option<String>,

    /// Bearer token required by admin routes
    #[arg(long, env = "PARISH_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Allowed CORS origin for the admin panel
    #[arg(long, env = "PARISH_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl ServeArgs {
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            bind: self.bind.clone(),
            admin_token: self.admin_token.clone(),
            cors_origin: self.cors_origin.clone(),
            ..Overrides::default()
        }
    }
}

/// How admin commands reach the data.
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the parish API (default: http://127.0.0.1:3000)
    #[arg(long, env = "PARISH_API_URL")]
    pub api_url: Option<String>,

    /// Admin bearer token
    #[arg(long, env = "PARISH_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Work on the local database instead of a running server
    #[arg(long, conflicts_with = "api_url")]
    pub local: bool,
}

impl ClientArgs {
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            admin_token: self.admin_token.clone(),
            ..Overrides::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum IntentionsCommands {
    /// List the months of a year with their intention counts
    List {
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Show the intentions of one month
    Show {
        /// Year
        year: i32,

        /// Month (1-12)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Interactive month editor
    Edit {
        /// Year to open (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Open this month directly (1-12)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,

        #[command(flatten)]
        client: ClientArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MessagesCommands {
    /// Print the number of unread messages
    Unread {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Keep printing the unread count until interrupted
    Watch {
        /// Poll interval in seconds (default: poll_interval_secs from config, or 30)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        #[command(flatten)]
        client: ClientArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_edit_with_month() {
        let cli = Cli::try_parse_from([
            "parish", "intentions", "edit", "--year", "2026", "--month", "2", "--local",
        ])
        .unwrap();
        match cli.command {
            Commands::Intentions {
                command: IntentionsCommands::Edit { year, month, client },
            } => {
                assert_eq!(year, Some(2026));
                assert_eq!(month, Some(2));
                assert!(client.local);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["parish", "intentions", "show", "2026", "13"]).is_err());
    }

    #[test]
    fn test_actor_flag_wins() {
        let cli = Cli::try_parse_from(["parish", "--actor", "  verger ", "version"]).unwrap();
        assert_eq!(cli.actor(), "verger");
    }
}
