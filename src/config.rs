// ⚙️ Configuration
// Command line flags with environment fallbacks

use crate::month::Month;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("improvement-viewer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Parser)]
#[command(name = "improvement-viewer", version, about = "View monthly improvement entries and record completion")]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Where log output goes (the terminal is taken by the viewer)
    #[arg(long, env = "IMPROVEMENT_VIEWER_LOG", default_value = "improvement-viewer.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Interactive viewer unless a query command was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::View)
    }
}

/// Remote entry store connection settings
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Script web app endpoint serving the entry sheet
    #[arg(long = "url", env = "ENTRY_STORE_URL")]
    pub web_app_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "ENTRY_STORE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn new(web_app_url: impl Into<String>) -> Self {
        Self {
            web_app_url: web_app_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Builder pattern: override the timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive slideshow (default)
    View,
    /// Check that the entry store answers
    Ping,
    /// Show whether an ID has completed a month
    Status { id: String, month: Month },
    /// List every registration row recorded for an ID
    History { id: String },
    /// Print a month's entries as JSON
    Entries { month: Month },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_view() {
        let cli = Cli::parse_from(["improvement-viewer", "--url", "http://localhost/exec"]);

        assert_eq!(cli.command(), Command::View);
        assert_eq!(cli.store.web_app_url, "http://localhost/exec");
        assert_eq!(cli.store.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_status_parses_month() {
        let cli = Cli::parse_from([
            "improvement-viewer",
            "--url",
            "http://localhost/exec",
            "--timeout-secs",
            "5",
            "status",
            "12345678",
            "may",
        ]);

        assert_eq!(
            cli.command(),
            Command::Status {
                id: "12345678".to_string(),
                month: Month::May
            }
        );
        assert_eq!(cli.store.timeout_secs, 5);
    }

    #[test]
    fn test_rejects_unknown_month() {
        let result = Cli::try_parse_from([
            "improvement-viewer",
            "--url",
            "http://localhost/exec",
            "entries",
            "Smarch",
        ]);
        assert!(result.is_err());
    }
}
