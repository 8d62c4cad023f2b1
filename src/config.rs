use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TAYARID_LOG";

/// Admin sidecar for the Tayari content store.
///
/// Speaks JSON-lines on stdin/stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "tayarid")]
#[command(author, version, about = "Admin sidecar for school content, question sets and locations")]
pub struct Cli {
    /// Workspace directory to open at startup
    #[arg(long, value_name = "PATH", env = "TAYARID_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// `TAYARID_LOG` wins over `-v` when set.
    pub fn log_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return filter;
        }
        match self.verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    }
}
