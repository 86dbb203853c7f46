//! Command-line surface via `clap`.

use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfigOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "jira-harvest",
    version,
    about = "Scrape Jira projects into a resumable JSONL dataset",
    after_help = "Examples:\n  jira-harvest --projects SPARK HADOOP ZOOKEEPER --output data/issues.jsonl\n  jira-harvest --projects SPARK --output out.jsonl --checkpoint state/ckpt.json --max-issues 50"
)]
pub struct Cli {
    /// One or more Jira project keys to scrape (e.g. SPARK HADOOP)
    #[arg(long, num_args = 1.., required = true)]
    pub projects: Vec<String>,
    /// Output JSONL file; existing content is appended to, never replaced
    #[arg(long)]
    pub output: PathBuf,
    /// Checkpoint JSON file enabling resumption across runs
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// Maximum number of issues to forward across all projects
    #[arg(long)]
    pub max_issues: Option<usize>,
    /// TOML config file (default: $XDG_CONFIG_HOME/jira-harvest/config.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Jira REST API base URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Retries per request before giving up
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Base of the exponential backoff, in seconds
    #[arg(long)]
    pub backoff_factor: Option<f64>,
    /// Enable debug logging
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub debug: bool,
}

impl Cli {
    pub fn overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            base_url: self.base_url.clone(),
            max_retries: self.max_retries,
            backoff_factor: self.backoff_factor,
            logging_debug: self.debug.then_some(true),
        }
    }
}
