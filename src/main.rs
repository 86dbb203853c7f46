use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use jira_harvest::cli::Cli;
use jira_harvest::jira::JiraClient;
use jira_harvest::metrics::{log_summary, Metrics};
use jira_harvest::{config, logging, pipeline};

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::error(format!("aborting run: {}", err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut cfg = config::load(cli.config.as_deref())?;
    cfg.apply_overrides(&cli.overrides())?;
    if cfg.logging.debug {
        logging::enable_debug();
    }

    ensure_parent_dir(&cli.output)?;
    if let Some(checkpoint) = &cli.checkpoint {
        ensure_parent_dir(checkpoint)?;
    }

    let metrics = Arc::new(Metrics::new());
    let jira = JiraClient::from_config(&cfg, Arc::clone(&metrics))?;
    logging::info(format!(
        "starting jira-harvest projects={} base_url={} output={} checkpoint={} max_issues={}",
        cli.projects.join(","),
        jira.base_url,
        cli.output.display(),
        cli.checkpoint
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string()),
        cli.max_issues
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    ));

    let result = pipeline::run(
        &jira,
        &cli.projects,
        &cli.output,
        cli.checkpoint.as_deref(),
        cli.max_issues,
    );
    log_summary(&metrics);

    let summary = result?;
    logging::info(format!(
        "finished: {} written, {} already processed",
        summary.written, summary.skipped
    ));
    Ok(())
}
