//! `jira_harvest` scrapes Jira projects into an append-only JSONL dataset.
//! Runs are resumable through a checkpoint of already written issue keys.

/// Checkpoint of processed issue keys.
pub mod checkpoint;
/// Command-line arguments.
pub mod cli;
/// Runtime configuration loading and validation.
pub mod config;
/// Lazy per-project issue pagination.
pub mod fetch;
/// Jira API client, retry layer and raw issue models.
pub mod jira;
/// Logging helpers used throughout the crate.
pub mod logging;
/// Run counters.
pub mod metrics;
/// Project list to output file orchestration.
pub mod pipeline;
/// Raw issue to output record transformation.
pub mod transform;
/// Checkpointed JSONL writer.
pub mod writer;
