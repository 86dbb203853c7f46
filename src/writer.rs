use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::checkpoint::CheckpointSet;
use crate::jira::JiraError;
use crate::logging;
use crate::metrics::Metrics;
use crate::transform::OutputRecord;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode record {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Fetch(#[from] JiraError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    AlreadyProcessed,
}

/// Append-only JSONL sink that records each written key in a checkpoint.
#[derive(Debug)]
pub struct CheckpointedWriter {
    output: File,
    output_path: PathBuf,
    checkpoint: CheckpointSet,
    metrics: Arc<Metrics>,
}

impl CheckpointedWriter {
    pub fn open(
        output_path: &Path,
        checkpoint_path: Option<&Path>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, WriteError> {
        let checkpoint = match checkpoint_path {
            Some(path) => CheckpointSet::load(path),
            None => CheckpointSet::ephemeral(),
        };
        let output = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_path)
            .map_err(|source| WriteError::Io {
                path: output_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            output,
            output_path: output_path.to_path_buf(),
            checkpoint,
            metrics,
        })
    }

    pub fn checkpoint(&self) -> &CheckpointSet {
        &self.checkpoint
    }

    /// Appends `record` unless its key is already checkpointed. The output line
    /// is written before the checkpoint is persisted.
    pub fn write(&mut self, record: &OutputRecord) -> Result<WriteOutcome, WriteError> {
        let key = record.issue_key.as_str();
        if self.checkpoint.is_processed(key) {
            self.metrics.inc_record_skipped();
            logging::debug(format!("skipping already processed issue {}", key));
            return Ok(WriteOutcome::AlreadyProcessed);
        }

        let mut line = serde_json::to_vec(record).map_err(|source| WriteError::Encode {
            key: key.to_string(),
            source,
        })?;
        line.push(b'\n');
        self.output
            .write_all(&line)
            .map_err(|source| WriteError::Io {
                path: self.output_path.clone(),
                source,
            })?;
        self.metrics.inc_record_written();

        self.checkpoint.mark(key);
        if let Err(err) = self.checkpoint.persist() {
            self.metrics.inc_checkpoint_failure();
            let path = self
                .checkpoint
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            logging::warn(format!(
                "failed to write checkpoint file {}: {}",
                path, err
            ));
        }

        Ok(WriteOutcome::Written)
    }
}

/// Drains `records` into `output_path`, stopping at the first upstream error.
pub fn write_all<I>(
    records: I,
    output_path: &Path,
    checkpoint_path: Option<&Path>,
    metrics: Arc<Metrics>,
) -> Result<WriteSummary, WriteError>
where
    I: IntoIterator<Item = Result<OutputRecord, JiraError>>,
{
    let mut writer = CheckpointedWriter::open(output_path, checkpoint_path, metrics)?;
    let mut summary = WriteSummary::default();

    for record in records {
        match writer.write(&record?)? {
            WriteOutcome::Written => summary.written += 1,
            WriteOutcome::AlreadyProcessed => summary.skipped += 1,
        }
    }

    Ok(summary)
}
