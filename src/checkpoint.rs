use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::logging;

/// Issue keys already written to the output file, persisted as a JSON object
/// mapping each key to `true`.
#[derive(Debug, Default)]
pub struct CheckpointSet {
    path: Option<PathBuf>,
    processed: BTreeMap<String, bool>,
}

impl CheckpointSet {
    /// In-memory only; nothing is ever persisted.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists. An unreadable or malformed file is logged and
    /// treated as an empty checkpoint.
    pub fn load(path: &Path) -> Self {
        let processed = if path.exists() {
            match read_checkpoint(path) {
                Ok(map) => {
                    logging::info(format!(
                        "loaded checkpoint {} with {} issues",
                        path.display(),
                        map.len()
                    ));
                    map
                }
                Err(err) => {
                    logging::warn(format!(
                        "failed to read checkpoint file {}: {}",
                        path.display(),
                        err
                    ));
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Self {
            path: Some(path.to_path_buf()),
            processed,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_processed(&self, key: &str) -> bool {
        self.processed.get(key).copied().unwrap_or(false)
    }

    pub fn mark(&mut self, key: &str) {
        self.processed.insert(key.to_string(), true);
    }

    pub fn len(&self) -> usize {
        self.processed.values().filter(|done| **done).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrites the whole checkpoint file. The new content is synced to a
    /// sibling temp file first and renamed over the old one; the temp file is
    /// removed if any step fails.
    pub fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec(&self.processed)?;
        let tmp = tmp_path(path);
        let result = write_synced(&tmp, &json).and_then(|()| fs::rename(&tmp, path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn read_checkpoint(path: &Path) -> io::Result<BTreeMap<String, bool>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        let set = CheckpointSet::load(&dir.path().join("ckpt.json"));

        assert!(set.is_empty());
        assert!(!set.is_processed("A-1"));
    }

    #[test]
    fn persists_and_reloads_marked_keys() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ckpt.json");

        let mut set = CheckpointSet::load(&path);
        set.mark("A-1");
        set.mark("B-2");
        set.persist().expect("persist");

        let raw = fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, r#"{"A-1":true,"B-2":true}"#);
        assert!(!tmp_path(&path).exists());

        let reloaded = CheckpointSet::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.is_processed("A-1"));
        assert!(reloaded.is_processed("B-2"));
    }

    #[test]
    fn false_entries_are_not_processed() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ckpt.json");
        fs::write(&path, r#"{"A-1": true, "A-2": false}"#).expect("seed");

        let set = CheckpointSet::load(&path);
        assert!(set.is_processed("A-1"));
        assert!(!set.is_processed("A-2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ckpt.json");
        fs::write(&path, "{not json").expect("seed");

        let set = CheckpointSet::load(&path);
        assert!(set.is_empty());
        assert_eq!(set.path(), Some(path.as_path()));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ckpt.json");
        fs::create_dir(&path).expect("directory in the checkpoint's place");
        fs::write(path.join("occupant"), "x").expect("make directory non-empty");

        let mut set = CheckpointSet::load(&path);
        set.mark("A-1");

        assert!(set.persist().is_err());
        assert!(!tmp_path(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn ephemeral_persist_is_a_no_op() {
        let mut set = CheckpointSet::ephemeral();
        set.mark("A-1");
        set.persist().expect("no-op");
        assert!(set.is_processed("A-1"));
        assert!(set.path().is_none());
    }
}
