//! Divergence detection and the append-only conflict log.
//!
//! Shape borrowed from `crates/common/src/mount/conflict.rs`'s struct split,
//! simplified to this system's stored-hash-vs-current-hash rule (no CRDT
//! resolution policies — the core only detects and records, never merges).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hashindex::{hash_file, HashIndex};
use crate::path::LogicalPath;
use crate::resolver::Resolved;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub path: String,
    pub agent: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of detected conflicts for this mount.
#[derive(Debug, Default)]
pub struct ConflictLog {
    records: Vec<ConflictRecord>,
}

impl ConflictLog {
    pub fn new() -> Self {
        ConflictLog::default()
    }

    pub fn append(&mut self, path: &LogicalPath, agent: &str, now: DateTime<Utc>) {
        self.records.push(ConflictRecord {
            path: path.as_str().to_string(),
            agent: agent.to_string(),
            timestamp: now,
        });
    }

    pub fn records(&self) -> &[ConflictRecord] {
        &self.records
    }

    /// Overwrite `conflicts.json` with the current in-memory log. Called
    /// after each append so an external `conflicts` CLI invocation can read
    /// state from a separate process.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.records)
            .map_err(|e| crate::error::ErrorKind::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load a previously persisted log, e.g. for the `conflicts` CLI command.
    /// Missing file yields an empty list.
    pub fn load(path: &Path) -> Result<Vec<ConflictRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| crate::error::ErrorKind::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}

/// Returns true iff the active agent previously recorded a hash for `path`
/// and the currently resolved content differs from it. Fails open: if either
/// hash is unavailable, no conflict is reported.
pub fn detect(index: &HashIndex, path: &LogicalPath, resolved: Option<&Resolved>) -> bool {
    let Some(entry) = index.get(path) else {
        return false;
    };
    let Some(stored) = entry.hash else {
        return false;
    };
    let Some(resolved) = resolved else {
        return false;
    };
    let Some(current) = hash_file(&resolved.physical) else {
        return false;
    };
    stored != current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LayerRef;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn no_conflict_when_never_written() {
        let index = HashIndex::new();
        let path = LogicalPath::new("/a");
        assert!(!detect(&index, &path, None));
    }

    #[test]
    fn conflict_when_stored_hash_diverges_from_current() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"changed").unwrap();

        let mut index = HashIndex::new();
        let path = LogicalPath::new("/a");
        index.record(path.clone(), Some([0u8; 32]), "me".to_string());

        let resolved = Resolved {
            physical: f.path().to_path_buf(),
            layer: LayerRef::Base,
        };
        assert!(detect(&index, &path, Some(&resolved)));
    }

    #[test]
    fn no_conflict_when_content_unchanged() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"same").unwrap();
        let hash = crate::hashindex::hash_file(f.path());

        let mut index = HashIndex::new();
        let path = LogicalPath::new("/a");
        index.record(path.clone(), hash, "me".to_string());

        let resolved = Resolved {
            physical: f.path().to_path_buf(),
            layer: LayerRef::Base,
        };
        assert!(!detect(&index, &path, Some(&resolved)));
    }

    #[test]
    fn append_records_in_order() {
        let mut log = ConflictLog::new();
        let now = Utc::now();
        log.append(&LogicalPath::new("/a"), "agent1", now);
        log.append(&LogicalPath::new("/b"), "agent2", now);
        assert_eq!(log.records().len(), 2);
        assert_eq!(log.records()[0].path, "/a");
        assert_eq!(log.records()[1].agent, "agent2");
    }
}
