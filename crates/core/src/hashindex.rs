//! SHA-256 content hashing and the per-path hash index.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::path::LogicalPath;

pub type Hash = [u8; 32];

pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Hash the full content at `physical`. Returns `None` on any I/O error
/// (fail-open: an unreadable file yields "no conflict signal available").
pub fn hash_file(physical: &Path) -> Option<Hash> {
    let mut file = std::fs::File::open(physical).ok()?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Some(hasher.finalize().into())
}

#[derive(Debug, Clone)]
pub struct HashEntry {
    pub hash: Option<Hash>,
    pub last_writer: String,
}

/// `logical path -> {hash, owning agent}` for paths the active agent has
/// written during this mount's lifetime.
#[derive(Debug, Default)]
pub struct HashIndex {
    entries: HashMap<LogicalPath, HashEntry>,
}

impl HashIndex {
    pub fn new() -> Self {
        HashIndex::default()
    }

    pub fn get(&self, path: &LogicalPath) -> Option<&HashEntry> {
        self.entries.get(path)
    }

    pub fn record(&mut self, path: LogicalPath, hash: Option<Hash>, writer: String) {
        self.entries.insert(
            path,
            HashEntry {
                hash,
                last_writer: writer,
            },
        );
    }

    pub fn remove(&mut self, path: &LogicalPath) {
        self.entries.remove(path);
    }

    /// Move an entry from `from` to `to`, as on rename.
    pub fn rename(&mut self, from: &LogicalPath, to: &LogicalPath) {
        if let Some(entry) = self.entries.remove(from) {
            self.entries.insert(to.clone(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hash_is_deterministic_across_paths() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"hello").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"hello").unwrap();

        assert_eq!(hash_file(f1.path()), hash_file(f2.path()));
    }

    #[test]
    fn hash_differs_on_different_content() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"hello").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"world").unwrap();

        assert_ne!(hash_file(f1.path()), hash_file(f2.path()));
    }

    #[test]
    fn missing_file_hashes_to_none() {
        assert!(hash_file(Path::new("/nonexistent/definitely/not/here")).is_none());
    }

    #[test]
    fn index_record_remove_rename() {
        let mut index = HashIndex::new();
        let p = LogicalPath::new("/a");
        index.record(p.clone(), Some([1u8; 32]), "agent1".to_string());
        assert!(index.get(&p).is_some());

        let q = LogicalPath::new("/b");
        index.rename(&p, &q);
        assert!(index.get(&p).is_none());
        assert!(index.get(&q).is_some());

        index.remove(&q);
        assert!(index.get(&q).is_none());
    }
}
