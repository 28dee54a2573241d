//! File handle table: opaque integer -> backing fd + logical path.

use std::collections::HashMap;
use std::fs::File;

use crate::path::LogicalPath;

pub struct HandleEntry {
    pub path: LogicalPath,
    pub file: File,
    pub writable: bool,
}

#[derive(Default)]
pub struct HandleTable {
    handles: HashMap<u64, HandleEntry>,
    next_handle: u64,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn insert(&mut self, path: LogicalPath, file: File, writable: bool) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(handle, HandleEntry { path, file, writable });
        handle
    }

    pub fn get(&self, handle: u64) -> Option<&HandleEntry> {
        self.handles.get(&handle)
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut HandleEntry> {
        self.handles.get_mut(&handle)
    }

    /// Rebind an existing handle's backing file, e.g. after copy-up.
    pub fn rebind(&mut self, handle: u64, file: File) {
        if let Some(entry) = self.handles.get_mut(&handle) {
            entry.file = file;
        }
    }

    pub fn remove(&mut self, handle: u64) -> Option<HandleEntry> {
        self.handles.remove(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut table = HandleTable::new();
        let tmp = NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        let handle = table.insert(LogicalPath::new("/a"), file, true);
        assert!(table.get(handle).is_some());
        assert!(table.get(handle).unwrap().writable);
    }

    #[test]
    fn distinct_handles_increment() {
        let mut table = HandleTable::new();
        let tmp1 = NamedTempFile::new().unwrap();
        let tmp2 = NamedTempFile::new().unwrap();
        let h1 = table.insert(LogicalPath::new("/a"), tmp1.reopen().unwrap(), false);
        let h2 = table.insert(LogicalPath::new("/b"), tmp2.reopen().unwrap(), false);
        assert_ne!(h1, h2);
    }

    #[test]
    fn remove_drops_entry() {
        let mut table = HandleTable::new();
        let tmp = NamedTempFile::new().unwrap();
        let handle = table.insert(LogicalPath::new("/a"), tmp.reopen().unwrap(), false);
        assert!(table.remove(handle).is_some());
        assert!(table.get(handle).is_none());
        assert!(table.remove(handle).is_none());
    }
}
