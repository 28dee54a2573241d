//! Mount-scoped state: the single object owning resolver inputs, the inode
//! and handle tables, the hash index and the conflict log.
//!
//! Grounded on `JaxFs`'s struct (`jax_fs.rs`): one object groups everything
//! a mount needs instead of ambient globals, with the fuser adapter kept
//! thin in `fs.rs`.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write as IoWrite};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::attr::{Attr, Kind};
use crate::conflict::{self, ConflictLog};
use crate::error::{ErrorKind, Result};
use crate::handle::HandleTable;
use crate::hashindex::{hash_file, HashIndex};
use crate::inode::{InodeTable, ROOT_INODE};
use crate::layout::Layout;
use crate::merger::Merger;
use crate::path::LogicalPath;
use crate::resolver::{LayerRef, Resolved, Resolver};

pub struct DirEntry {
    pub inode: u64,
    pub kind: Kind,
    pub name: String,
}

pub struct Workspace {
    layout: Layout,
    agent_order: Vec<String>,
    active_agent: String,
    inodes: InodeTable,
    handles: HandleTable,
    hash_index: HashIndex,
    conflict_log: ConflictLog,
}

impl Workspace {
    pub fn open(layout: Layout, active_agent: String) -> Result<Self> {
        let mut agent_order = layout.read_agents()?;
        if !agent_order.iter().any(|a| a == &active_agent) {
            // Not yet in agents.json. The layer is still resolvable and
            // mergeable for this mount; the manifest and directory are
            // only written lazily, the first time something is actually
            // materialized into it (see `ensure_active_agent_dir`).
            agent_order.push(active_agent.clone());
        }
        Ok(Workspace {
            layout,
            agent_order,
            active_agent,
            inodes: InodeTable::new(),
            handles: HandleTable::new(),
            hash_index: HashIndex::new(),
            conflict_log: ConflictLog::new(),
        })
    }

    pub fn active_agent(&self) -> &str {
        &self.active_agent
    }

    pub fn conflict_log(&self) -> &ConflictLog {
        &self.conflict_log
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.layout, &self.agent_order)
    }

    fn merger(&self) -> Merger<'_> {
        Merger::new(&self.layout, &self.agent_order)
    }

    fn path_of(&self, inode: u64) -> Result<LogicalPath> {
        self.inodes.get_path(inode).cloned().ok_or(ErrorKind::NotFound)
    }

    fn attr_for(&self, path: &LogicalPath) -> Result<(Attr, Resolved)> {
        let resolved = self.resolver().resolve(path).ok_or(ErrorKind::NotFound)?;
        let meta = fs::symlink_metadata(&resolved.physical)?;
        Ok((Attr::from_metadata(&meta), resolved))
    }

    // -- lookup / getattr -------------------------------------------------

    pub fn lookup(&mut self, parent: u64, name: &str) -> Result<(u64, Attr)> {
        let parent_path = self.path_of(parent)?;
        let child_path = parent_path.join(name);
        let (attr, _) = self.attr_for(&child_path)?;
        let inode = self.inodes.get_or_create(&child_path);
        Ok((inode, attr))
    }

    pub fn getattr(&self, inode: u64) -> Result<Attr> {
        let path = self.path_of(inode)?;
        let (attr, _) = self.attr_for(&path)?;
        Ok(attr)
    }

    // -- readdir ------------------------------------------------------------

    pub fn readdir(&mut self, inode: u64) -> Result<Vec<DirEntry>> {
        let path = self.path_of(inode)?;
        let names = self.merger().enumerate(&path);

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let child_path = path.join(&name);
            let Ok((attr, _)) = self.attr_for(&child_path) else {
                continue;
            };
            let child_inode = self.inodes.get_or_create(&child_path);
            entries.push(DirEntry {
                inode: child_inode,
                kind: attr.kind,
                name,
            });
        }
        Ok(entries)
    }

    // -- copy-up ------------------------------------------------------------

    /// Register the active agent in `agents.json` and create its layer
    /// directory, if this hasn't happened yet. Called at the point something
    /// is actually about to be materialized into the active layer, never
    /// eagerly on mount.
    fn ensure_active_agent_dir(&self) -> Result<()> {
        self.layout.add_agent(&self.active_agent)
    }

    /// Ensure `path` exists in the active agent's layer, copying content from
    /// the currently resolved physical path if needed. Returns the physical
    /// path in the active layer.
    fn copy_up(&self, path: &LogicalPath) -> Result<std::path::PathBuf> {
        let target = self.resolver().physical_in(path, &self.active_agent);
        if fs::symlink_metadata(&target).is_ok() {
            return Ok(target);
        }

        self.ensure_active_agent_dir()?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.resolver().resolve(path) {
            Some(resolved) if resolved.layer != LayerRef::Agent(self.active_agent.clone()) => {
                let mut src = File::open(&resolved.physical)?;
                let mut buf = Vec::new();
                src.read_to_end(&mut buf)?;

                let dir = target.parent().unwrap_or(&target);
                let mut tmp = NamedTempFile::new_in(dir)?;
                tmp.write_all(&buf)?;
                tmp.persist(&target).map_err(|e| ErrorKind::Io(e.error))?;
            }
            _ => {
                // Nothing to copy from; the caller (create) will populate it.
            }
        }

        Ok(target)
    }

    // -- truncate (setattr size) -----------------------------------------

    /// Resize the active agent's copy of `inode`'s file to `size`, copying
    /// up first if the file is not yet in the active layer.
    pub fn truncate(&mut self, inode: u64, size: u64) -> Result<()> {
        let path = self.path_of(inode)?;
        let physical = self.copy_up(&path)?;
        let file = OpenOptions::new().write(true).open(&physical)?;
        file.set_len(size)?;
        self.hash_index.record(path, hash_file(&physical), self.active_agent.clone());
        Ok(())
    }

    // -- open / read / write --------------------------------------------

    pub fn open_handle(&mut self, inode: u64, writable: bool) -> Result<u64> {
        let path = self.path_of(inode)?;
        let resolved = self.resolver().resolve(&path).ok_or(ErrorKind::NotFound)?;

        let physical = if writable {
            self.copy_up(&path)?
        } else {
            resolved.physical
        };

        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&physical)?;
        Ok(self.handles.insert(path, file, writable))
    }

    pub fn read(&mut self, handle: u64, offset: i64, size: u32) -> Result<Vec<u8>> {
        let entry = self.handles.get_mut(handle).ok_or(ErrorKind::BadHandle)?;
        entry.file.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = vec![0u8; size as usize];
        let n = entry.file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn write(&mut self, handle: u64, offset: i64, data: &[u8]) -> Result<u32> {
        let path = {
            let entry = self.handles.get(handle).ok_or(ErrorKind::BadHandle)?;
            if !entry.writable {
                return Err(ErrorKind::InvalidArgument);
            }
            entry.path.clone()
        };

        let resolved = self.resolver().resolve(&path);
        if conflict::detect(&self.hash_index, &path, resolved.as_ref()) {
            self.conflict_log.append(&path, &self.active_agent, Utc::now());
            let _ = self.conflict_log.persist(&self.layout.conflicts_path());
            return Err(ErrorKind::ResourceBusy);
        }

        // Rebind to the active layer's copy if the handle's backing file is
        // not already there (it was opened read-only, then written to).
        let needs_rebind = !matches!(resolved, Some(ref r) if r.layer == LayerRef::Agent(self.active_agent.clone()));
        if needs_rebind {
            let physical = self.copy_up(&path)?;
            let file = OpenOptions::new().read(true).write(true).open(&physical)?;
            self.handles.rebind(handle, file);
        }

        let entry = self.handles.get_mut(handle).ok_or(ErrorKind::BadHandle)?;
        entry.file.seek(SeekFrom::Start(offset as u64))?;
        entry.file.write_all(data)?;

        let physical = self.resolver().physical_in(&path, &self.active_agent);
        let new_hash = hash_file(&physical);
        self.hash_index.record(path, new_hash, self.active_agent.clone());

        Ok(data.len() as u32)
    }

    pub fn flush(&mut self, handle: u64) -> Result<()> {
        let entry = self.handles.get_mut(handle).ok_or(ErrorKind::BadHandle)?;
        entry.file.sync_all()?;
        Ok(())
    }

    pub fn release(&mut self, handle: u64) -> Result<()> {
        self.handles.remove(handle);
        Ok(())
    }

    // -- create / unlink / rename / mkdir / rmdir ------------------------

    pub fn create(&mut self, parent: u64, name: &str) -> Result<(u64, u64, Attr)> {
        let parent_path = self.path_of(parent)?;
        let path = parent_path.join(name);
        let physical = self.copy_up(&path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&physical)?;

        let inode = self.inodes.get_or_create(&path);
        self.hash_index.record(path.clone(), hash_file(&physical), self.active_agent.clone());
        let handle = self.handles.insert(path.clone(), file, true);

        let meta = fs::symlink_metadata(&physical)?;
        let attr = Attr::from_metadata(&meta);
        Ok((inode, handle, attr))
    }

    /// Unlinking a path that only exists in a lower layer is a no-op
    /// success, not an error: no whiteouts are recorded, so there is
    /// nothing to mark in the active layer and the lower copy stays visible.
    pub fn unlink(&mut self, parent: u64, name: &str) -> Result<()> {
        let parent_path = self.path_of(parent)?;
        let path = parent_path.join(name);
        self.resolver().resolve(&path).ok_or(ErrorKind::NotFound)?;

        let physical = self.resolver().physical_in(&path, &self.active_agent);
        if fs::symlink_metadata(&physical).is_ok() {
            fs::remove_file(&physical)?;
        }

        self.hash_index.remove(&path);
        if self.resolver().resolve(&path).is_none() {
            self.inodes.remove(&path);
        }
        Ok(())
    }

    /// Same no-whiteout discipline as `unlink`: removing a directory that
    /// only exists in a lower layer succeeds without touching anything.
    pub fn rmdir(&mut self, parent: u64, name: &str) -> Result<()> {
        let parent_path = self.path_of(parent)?;
        let path = parent_path.join(name);
        self.resolver().resolve(&path).ok_or(ErrorKind::NotFound)?;

        let physical = self.resolver().physical_in(&path, &self.active_agent);
        if fs::symlink_metadata(&physical).is_ok() {
            fs::remove_dir(&physical)?;
        }

        if self.resolver().resolve(&path).is_none() {
            self.inodes.remove(&path);
        }
        Ok(())
    }

    pub fn mkdir(&mut self, parent: u64, name: &str) -> Result<(u64, Attr)> {
        let parent_path = self.path_of(parent)?;
        let path = parent_path.join(name);
        self.ensure_active_agent_dir()?;
        let physical = self.resolver().physical_in(&path, &self.active_agent);
        fs::create_dir_all(&physical)?;

        let inode = self.inodes.get_or_create(&path);
        let meta = fs::symlink_metadata(&physical)?;
        Ok((inode, Attr::from_metadata(&meta)))
    }

    pub fn symlink(&mut self, parent: u64, name: &str, target: &str) -> Result<(u64, Attr)> {
        let parent_path = self.path_of(parent)?;
        let path = parent_path.join(name);
        self.ensure_active_agent_dir()?;
        let physical = self.resolver().physical_in(&path, &self.active_agent);
        if let Some(dir) = physical.parent() {
            fs::create_dir_all(dir)?;
        }
        std::os::unix::fs::symlink(target, &physical)?;

        let inode = self.inodes.get_or_create(&path);
        let meta = fs::symlink_metadata(&physical)?;
        Ok((inode, Attr::from_metadata(&meta)))
    }

    pub fn readlink(&self, inode: u64) -> Result<String> {
        let path = self.path_of(inode)?;
        let resolved = self.resolver().resolve(&path).ok_or(ErrorKind::NotFound)?;
        let meta = fs::symlink_metadata(&resolved.physical)?;
        if !meta.file_type().is_symlink() {
            return Err(ErrorKind::InvalidArgument);
        }
        let target = fs::read_link(&resolved.physical)?;
        Ok(target.to_string_lossy().into_owned())
    }

    pub fn rename(
        &mut self,
        old_parent: u64,
        old_name: &str,
        new_parent: u64,
        new_name: &str,
    ) -> Result<()> {
        let old_parent_path = self.path_of(old_parent)?;
        let new_parent_path = self.path_of(new_parent)?;
        let old_path = old_parent_path.join(old_name);
        let new_path = new_parent_path.join(new_name);

        let resolved = self.resolver().resolve(&old_path);
        if conflict::detect(&self.hash_index, &old_path, resolved.as_ref()) {
            self.conflict_log.append(&old_path, &self.active_agent, Utc::now());
            let _ = self.conflict_log.persist(&self.layout.conflicts_path());
            return Err(ErrorKind::ResourceBusy);
        }

        match resolved {
            Some(ref r) if r.layer == LayerRef::Agent(self.active_agent.clone()) => {}
            _ => return Err(ErrorKind::CrossDevice),
        }

        let old_physical = self.resolver().physical_in(&old_path, &self.active_agent);
        let new_physical = self.resolver().physical_in(&new_path, &self.active_agent);
        if let Some(dir) = new_physical.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::rename(&old_physical, &new_physical)?;

        self.inodes.rename(&old_path, &new_path);
        self.hash_index.rename(&old_path, &new_path);
        Ok(())
    }

    pub fn statfs(&self) -> Result<libc::statvfs> {
        let root = self.layout.repo_path();
        let c_path = std::ffi::CString::new(root.to_string_lossy().as_bytes())
            .map_err(|_| ErrorKind::InvalidArgument)?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(ErrorKind::Io(std::io::Error::last_os_error()));
        }
        Ok(stat)
    }

    pub fn root_inode(&self) -> u64 {
        ROOT_INODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, Workspace) {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.init().unwrap();
        let ws = Workspace::open(layout, "agent1".to_string()).unwrap();
        (dir, ws)
    }

    #[test]
    fn create_then_read_returns_written_bytes() {
        let (_dir, mut ws) = setup();
        let root = ws.root_inode();
        let (_inode, handle, _attr) = ws.create(root, "f.txt").unwrap();
        ws.write(handle, 0, b"hello").unwrap();
        ws.flush(handle).unwrap();
        let data = ws.read(handle, 0, 5).unwrap();
        assert_eq!(data, b"hello");
        ws.release(handle).unwrap();
    }

    #[test]
    fn open_does_not_register_agent_until_first_write() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.init().unwrap();
        let mut ws = Workspace::open(layout, "agent1".to_string()).unwrap();

        assert!(!dir.path().join("agents/agent1").exists());
        let layout_check = Layout::new(dir.path());
        assert!(layout_check.read_agents().unwrap().is_empty());

        let root = ws.root_inode();
        let (_inode, handle, _attr) = ws.create(root, "f.txt").unwrap();
        ws.release(handle).unwrap();

        assert!(dir.path().join("agents/agent1").exists());
        assert_eq!(layout_check.read_agents().unwrap(), vec!["agent1".to_string()]);
    }

    #[test]
    fn unlink_of_base_only_path_is_noop_success() {
        let (dir, mut ws) = setup();
        stdfs::write(dir.path().join("base/f.txt"), "base content").unwrap();
        let root = ws.root_inode();

        ws.unlink(root, "f.txt").unwrap();

        // Not registered: nothing was ever materialized into the active layer.
        assert!(!dir.path().join("agents/agent1/f.txt").exists());
        let (_inode, attr) = ws.lookup(root, "f.txt").unwrap();
        assert_eq!(attr.size, "base content".len() as u64);
    }

    #[test]
    fn rmdir_of_base_only_dir_is_noop_success() {
        let (dir, mut ws) = setup();
        stdfs::create_dir_all(dir.path().join("base/sub")).unwrap();
        let root = ws.root_inode();

        ws.rmdir(root, "sub").unwrap();

        assert!(!dir.path().join("agents/agent1/sub").exists());
        let (_inode, attr) = ws.lookup(root, "sub").unwrap();
        assert!(matches!(attr.kind, Kind::Directory));
    }

    #[test]
    fn unlink_of_missing_path_is_not_found() {
        let (_dir, mut ws) = setup();
        let root = ws.root_inode();
        let err = ws.unlink(root, "missing.txt").unwrap_err();
        assert!(matches!(err, ErrorKind::NotFound));
    }

    #[test]
    fn unlink_removes_from_active_layer_only() {
        let (dir, mut ws) = setup();
        stdfs::write(dir.path().join("base/shared.txt"), "base content").unwrap();

        let root = ws.root_inode();
        // lookup populates the inode table for "/shared.txt"
        let (inode, _attr) = ws.lookup(root, "shared.txt").unwrap();
        // Writing through the agent layer copies it up then it can be unlinked.
        let handle = ws.open_handle(inode, true).unwrap();
        ws.write(handle, 0, b"agent content").unwrap();
        ws.release(handle).unwrap();

        ws.unlink(root, "shared.txt").unwrap();
        // Base copy remains, so the merged view still resolves it.
        let (_inode2, attr) = ws.lookup(root, "shared.txt").unwrap();
        assert_eq!(attr.size, "base content".len() as u64);
    }

    #[test]
    fn write_conflict_is_detected_and_logged() {
        let (dir, mut ws) = setup();
        let root = ws.root_inode();
        let (_inode, handle, _attr) = ws.create(root, "f.txt").unwrap();
        ws.write(handle, 0, b"v1").unwrap();
        ws.release(handle).unwrap();

        // Simulate an external mutation to the agent's own file after the
        // fact (e.g. another process writing underneath this agent).
        stdfs::write(dir.path().join("agents/agent1/f.txt"), "external").unwrap();

        let (inode, _attr) = ws.lookup(root, "f.txt").unwrap();
        let handle2 = ws.open_handle(inode, true).unwrap();
        let err = ws.write(handle2, 0, b"v2").unwrap_err();
        assert!(matches!(err, ErrorKind::ResourceBusy));
        assert_eq!(ws.conflict_log().records().len(), 1);
    }

    #[test]
    fn rename_within_active_layer_preserves_inode() {
        let (_dir, mut ws) = setup();
        let root = ws.root_inode();
        let (inode, handle, _attr) = ws.create(root, "a.txt").unwrap();
        ws.release(handle).unwrap();

        ws.rename(root, "a.txt", root, "b.txt").unwrap();
        let (inode2, _attr) = ws.lookup(root, "b.txt").unwrap();
        assert_eq!(inode, inode2);
    }

    #[test]
    fn rename_of_base_only_path_fails_cross_device() {
        let (dir, mut ws) = setup();
        stdfs::write(dir.path().join("base/f.txt"), "base").unwrap();
        let root = ws.root_inode();

        let err = ws.rename(root, "f.txt", root, "g.txt").unwrap_err();
        assert!(matches!(err, ErrorKind::CrossDevice));
    }

    #[test]
    fn mkdir_and_readdir_merge_entries() {
        let (dir, mut ws) = setup();
        stdfs::write(dir.path().join("base/base_file.txt"), "x").unwrap();
        let root = ws.root_inode();
        ws.mkdir(root, "newdir").unwrap();

        let entries = ws.readdir(root).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        assert!(names.contains(&"base_file.txt".to_string()));
        assert!(names.contains(&"newdir".to_string()));
    }

    #[test]
    fn symlink_and_readlink_roundtrip() {
        let (_dir, mut ws) = setup();
        let root = ws.root_inode();
        let (inode, _attr) = ws.symlink(root, "link", "/base/target").unwrap();
        assert_eq!(ws.readlink(inode).unwrap(), "/base/target");
    }

    #[test]
    fn truncate_copies_up_and_resizes() {
        let (dir, mut ws) = setup();
        stdfs::write(dir.path().join("base/f.txt"), "0123456789").unwrap();
        let root = ws.root_inode();
        let (inode, _attr) = ws.lookup(root, "f.txt").unwrap();

        ws.truncate(inode, 4).unwrap();

        let attr = ws.getattr(inode).unwrap();
        assert_eq!(attr.size, 4);
        assert!(dir.path().join("agents/agent1/f.txt").exists());
    }

    #[test]
    fn readlink_on_regular_file_is_invalid_argument() {
        let (_dir, mut ws) = setup();
        let root = ws.root_inode();
        let (inode, handle, _attr) = ws.create(root, "f.txt").unwrap();
        ws.release(handle).unwrap();
        let err = ws.readlink(inode).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidArgument));
    }
}
