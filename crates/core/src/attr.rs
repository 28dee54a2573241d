//! Fixed attribute record shared between the pure-logic layer and `fuser::FileAttr`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{FileAttr, FileType};

pub const BLOCK_SIZE: u32 = 512;
pub const ATTR_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    File,
    Directory,
    Symlink,
}

/// Attribute record independent of `fuser` types, populated from `lstat`.
#[derive(Debug, Clone, Copy)]
pub struct Attr {
    pub kind: Kind,
    pub size: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime_ns: i64,
    pub mtime_ns: i64,
    pub ctime_ns: i64,
}

impl Attr {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let kind = if meta.is_dir() {
            Kind::Directory
        } else if meta.file_type().is_symlink() {
            Kind::Symlink
        } else {
            Kind::File
        };

        Attr {
            kind,
            size: meta.size(),
            mode: meta.mode(),
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            atime_ns: meta.atime() * 1_000_000_000 + meta.atime_nsec(),
            mtime_ns: meta.mtime() * 1_000_000_000 + meta.mtime_nsec(),
            ctime_ns: meta.ctime() * 1_000_000_000 + meta.ctime_nsec(),
        }
    }

    pub fn to_file_attr(&self, inode: u64) -> FileAttr {
        let kind = match self.kind {
            Kind::File => FileType::RegularFile,
            Kind::Directory => FileType::Directory,
            Kind::Symlink => FileType::Symlink,
        };

        let to_systime = |ns: i64| {
            if ns >= 0 {
                UNIX_EPOCH + Duration::from_nanos(ns as u64)
            } else {
                UNIX_EPOCH - Duration::from_nanos((-ns) as u64)
            }
        };

        FileAttr {
            ino: inode,
            size: self.size,
            blocks: self.size.div_ceil(BLOCK_SIZE as u64),
            atime: to_systime(self.atime_ns),
            mtime: to_systime(self.mtime_ns),
            ctime: to_systime(self.ctime_ns),
            crtime: SystemTime::UNIX_EPOCH,
            kind,
            perm: (self.mode & 0o7777) as u16,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}
