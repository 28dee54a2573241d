//! Single enumerated error kind, mapped to POSIX errno at the VFS boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("no such logical path")]
    NotFound,

    #[error("file handle is unknown or already released")]
    BadHandle,

    #[error("concurrent modification detected")]
    ResourceBusy,

    #[error("rename would cross the agent-layer boundary")]
    CrossDevice,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("i/o error: {0}")]
    Io(#[source] std::io::Error),

    #[error("operation not supported")]
    NotSupported,
}

impl ErrorKind {
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            ErrorKind::NotFound => libc::ENOENT,
            ErrorKind::BadHandle => libc::EBADF,
            ErrorKind::ResourceBusy => libc::EBUSY,
            ErrorKind::CrossDevice => libc::EXDEV,
            ErrorKind::InvalidArgument => libc::EINVAL,
            ErrorKind::Io(_) => libc::EIO,
            ErrorKind::NotSupported => libc::ENOTSUP,
        }
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
            _ => ErrorKind::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
