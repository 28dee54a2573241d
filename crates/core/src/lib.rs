//! Layered overlay filesystem kernel.
//!
//! Composes a shared read-only `base` tree with an ordered stack of
//! per-agent writable layers, exposing a merged view through a `fuser`
//! mount. This crate is a library: mounting, CLI lifecycle and environment
//! wiring live in `agentfs-cli`.

pub mod attr;
pub mod conflict;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod hashindex;
pub mod inode;
pub mod layout;
pub mod merger;
pub mod path;
pub mod resolver;
pub mod state;

pub use config::MountConfig;
pub use error::{ErrorKind, Result};
pub use fs::OverlayFilesystem;
pub use layout::Layout;
pub use state::Workspace;
