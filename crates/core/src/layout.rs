//! On-disk repository layout: `base/`, `agents/<name>/`, `work/`, `agents.json`.
//!
//! Grounded on `original_source/agentfs/fuse.py`'s `self.base_path`,
//! `self.agents_dir`, `self.work_path` and `self._load_agents`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

const MANIFEST_NAME: &str = "agents.json";
const CONFLICTS_NAME: &str = "conflicts.json";

#[derive(Debug, Serialize, Deserialize, Default)]
struct Manifest {
    agents: Vec<String>,
}

/// Pure path arithmetic over a repository root; holds no mutable state.
#[derive(Debug, Clone)]
pub struct Layout {
    repo_path: PathBuf,
}

impl Layout {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Layout {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn base_path(&self) -> PathBuf {
        self.repo_path.join("base")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.repo_path.join("agents")
    }

    pub fn agent_path(&self, name: &str) -> PathBuf {
        self.agents_dir().join(name)
    }

    pub fn work_path(&self) -> PathBuf {
        self.repo_path.join("work")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.repo_path.join(MANIFEST_NAME)
    }

    pub fn conflicts_path(&self) -> PathBuf {
        self.repo_path.join(CONFLICTS_NAME)
    }

    /// Create `base/`, `agents/`, `work/` and an empty manifest. Idempotent.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.base_path())?;
        fs::create_dir_all(self.agents_dir())?;
        fs::create_dir_all(self.work_path())?;
        if !self.manifest_path().exists() {
            self.write_manifest(&[])?;
        }
        Ok(())
    }

    /// Read the ordered agent list from `agents.json`. Missing file -> empty.
    pub fn read_agents(&self) -> Result<Vec<String>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(path)?;
        let manifest: Manifest =
            serde_json::from_str(&data).map_err(|_| ErrorKind::InvalidArgument)?;
        Ok(manifest.agents)
    }

    fn write_manifest(&self, agents: &[String]) -> Result<()> {
        let manifest = Manifest {
            agents: agents.to_vec(),
        };
        let data = serde_json::to_string_pretty(&manifest).map_err(|_| ErrorKind::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "manifest serialization failed"),
        ))?;
        fs::write(self.manifest_path(), data)?;
        Ok(())
    }

    /// Add `name` to the manifest (no-op if already present) and create its
    /// writable layer directory.
    pub fn add_agent(&self, name: &str) -> Result<()> {
        let mut agents = self.read_agents()?;
        if !agents.iter().any(|a| a == name) {
            agents.push(name.to_string());
        }
        fs::create_dir_all(self.agent_path(name))?;
        self.write_manifest(&agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_directory_triple_and_empty_manifest() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.init().unwrap();

        assert!(layout.base_path().is_dir());
        assert!(layout.agents_dir().is_dir());
        assert!(layout.work_path().is_dir());
        assert_eq!(layout.read_agents().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn add_agent_is_idempotent_and_ordered() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.init().unwrap();

        layout.add_agent("alice").unwrap();
        layout.add_agent("bob").unwrap();
        layout.add_agent("alice").unwrap();

        assert_eq!(layout.read_agents().unwrap(), vec!["alice", "bob"]);
        assert!(layout.agent_path("alice").is_dir());
        assert!(layout.agent_path("bob").is_dir());
    }
}
