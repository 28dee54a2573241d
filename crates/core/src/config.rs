//! Mount-time configuration, resolved the way the teacher's daemon config
//! resolves `log_level`/`log_dir`: explicit fields, environment fallback.

use std::path::PathBuf;

/// Name of the environment variable that selects the active agent.
pub const AGENT_ID_ENV: &str = "AGENT_ID";
pub const DEFAULT_AGENT: &str = "default";

#[derive(Debug, Clone)]
pub struct MountConfig {
    pub repo_path: PathBuf,
    pub mount_point: PathBuf,
    pub active_agent: String,
    pub foreground: bool,
    pub debug: bool,
}

impl MountConfig {
    pub fn new(repo_path: PathBuf, mount_point: PathBuf) -> Self {
        MountConfig {
            repo_path,
            mount_point,
            active_agent: resolve_active_agent(None),
            foreground: false,
            debug: false,
        }
    }

    pub fn with_agent(mut self, agent: Option<String>) -> Self {
        self.active_agent = resolve_active_agent(agent);
        self
    }
}

/// `AGENT_ID` env takes precedence only when no explicit agent is given;
/// falls back to `"default"` when neither is set.
pub fn resolve_active_agent(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var(AGENT_ID_ENV).ok())
        .unwrap_or_else(|| DEFAULT_AGENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_agent_wins_over_default() {
        assert_eq!(resolve_active_agent(Some("alice".to_string())), "alice");
    }

    #[test]
    fn no_explicit_agent_falls_back_to_default() {
        std::env::remove_var(AGENT_ID_ENV);
        assert_eq!(resolve_active_agent(None), DEFAULT_AGENT);
    }
}
