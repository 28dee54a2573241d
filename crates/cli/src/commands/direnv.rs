use std::path::Path;

use agentfs_core::config;
use anyhow::Result;

/// Print shell exports for direnv integration: the resolved `AGENT_ID`.
pub fn run(repo: &Path, agent: Option<&str>) -> Result<()> {
    let active_agent = config::resolve_active_agent(agent.map(str::to_string));
    println!("export AGENT_ID={active_agent}");
    println!("# repository: {}", repo.display());
    Ok(())
}
