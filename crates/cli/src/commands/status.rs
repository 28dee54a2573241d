use std::path::Path;

use agentfs_core::Layout;
use anyhow::Result;

pub fn run(repo: &Path) -> Result<()> {
    let layout = Layout::new(repo);
    let agents = layout.read_agents()?;

    println!("repository: {}", repo.display());
    if agents.is_empty() {
        println!("no agents registered");
    } else {
        println!("agents (bottom to top):");
        for name in &agents {
            println!("  - {name}");
        }
    }

    let conflicts = agentfs_core::conflict::ConflictLog::load(&layout.conflicts_path())?;
    println!("conflicts recorded: {}", conflicts.len());
    Ok(())
}
