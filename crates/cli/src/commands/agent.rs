use std::path::Path;

use agentfs_core::Layout;
use anyhow::Result;

pub fn add(repo: &Path, name: &str) -> Result<()> {
    let layout = Layout::new(repo);
    layout.add_agent(name)?;
    println!("added agent '{name}'");
    Ok(())
}
