use std::path::Path;

use agentfs_core::conflict::ConflictLog;
use agentfs_core::Layout;
use anyhow::Result;

pub fn run(repo: &Path) -> Result<()> {
    let layout = Layout::new(repo);
    let records = ConflictLog::load(&layout.conflicts_path())?;

    if records.is_empty() {
        println!("no conflicts recorded");
        return Ok(());
    }

    for record in &records {
        println!("{} {} {}", record.timestamp.to_rfc3339(), record.agent, record.path);
    }
    Ok(())
}
