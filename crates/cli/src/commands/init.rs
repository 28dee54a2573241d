use std::path::Path;

use agentfs_core::Layout;
use anyhow::Result;

pub fn run(path: &Path) -> Result<()> {
    let layout = Layout::new(path);
    layout.init()?;
    println!("initialized repository at {}", path.display());
    Ok(())
}
