use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use agentfs_core::{config, Layout, OverlayFilesystem, Workspace};
use anyhow::{Context, Result};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Mount `repo` at `mount_point`, either blocking in the foreground or
/// spawning a background session. Option set mirrors the teacher's
/// `mount_manager.rs::start` per-platform `MountOption` vectors.
pub fn run(repo: &Path, mount_point: &Path, foreground: bool, _debug: bool) -> Result<()> {
    if !mount_point.is_dir() {
        anyhow::bail!("mount point {} is not a directory", mount_point.display());
    }

    let layout = Layout::new(repo);
    layout.init()?;

    let active_agent = config::resolve_active_agent(None);
    let workspace = Workspace::open(layout, active_agent.clone())
        .with_context(|| format!("failed to open workspace at {}", repo.display()))?;
    let fs = OverlayFilesystem::new(workspace);

    #[cfg(target_os = "linux")]
    let options = vec![
        fuser::MountOption::FSName("agentfs".to_string()),
        fuser::MountOption::AutoUnmount,
    ];

    #[cfg(target_os = "macos")]
    let options = vec![
        fuser::MountOption::FSName("agentfs".to_string()),
        fuser::MountOption::AutoUnmount,
        fuser::MountOption::CUSTOM("volname=agentfs".to_string()),
        fuser::MountOption::CUSTOM("local".to_string()),
    ];

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    let options = vec![fuser::MountOption::FSName("agentfs".to_string())];

    tracing::info!(agent = %active_agent, mount_point = %mount_point.display(), "mounting");

    if foreground {
        fuser::mount2(fs, mount_point, &options)
            .with_context(|| format!("failed to mount at {}", mount_point.display()))?;
        return Ok(());
    }

    let session = fuser::spawn_mount2(fs, mount_point, &options)
        .with_context(|| format!("failed to mount at {}", mount_point.display()))?;

    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_sigint as libc::sighandler_t);
    }

    while !INTERRUPTED.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    drop(session);
    Ok(())
}
