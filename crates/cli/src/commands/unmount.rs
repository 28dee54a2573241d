use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Platform-specific unmount, mirroring the teacher's `unmount_path`:
/// `fusermount -u` on Linux with a lazy-unmount fallback, `umount` on macOS.
pub fn run(mount_point: &Path) -> Result<()> {
    let mount_point_str = mount_point.to_string_lossy().into_owned();

    #[cfg(target_os = "linux")]
    {
        let status = Command::new("fusermount")
            .args(["-u", &mount_point_str])
            .status()
            .context("failed to invoke fusermount")?;

        if !status.success() {
            let _ = Command::new("fusermount")
                .args(["-uz", &mount_point_str])
                .status();
        }
    }

    #[cfg(target_os = "macos")]
    {
        let status = Command::new("umount")
            .arg(&mount_point_str)
            .status()
            .context("failed to invoke umount")?;

        if !status.success() {
            let _ = Command::new("diskutil")
                .args(["unmount", "force", &mount_point_str])
                .status();
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        anyhow::bail!("unmount is not supported on this platform");
    }

    println!("unmounted {}", mount_point.display());
    Ok(())
}
