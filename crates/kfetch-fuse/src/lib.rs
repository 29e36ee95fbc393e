//! kfetch FUSE - the channel as a file
//!
//! Mounts a directory containing a single file, the node, through which
//! clients reach the kfetch [`Channel`]:
//!
//! - `open(2)` takes the channel exclusively or fails with `EBUSY`
//! - `write(2)` of a native-endian 32-bit integer sets the mask
//! - `read(2)` returns a freshly rendered, NUL-terminated report
//! - `close(2)` frees the channel
//!
//! # Architecture
//!
//! The FUSE filesystem is an adapter in the hexagonal architecture:
//! - [`KfetchFs`] implements `fuser::Filesystem` and forwards node I/O to the
//!   channel
//! - [`NodeLayout`] answers namespace queries about the fixed two-inode tree
//!
//! # Usage
//!
//! ```ignore
//! use kfetch_fuse::mount;
//!
//! let session = mount(&config.fuse, channel)?;
//! // The node stays mounted until the session is dropped
//! ```

pub mod error;
pub mod filesystem;
pub mod node;

use std::path::{Path, PathBuf};

pub use error::FuseError;
pub use filesystem::KfetchFs;
pub use fuser::BackgroundSession;
use fuser::MountOption;
use kfetch_core::config::FuseConfig;
use kfetch_core::usecases::Channel;
pub use node::{InodeNumber, NodeLayout};
use tracing::{debug, info};

/// Expands a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Checks that `mount_point` exists, is a directory and is empty.
pub fn check_mount_point(mount_point: &Path) -> Result<(), FuseError> {
    if !mount_point.exists() {
        return Err(FuseError::NotFound(format!(
            "Mount point does not exist: {}",
            mount_point.display()
        )));
    }

    if !mount_point.is_dir() {
        return Err(FuseError::NotADirectory(format!(
            "Mount point is not a directory: {}",
            mount_point.display()
        )));
    }

    let mut entries = std::fs::read_dir(mount_point)?;
    if entries.next().is_some() {
        return Err(FuseError::NotEmpty(format!(
            "Mount point is not empty: {}",
            mount_point.display()
        )));
    }

    Ok(())
}

/// Options passed to the kernel at mount time.
pub fn mount_options(config: &FuseConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::AutoUnmount,
        MountOption::FSName("kfetch".to_string()),
        MountOption::DefaultPermissions,
        MountOption::NoAtime,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    options
}

/// Mounts the kfetch node at `config.mount_point`.
///
/// The filesystem is served from a background thread; it stays mounted as
/// long as the returned session is alive.
///
/// # Errors
///
/// - `FuseError::NotFound` if the mount point doesn't exist
/// - `FuseError::NotADirectory` if it is not a directory
/// - `FuseError::NotEmpty` if it is not empty
/// - `FuseError::IoError` if the FUSE mount itself fails
pub fn mount(config: &FuseConfig, channel: Channel) -> Result<BackgroundSession, FuseError> {
    let mount_point = expand_tilde(&config.mount_point);

    info!(
        mount_point = %mount_point.display(),
        node = %config.node_name,
        "Preparing to mount kfetch node"
    );

    check_mount_point(&mount_point)?;

    let filesystem = KfetchFs::new(channel, NodeLayout::new(config.node_name.clone()));
    let options = mount_options(config);
    debug!(options = ?options, "Mounting FUSE filesystem");

    let session = fuser::spawn_mount2(filesystem, &mount_point, &options).map_err(|e| {
        FuseError::IoError(format!(
            "Failed to mount FUSE filesystem at {}: {}",
            mount_point.display(),
            e
        ))
    })?;

    info!(
        node = %mount_point.join(&config.node_name).display(),
        "kfetch node mounted"
    );

    Ok(session)
}

/// Unmounts the node by dropping its background session.
pub fn unmount(session: BackgroundSession) {
    info!("Unmounting kfetch node");
    drop(session);
    info!("kfetch node unmounted");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/path"), PathBuf::from("rel/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/kfetch"), home.join("kfetch"));
        }
    }

    #[test]
    fn test_check_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_mount_point(dir.path()).is_ok());

        let missing = dir.path().join("missing");
        assert!(matches!(
            check_mount_point(&missing),
            Err(FuseError::NotFound(_))
        ));

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            check_mount_point(&file),
            Err(FuseError::NotADirectory(_))
        ));
        assert!(matches!(
            check_mount_point(dir.path()),
            Err(FuseError::NotEmpty(_))
        ));
    }

    #[test]
    fn test_mount_options() {
        let mut config = FuseConfig::default();
        let options = mount_options(&config);
        assert!(options.contains(&MountOption::AutoUnmount));
        assert!(options.contains(&MountOption::FSName("kfetch".to_string())));
        assert!(!options.contains(&MountOption::AllowOther));

        config.allow_other = true;
        assert!(mount_options(&config).contains(&MountOption::AllowOther));
    }
}
