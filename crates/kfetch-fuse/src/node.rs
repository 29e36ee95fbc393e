//! Namespace of the mounted filesystem.
//!
//! The tree is fixed: a root directory holding exactly one file, the
//! channel node. This module answers the metadata questions the FUSE
//! callbacks ask about it (lookup, getattr, readdir) without touching the
//! channel itself.

use std::{ffi::OsStr, fmt, time::SystemTime};

use fuser::{FileAttr, FileType};

use crate::error::FuseError;

/// A newtype wrapper for FUSE inode numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodeNumber(u64);

impl InodeNumber {
    /// Root directory (always 1 per FUSE convention)
    pub const ROOT: InodeNumber = InodeNumber(1);

    /// The channel node
    pub const NODE: InodeNumber = InodeNumber(2);

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InodeNumber {
    fn from(val: u64) -> Self {
        InodeNumber(val)
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permissions of the root directory
const ROOT_PERM: u16 = 0o755;

/// Permissions of the channel node; any local user may open it
const NODE_PERM: u16 = 0o666;

/// Fixed two-inode tree: `/` and `/<node_name>`
#[derive(Debug, Clone)]
pub struct NodeLayout {
    node_name: String,
    uid: u32,
    gid: u32,
    created: SystemTime,
}

impl NodeLayout {
    /// Layout owned by the current user
    pub fn new(node_name: impl Into<String>) -> Self {
        Self::with_owner(
            node_name,
            unsafe { libc::getuid() }, // Current user
            unsafe { libc::getgid() }, // Current group
        )
    }

    pub fn with_owner(node_name: impl Into<String>, uid: u32, gid: u32) -> Self {
        Self {
            node_name: node_name.into(),
            uid,
            gid,
            created: SystemTime::now(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Resolves `name` inside directory `parent`.
    ///
    /// # Errors
    ///
    /// - [`FuseError::NotADirectory`] if `parent` is the node
    /// - [`FuseError::NotFound`] for any other miss
    pub fn lookup(&self, parent: u64, name: &OsStr) -> Result<FileAttr, FuseError> {
        match InodeNumber::from(parent) {
            InodeNumber::ROOT => {
                if name == OsStr::new(&self.node_name) {
                    Ok(self.node_attr())
                } else {
                    Err(FuseError::NotFound(name.to_string_lossy().into_owned()))
                }
            }
            InodeNumber::NODE => Err(FuseError::NotADirectory(self.node_name.clone())),
            other => Err(FuseError::NotFound(format!("inode {other}"))),
        }
    }

    /// Attributes of inode `ino`.
    pub fn attr(&self, ino: u64) -> Result<FileAttr, FuseError> {
        match InodeNumber::from(ino) {
            InodeNumber::ROOT => Ok(self.root_attr()),
            InodeNumber::NODE => Ok(self.node_attr()),
            other => Err(FuseError::NotFound(format!("inode {other}"))),
        }
    }

    /// Checks that `ino` is the channel node, the only openable file.
    pub fn require_node(&self, ino: u64) -> Result<(), FuseError> {
        match InodeNumber::from(ino) {
            InodeNumber::NODE => Ok(()),
            InodeNumber::ROOT => Err(FuseError::IsADirectory("/".to_string())),
            other => Err(FuseError::NotFound(format!("inode {other}"))),
        }
    }

    /// Checks that `ino` is the root directory.
    pub fn require_root(&self, ino: u64) -> Result<(), FuseError> {
        match InodeNumber::from(ino) {
            InodeNumber::ROOT => Ok(()),
            InodeNumber::NODE => Err(FuseError::NotADirectory(self.node_name.clone())),
            other => Err(FuseError::NotFound(format!("inode {other}"))),
        }
    }

    /// Directory listing of the root: `.`, `..` and the node.
    pub fn root_entries(&self) -> [(InodeNumber, FileType, &str); 3] {
        [
            (InodeNumber::ROOT, FileType::Directory, "."),
            (InodeNumber::ROOT, FileType::Directory, ".."),
            (InodeNumber::NODE, FileType::RegularFile, self.node_name.as_str()),
        ]
    }

    fn root_attr(&self) -> FileAttr {
        self.attr_for(InodeNumber::ROOT, FileType::Directory, ROOT_PERM, 2)
    }

    // Size is reported as zero, like procfs files; reads are direct I/O.
    fn node_attr(&self) -> FileAttr {
        self.attr_for(InodeNumber::NODE, FileType::RegularFile, NODE_PERM, 1)
    }

    fn attr_for(&self, ino: InodeNumber, kind: FileType, perm: u16, nlink: u32) -> FileAttr {
        FileAttr {
            ino: ino.get(),
            size: 0,
            blocks: 0,
            atime: self.created,
            mtime: self.created,
            ctime: self.created,
            crtime: self.created,
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 4096,
            flags: 0,
        }
    }
}
