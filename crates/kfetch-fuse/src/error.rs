//! Error types for the FUSE node.
//!
//! Defines `FuseError` and conversions to libc errno values.

use kfetch_core::domain::KfetchError;
use thiserror::Error;

/// Errors that can occur while mounting or serving the node.
#[derive(Error, Debug)]
pub enum FuseError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("bad file handle: {0}")]
    BadHandle(u64),

    #[error("device busy")]
    Busy,

    #[error("bad address: {0}")]
    Fault(String),
}

impl From<FuseError> for libc::c_int {
    fn from(err: FuseError) -> libc::c_int {
        match err {
            FuseError::NotFound(_) => libc::ENOENT,
            FuseError::NotEmpty(_) => libc::ENOTEMPTY,
            FuseError::IoError(_) => libc::EIO,
            FuseError::NotADirectory(_) => libc::ENOTDIR,
            FuseError::IsADirectory(_) => libc::EISDIR,
            FuseError::InvalidArgument(_) => libc::EINVAL,
            FuseError::BadHandle(_) => libc::EBADF,
            FuseError::Busy => libc::EBUSY,
            FuseError::Fault(_) => libc::EFAULT,
        }
    }
}

impl From<KfetchError> for FuseError {
    fn from(err: KfetchError) -> Self {
        match err {
            KfetchError::Busy => FuseError::Busy,
            KfetchError::Fault(msg) => FuseError::Fault(msg),
            e @ KfetchError::InvalidMask(_) => FuseError::InvalidArgument(e.to_string()),
        }
    }
}

impl From<std::io::Error> for FuseError {
    fn from(err: std::io::Error) -> Self {
        FuseError::IoError(err.to_string())
    }
}

impl From<anyhow::Error> for FuseError {
    fn from(err: anyhow::Error) -> Self {
        FuseError::IoError(err.to_string())
    }
}
