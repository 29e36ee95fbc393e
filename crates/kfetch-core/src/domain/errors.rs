//! Domain error types
//!
//! Errors surfaced synchronously to whoever drives the channel. None of them
//! are retried internally.

use thiserror::Error;

/// Errors that can occur while operating the kfetch channel
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KfetchError {
    /// Another consumer already holds the channel open
    #[error("Device busy: the channel is held by another session")]
    Busy,

    /// Bytes could not be transferred to or from the caller
    #[error("Bad transfer: {0}")]
    Fault(String),

    /// Mask carries bits outside the known info flags (strict mode only)
    #[error("Invalid mask {0:#x}: unknown info bits set")]
    InvalidMask(i32),
}
