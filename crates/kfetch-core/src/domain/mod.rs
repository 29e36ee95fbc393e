//! Domain types and business logic
//!
//! This module contains the core domain types for kfetch:
//! - Info flags and masks, plus the fixed field priority order
//! - Field values and their textual form
//! - The bounded report buffer and ASCII-art layout
//! - Session exclusivity and the shared mask
//! - Domain-specific error types

pub mod errors;
pub mod field;
pub mod info;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use errors::KfetchError;
pub use field::FieldValue;
pub use info::{InfoFlag, InfoMask, FIELD_PRIORITY};
pub use report::{Report, ReportBuffer, REPORT_CAPACITY};
pub use session::{SessionHandle, SessionManager};
