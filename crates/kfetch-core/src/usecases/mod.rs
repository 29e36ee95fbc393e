//! Application use cases
//!
//! - [`Channel`] - exclusive open/read/write/close over the report pipeline
//! - [`ReportRenderer`] - mask-driven report rendering against a facts provider

pub mod channel;
pub mod render;

pub use channel::Channel;
pub use render::ReportRenderer;
