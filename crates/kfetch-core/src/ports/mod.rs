//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the domain core depends on, implemented in
//! adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IFactsProvider`] - Host facts (kernel, CPU, memory, processes, uptime)

pub mod facts_provider;

pub use facts_provider::{CpuCounts, IFactsProvider, MemoryUsage};
