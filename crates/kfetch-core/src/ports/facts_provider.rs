//! Host facts port (driven/secondary port)
//!
//! Defines how the report renderer obtains raw facts about the machine it
//! runs on. Each accessor is called at most once per rendered row, at the
//! moment that row is rendered, so one report can mix values read at
//! slightly different instants.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because failures are adapter-specific (a missing
//!   procfs file, a failed syscall).
//! - Accessors are synchronous: they run inside FUSE callbacks, which are
//!   themselves synchronous.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// CPU counts as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCounts {
    /// CPUs currently online
    pub online: u32,
    /// CPUs present in the machine
    pub total: u32,
}

/// Memory usage in MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub free_mb: u64,
    pub total_mb: u64,
}

/// Source of host facts
///
/// Implementations must be thread-safe: the channel may be read from any
/// FUSE worker thread.
pub trait IFactsProvider: Send + Sync {
    /// Kernel release, e.g. `6.1.0-13-amd64`
    fn kernel_release(&self) -> Result<String>;

    /// Node name shown in the banner
    fn hostname(&self) -> Result<String>;

    /// CPU model name, e.g. `AMD Ryzen 7 5800X 8-Core Processor`
    fn cpu_model(&self) -> Result<String>;

    /// Online and present CPU counts
    fn cpu_counts(&self) -> Result<CpuCounts>;

    /// Free and total RAM
    fn memory_mb(&self) -> Result<MemoryUsage>;

    /// Number of processes (thread group leaders)
    fn process_count(&self) -> Result<u64>;

    /// Whole minutes since boot
    fn uptime_minutes(&self) -> Result<u64>;
}
