//! Shared fixtures for kfetch-core integration tests

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use anyhow::Result;
use kfetch_core::{
    config::ChannelConfig,
    ports::{CpuCounts, IFactsProvider, MemoryUsage},
    usecases::Channel,
};

/// Deterministic facts provider that counts how often it is asked
pub struct FakeFacts {
    pub hostname: String,
    pub release: String,
    pub model: String,
    pub uptime: AtomicU64,
    pub calls: AtomicUsize,
}

impl FakeFacts {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            release: "6.5.0-41-generic".to_string(),
            model: "AMD EPYC 7B13".to_string(),
            uptime: AtomicU64::new(125),
            calls: AtomicUsize::new(0),
        }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl IFactsProvider for FakeFacts {
    fn kernel_release(&self) -> Result<String> {
        self.hit();
        Ok(self.release.clone())
    }

    fn hostname(&self) -> Result<String> {
        Ok(self.hostname.clone())
    }

    fn cpu_model(&self) -> Result<String> {
        self.hit();
        Ok(self.model.clone())
    }

    fn cpu_counts(&self) -> Result<CpuCounts> {
        self.hit();
        Ok(CpuCounts {
            online: 4,
            total: 4,
        })
    }

    fn memory_mb(&self) -> Result<MemoryUsage> {
        self.hit();
        Ok(MemoryUsage {
            free_mb: 3012,
            total_mb: 15990,
        })
    }

    fn process_count(&self) -> Result<u64> {
        self.hit();
        Ok(173)
    }

    fn uptime_minutes(&self) -> Result<u64> {
        self.hit();
        Ok(self.uptime.load(Ordering::SeqCst))
    }
}

/// Channel over a fresh [`FakeFacts`] with default configuration
pub fn make_channel(hostname: &str) -> (Channel, Arc<FakeFacts>) {
    let facts = Arc::new(FakeFacts::new(hostname));
    let channel = Channel::new(
        Arc::clone(&facts) as Arc<dyn IFactsProvider>,
        &ChannelConfig::default(),
    );
    (channel, facts)
}

/// Expected text of a field row for `flag`, as rendered from [`FakeFacts`]
pub fn expected_row(flag: kfetch_core::domain::InfoFlag, uptime: u64) -> String {
    use kfetch_core::domain::InfoFlag;
    match flag {
        InfoFlag::Release => "Kernel:\t6.5.0-41-generic".to_string(),
        InfoFlag::CpuModel => "CPU:\tAMD EPYC 7B13".to_string(),
        InfoFlag::NumCpus => "CPUs:\t4 / 4".to_string(),
        InfoFlag::Mem => "Mem:\t3012 MB / 15990 MB".to_string(),
        InfoFlag::NumProcs => "Procs:\t173".to_string(),
        InfoFlag::Uptime if uptime <= 1 => format!("Uptime:\t{} min", uptime),
        InfoFlag::Uptime => format!("Uptime:\t{} mins", uptime),
    }
}
