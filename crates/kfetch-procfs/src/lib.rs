//! Linux host facts collector
//!
//! Implements [`IFactsProvider`] on top of procfs, sysfs and `sysinfo(2)`.
//! Every accessor re-reads its source, so each rendered row reflects the
//! machine at the moment it is laid out.
//!
//! The procfs and sysfs roots are configurable so the collector can be
//! pointed at a fixture tree in tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use kfetch_core::ports::{CpuCounts, IFactsProvider, MemoryUsage};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default mount point of procfs
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default mount point of sysfs
pub const DEFAULT_SYS_ROOT: &str = "/sys";

/// Host facts read from the live kernel interfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcFsFactsProvider {
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl Default for ProcFsFactsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcFsFactsProvider {
    /// Collector over `/proc` and `/sys`
    pub fn new() -> Self {
        Self::with_roots(DEFAULT_PROC_ROOT, DEFAULT_SYS_ROOT)
    }

    /// Collector over alternative procfs and sysfs trees
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    pub fn sys_root(&self) -> &Path {
        &self.sys_root
    }

    fn read_proc(&self, relative: &str) -> Result<String> {
        read_text(&self.proc_root.join(relative))
    }

    fn read_sys(&self, relative: &str) -> Result<String> {
        read_text(&self.sys_root.join(relative))
    }
}

impl IFactsProvider for ProcFsFactsProvider {
    fn kernel_release(&self) -> Result<String> {
        single_line(&self.read_proc("sys/kernel/osrelease")?, "osrelease")
    }

    fn hostname(&self) -> Result<String> {
        single_line(&self.read_proc("sys/kernel/hostname")?, "hostname")
    }

    fn cpu_model(&self) -> Result<String> {
        let cpuinfo = self.read_proc("cpuinfo")?;
        parse_cpu_model(&cpuinfo).ok_or_else(|| anyhow!("no 'model name' entry in cpuinfo"))
    }

    fn cpu_counts(&self) -> Result<CpuCounts> {
        let online = parse_cpu_list(&self.read_sys("devices/system/cpu/online")?)
            .context("Failed to parse online CPU list")?;
        let total = parse_cpu_list(&self.read_sys("devices/system/cpu/present")?)
            .context("Failed to parse present CPU list")?;
        Ok(CpuCounts { online, total })
    }

    fn memory_mb(&self) -> Result<MemoryUsage> {
        read_sysinfo_memory()
    }

    fn process_count(&self) -> Result<u64> {
        let entries = fs::read_dir(&self.proc_root)
            .with_context(|| format!("Failed to list {}", self.proc_root.display()))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry?;
            let is_pid = entry
                .file_name()
                .to_str()
                .is_some_and(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()));
            // A process can exit between listing and stat; that is not an error.
            if is_pid && entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                count += 1;
            }
        }
        trace!(count, "Counted processes");
        Ok(count)
    }

    fn uptime_minutes(&self) -> Result<u64> {
        parse_uptime_minutes(&self.read_proc("uptime")?)
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn single_line(raw: &str, what: &str) -> Result<String> {
    let line = raw.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        bail!("{what} is empty");
    }
    Ok(line.to_string())
}

/// Value of the first `model name` entry in `/proc/cpuinfo`.
///
/// Takes everything after the first `:` up to the end of the line, trimmed.
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Counts the CPUs in a sysfs cpulist such as `0-3,6,8-11`.
pub fn parse_cpu_list(list: &str) -> Result<u32> {
    let list = list.trim();
    if list.is_empty() {
        return Ok(0);
    }

    let mut count = 0u32;
    for part in list.split(',') {
        let part = part.trim();
        let span = match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.parse().with_context(|| format!("bad range start in '{part}'"))?;
                let hi: u32 = hi.parse().with_context(|| format!("bad range end in '{part}'"))?;
                if hi < lo {
                    bail!("descending range '{part}'");
                }
                (hi - lo)
                    .checked_add(1)
                    .ok_or_else(|| anyhow!("range '{part}' is too large"))?
            }
            None => {
                part.parse::<u32>()
                    .with_context(|| format!("bad CPU index '{part}'"))?;
                1
            }
        };
        count = count
            .checked_add(span)
            .ok_or_else(|| anyhow!("CPU list '{list}' counts too many CPUs"))?;
    }
    Ok(count)
}

/// Whole minutes from the first field of `/proc/uptime`.
pub fn parse_uptime_minutes(raw: &str) -> Result<u64> {
    let seconds = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("uptime is empty"))?;
    let whole = seconds.split('.').next().unwrap_or(seconds);
    let seconds: u64 = whole
        .parse()
        .with_context(|| format!("bad uptime value '{seconds}'"))?;
    Ok(seconds / 60)
}

fn read_sysinfo_memory() -> Result<MemoryUsage> {
    // SAFETY: sysinfo only writes into the zeroed struct we hand it.
    let info = unsafe {
        let mut info: libc::sysinfo = std::mem::zeroed();
        if libc::sysinfo(&mut info) != 0 {
            return Err(std::io::Error::last_os_error()).context("sysinfo(2) failed");
        }
        info
    };

    let unit = u64::from(info.mem_unit.max(1));
    Ok(MemoryUsage {
        free_mb: (info.freeram as u64).saturating_mul(unit) >> 20,
        total_mb: (info.totalram as u64).saturating_mul(unit) >> 20,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO: &str = "processor\t: 0\n\
vendor_id\t: GenuineIntel\n\
cpu family\t: 6\n\
model\t\t: 142\n\
model name\t: Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz\n\
stepping\t: 10\n\
\n\
processor\t: 1\n\
model name\t: Some Other CPU\n";

    #[test]
    fn test_parse_cpu_model_takes_first_entry() {
        assert_eq!(
            parse_cpu_model(CPUINFO).as_deref(),
            Some("Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz")
        );
    }

    #[test]
    fn test_parse_cpu_model_keeps_later_colons() {
        let info = "model name\t: ARMv8 rev 4: cortex\n";
        assert_eq!(parse_cpu_model(info).as_deref(), Some("ARMv8 rev 4: cortex"));
    }

    #[test]
    fn test_parse_cpu_model_missing() {
        assert_eq!(parse_cpu_model("processor\t: 0\nHardware\t: BCM2835\n"), None);
        assert_eq!(parse_cpu_model("model name\t:   \n"), None);
    }

    #[test]
    fn test_parse_cpu_list() {
        assert_eq!(parse_cpu_list("0\n").unwrap(), 1);
        assert_eq!(parse_cpu_list("0-7\n").unwrap(), 8);
        assert_eq!(parse_cpu_list("0-3,6,8-11").unwrap(), 9);
        assert_eq!(parse_cpu_list("").unwrap(), 0);
    }

    #[test]
    fn test_parse_cpu_list_rejects_garbage() {
        assert!(parse_cpu_list("0-x").is_err());
        assert!(parse_cpu_list("7-3").is_err());
        assert!(parse_cpu_list("a").is_err());
    }

    #[test]
    fn test_parse_cpu_list_rejects_overflowing_counts() {
        assert!(parse_cpu_list("0-4294967295").is_err());
        assert!(parse_cpu_list("0-4294967294,5").is_err());
        assert_eq!(parse_cpu_list("0-4294967294").unwrap(), u32::MAX);
    }

    #[test]
    fn test_parse_uptime_minutes() {
        assert_eq!(parse_uptime_minutes("59.99 100.00\n").unwrap(), 0);
        assert_eq!(parse_uptime_minutes("60.00 100.00\n").unwrap(), 1);
        assert_eq!(parse_uptime_minutes("7384.12 27000.50\n").unwrap(), 123);
        assert!(parse_uptime_minutes("").is_err());
        assert!(parse_uptime_minutes("soon").is_err());
    }

    #[test]
    fn test_single_line_trims() {
        assert_eq!(single_line("6.1.0-13-amd64\n", "osrelease").unwrap(), "6.1.0-13-amd64");
        assert!(single_line("\n", "hostname").is_err());
    }

    #[test]
    fn test_provider_serialization() {
        let provider = ProcFsFactsProvider::with_roots("/tmp/proc", "/tmp/sys");
        let json = serde_json::to_string(&provider).unwrap();
        let back: ProcFsFactsProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(back, provider);
    }
}
