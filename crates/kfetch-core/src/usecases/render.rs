//! Report rendering use case
//!
//! Walks a working copy of the mask row by row, fetching each selected
//! field from the facts provider at the moment its row is laid out.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::domain::{field::UNKNOWN_VALUE, FieldValue, InfoFlag, InfoMask, Report};
use crate::ports::IFactsProvider;

/// Fetches one field's value from the provider
type FieldSource = fn(&dyn IFactsProvider) -> Result<FieldValue>;

/// Where each field comes from, in render priority order.
const FIELD_SOURCES: [(InfoFlag, FieldSource); InfoFlag::COUNT] = [
    (InfoFlag::Release, fetch_release),
    (InfoFlag::CpuModel, fetch_cpu_model),
    (InfoFlag::NumCpus, fetch_num_cpus),
    (InfoFlag::Mem, fetch_mem),
    (InfoFlag::NumProcs, fetch_num_procs),
    (InfoFlag::Uptime, fetch_uptime),
];

fn fetch_release(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    Ok(FieldValue::Release {
        release: facts.kernel_release()?,
    })
}

fn fetch_cpu_model(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    Ok(FieldValue::CpuModel {
        model: facts.cpu_model()?,
    })
}

fn fetch_num_cpus(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    let counts = facts.cpu_counts()?;
    Ok(FieldValue::NumCpus {
        online: counts.online,
        total: counts.total,
    })
}

fn fetch_mem(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    let mem = facts.memory_mb()?;
    Ok(FieldValue::Mem {
        free_mb: mem.free_mb,
        total_mb: mem.total_mb,
    })
}

fn fetch_num_procs(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    Ok(FieldValue::NumProcs {
        count: facts.process_count()?,
    })
}

fn fetch_uptime(facts: &dyn IFactsProvider) -> Result<FieldValue> {
    Ok(FieldValue::Uptime {
        minutes: facts.uptime_minutes()?,
    })
}

fn source_for(flag: InfoFlag) -> FieldSource {
    FIELD_SOURCES[flag.priority()].1
}

/// Renders reports from a facts provider
#[derive(Clone)]
pub struct ReportRenderer {
    facts: Arc<dyn IFactsProvider>,
}

impl ReportRenderer {
    /// Creates a renderer backed by `facts`
    pub fn new(facts: Arc<dyn IFactsProvider>) -> Self {
        Self { facts }
    }

    /// Fetches a single field, substituting a placeholder on provider failure
    pub fn field(&self, flag: InfoFlag) -> FieldValue {
        match source_for(flag)(self.facts.as_ref()) {
            Ok(value) => value,
            Err(e) => {
                warn!(field = %flag, error = %e, "Failed to read host fact");
                FieldValue::Unavailable { flag }
            }
        }
    }

    /// Renders a full report for `mask`.
    ///
    /// `mask` is consumed as a private working copy: one field is taken per
    /// art row in [`FIELD_PRIORITY`](crate::domain::FIELD_PRIORITY) order
    /// until the mask runs dry.
    pub fn render(&self, mask: InfoMask) -> Report {
        let hostname = self.facts.hostname().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read hostname");
            UNKNOWN_VALUE.to_string()
        });

        let mut working = mask;
        let report = Report::compose(&hostname, || {
            working
                .select_and_consume()
                .map(|flag| self.field(flag).text())
        });

        debug!(
            mask = %mask,
            bytes = report.wire_len(),
            truncated = report.is_truncated(),
            "Rendered report"
        );
        report
    }

    /// Fetches every field selected by `mask`, in priority order
    pub fn fields(&self, mask: InfoMask) -> Vec<FieldValue> {
        mask.flags().map(|flag| self.field(flag)).collect()
    }
}

impl std::fmt::Debug for ReportRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRenderer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::domain::FIELD_PRIORITY;
    use crate::ports::{CpuCounts, MemoryUsage};

    struct StubFacts {
        uptime: u64,
        fail_mem: bool,
    }

    impl IFactsProvider for StubFacts {
        fn kernel_release(&self) -> Result<String> {
            Ok("6.6.8-arch1-1".into())
        }
        fn hostname(&self) -> Result<String> {
            Ok("node1".into())
        }
        fn cpu_model(&self) -> Result<String> {
            Ok("Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz".into())
        }
        fn cpu_counts(&self) -> Result<CpuCounts> {
            Ok(CpuCounts {
                online: 6,
                total: 8,
            })
        }
        fn memory_mb(&self) -> Result<MemoryUsage> {
            if self.fail_mem {
                return Err(anyhow!("sysinfo failed"));
            }
            Ok(MemoryUsage {
                free_mb: 1024,
                total_mb: 7861,
            })
        }
        fn process_count(&self) -> Result<u64> {
            Ok(287)
        }
        fn uptime_minutes(&self) -> Result<u64> {
            Ok(self.uptime)
        }
    }

    fn renderer(uptime: u64, fail_mem: bool) -> ReportRenderer {
        ReportRenderer::new(Arc::new(StubFacts { uptime, fail_mem }))
    }

    #[test]
    fn test_sources_follow_priority_order() {
        let order: Vec<InfoFlag> = FIELD_SOURCES.iter().map(|(flag, _)| *flag).collect();
        assert_eq!(order, FIELD_PRIORITY.to_vec());
    }

    #[test]
    fn test_priority_indexes_the_source_table() {
        for flag in InfoFlag::ALL {
            assert_eq!(FIELD_SOURCES[flag.priority()].0, flag);
        }
    }

    #[test]
    fn test_every_flag_has_a_matching_source() {
        let r = renderer(5, false);
        for flag in InfoFlag::ALL {
            assert_eq!(r.field(flag).flag(), flag);
        }
    }

    #[test]
    fn test_full_report() {
        let report = renderer(86, false).render(InfoMask::FULL);
        assert_eq!(
            report.field_rows(),
            vec![
                Some("Kernel:\t6.6.8-arch1-1"),
                Some("CPU:\tIntel(R) Core(TM) i5-8250U CPU @ 1.60GHz"),
                Some("CPUs:\t6 / 8"),
                Some("Mem:\t1024 MB / 7861 MB"),
                Some("Procs:\t287"),
                Some("Uptime:\t86 mins"),
            ]
        );
        assert_eq!(report.hostname(), "node1");
    }

    #[test]
    fn test_render_does_not_touch_callers_mask() {
        let mask = InfoMask::from_raw(9);
        let _ = renderer(1, false).render(mask);
        assert_eq!(mask.raw(), 9);
    }

    #[test]
    fn test_provider_failure_renders_placeholder() {
        let report = renderer(1, true).render(InfoMask::from(InfoFlag::Mem));
        assert_eq!(report.field_rows()[0], Some("Mem:\tunknown"));
    }

    #[test]
    fn test_fields_in_priority_order() {
        let fields = renderer(1, false).fields(InfoMask::from_raw(0b110000));
        assert_eq!(
            fields,
            vec![
                FieldValue::NumProcs { count: 287 },
                FieldValue::Uptime { minutes: 1 },
            ]
        );
    }
}
