//! Subcommands of the `kfetch` binary

pub mod config;
pub mod render;
pub mod serve;
pub mod show;

use clap::Args;
use kfetch_core::domain::{InfoFlag, InfoMask};

/// Field selection flags shared by `show` and `render`
#[derive(Debug, Clone, Default, Args)]
pub struct FieldFlags {
    /// Show all information
    #[arg(short = 'a', long)]
    pub all: bool,

    /// CPU model name
    #[arg(short = 'c', long)]
    pub cpu: bool,

    /// Memory information
    #[arg(short = 'm', long)]
    pub mem: bool,

    /// Number of CPU cores
    #[arg(short = 'n', long = "num-cpus")]
    pub num_cpus: bool,

    /// Number of processes
    #[arg(short = 'p', long)]
    pub procs: bool,

    /// Kernel release
    #[arg(short = 'r', long)]
    pub release: bool,

    /// How long the system has been running
    #[arg(short = 'u', long)]
    pub uptime: bool,
}

impl FieldFlags {
    /// Mask selected by the flags, or `None` when no flag was given.
    pub fn mask(&self) -> Option<InfoMask> {
        if self.all {
            return Some(InfoMask::FULL);
        }

        let selected = [
            (self.release, InfoFlag::Release),
            (self.num_cpus, InfoFlag::NumCpus),
            (self.cpu, InfoFlag::CpuModel),
            (self.mem, InfoFlag::Mem),
            (self.uptime, InfoFlag::Uptime),
            (self.procs, InfoFlag::NumProcs),
        ];
        let mask: InfoMask = selected
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag))
            .collect();

        (!mask.is_empty()).then_some(mask)
    }
}
