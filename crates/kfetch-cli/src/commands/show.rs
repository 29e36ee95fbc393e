//! Show command - the channel client
//!
//! Opens a mounted kfetch node, optionally writes a new mask built from the
//! field flags, reads one report and prints it. The node admits one client
//! at a time; a second concurrent client gets "device busy".

use std::{
    fs::OpenOptions,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use kfetch_core::{
    config::Config,
    domain::{InfoMask, REPORT_CAPACITY},
};
use tracing::{debug, info};

use super::FieldFlags;
use crate::output::OutputFormat;

/// Query a mounted kfetch node
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Path of the node (defaults to the configured mount point and node name)
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    #[command(flatten)]
    pub fields: FieldFlags,
}

impl ShowCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();
        let device = self.device.clone().unwrap_or_else(|| default_device(config));
        let mask = self.fields.mask();

        info!(device = %device.display(), mask = ?mask.map(|m| m.to_string()), "Querying node");

        let path = device.clone();
        let result = tokio::task::spawn_blocking(move || query_device(&path, mask))
            .await
            .context("Device query task failed")?;

        let report = match result {
            Ok(report) => report,
            Err(e) if is_busy(&e) => bail!("device busy"),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to query {}", device.display()));
            }
        };

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "device": device.display().to_string(),
                "mask": mask.map(InfoMask::raw),
                "report": report,
            }));
        } else {
            formatter.raw(&report);
        }

        Ok(())
    }
}

/// Node path from configuration: `<mount_point>/<node_name>`.
pub fn default_device(config: &Config) -> PathBuf {
    kfetch_fuse::expand_tilde(&config.fuse.mount_point).join(&config.fuse.node_name)
}

/// One client session: open, optional mask write, one read, close.
///
/// Returns the report text up to its NUL terminator.
pub fn query_device(device: &Path, mask: Option<InfoMask>) -> io::Result<String> {
    let mut node = OpenOptions::new()
        .read(true)
        .write(mask.is_some())
        .open(device)?;

    if let Some(mask) = mask {
        // The node acknowledges a mask with a zero-length write.
        let acknowledged = node.write(&mask.raw().to_ne_bytes())?;
        debug!(acknowledged, mask = %mask, "Mask written");
    }

    let mut buf = vec![0u8; REPORT_CAPACITY];
    let n = node.read(&mut buf)?;
    buf.truncate(n);
    if let Some(nul) = buf.iter().position(|&b| b == 0) {
        buf.truncate(nul);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn is_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EBUSY)
}
