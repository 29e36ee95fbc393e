//! Serve command - mount the kfetch node
//!
//! 1. Resolve the mount point (flag overrides config) and create it if needed
//! 2. Check FUSE availability via `/dev/fuse`
//! 3. Build the channel over the procfs provider
//! 4. Mount, then serve until Ctrl+C or SIGTERM, then unmount

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use kfetch_core::{config::Config, usecases::Channel};
use kfetch_procfs::ProcFsFactsProvider;
use tokio::signal;
use tracing::info;

use crate::output::OutputFormat;

/// Mount the kfetch node and serve it until interrupted
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Override the configured mount point
    #[arg(long, short = 'p', value_name = "DIR")]
    pub path: Option<PathBuf>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();

        let mut fuse_config = config.fuse.clone();
        if let Some(path) = &self.path {
            fuse_config.mount_point = path.display().to_string();
        }
        let mount_point = kfetch_fuse::expand_tilde(&fuse_config.mount_point);

        if !mount_point.exists() {
            formatter.info(&format!(
                "Creating mount point directory: {}",
                mount_point.display()
            ));
            tokio::fs::create_dir_all(&mount_point)
                .await
                .context("Failed to create mount point directory")?;
        }

        if !Path::new("/dev/fuse").exists() {
            formatter.info("Hint: Make sure the FUSE kernel module is loaded: 'sudo modprobe fuse'");
            bail!("FUSE is not available. /dev/fuse does not exist.");
        }

        let channel = Channel::new(Arc::new(ProcFsFactsProvider::new()), &config.channel);
        let session = kfetch_fuse::mount(&fuse_config, channel)
            .with_context(|| format!("Failed to mount kfetch node at {}", mount_point.display()))?;

        let node = mount_point.join(&fuse_config.node_name);
        formatter.success(&format!("kfetch node available at {}", node.display()));
        formatter.print_json(&serde_json::json!({
            "success": true,
            "mount_point": mount_point.display().to_string(),
            "node": node.display().to_string(),
        }));
        formatter.info("Press Ctrl+C to unmount and exit.");

        wait_for_shutdown().await?;
        info!("Shutdown requested");

        kfetch_fuse::unmount(session);
        formatter.success("kfetch node unmounted");
        Ok(())
    }
}

async fn wait_for_shutdown() -> Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to listen for SIGTERM")?;

    tokio::select! {
        result = signal::ctrl_c() => result.context("Failed to listen for Ctrl+C signal")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_path_flag_is_parsed() {
        let cli = Cli::try_parse_from(["kfetch", "serve", "--path", "/tmp/kfetch-dev"]).unwrap();
        match cli.command {
            crate::Commands::Serve(cmd) => {
                assert_eq!(cmd.path, Some(PathBuf::from("/tmp/kfetch-dev")))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
