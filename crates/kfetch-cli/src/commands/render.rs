//! Render command - print a report without a mounted node
//!
//! Runs the same renderer the node uses, in-process, over the live procfs
//! provider. Without field flags the configured default mask is used.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use kfetch_core::{config::Config, domain::InfoMask, usecases::ReportRenderer};
use kfetch_procfs::ProcFsFactsProvider;
use tracing::info;

use super::FieldFlags;
use crate::output::OutputFormat;

/// Render a report in-process
#[derive(Debug, Args)]
pub struct RenderCommand {
    #[command(flatten)]
    pub fields: FieldFlags,
}

impl RenderCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = format.formatter();
        let mask = self.effective_mask(config);
        let renderer = ReportRenderer::new(Arc::new(ProcFsFactsProvider::new()));

        info!(mask = %mask, "Rendering report in-process");

        if format.is_json() {
            let fields = serde_json::to_value(renderer.fields(mask))
                .context("Failed to serialize fields")?;
            let report = renderer.render(mask);
            formatter.print_json(&serde_json::json!({
                "mask": mask.raw(),
                "hostname": report.hostname(),
                "fields": fields,
                "report": report.as_str(),
                "truncated": report.is_truncated(),
            }));
        } else {
            formatter.raw(&renderer.render(mask).to_string());
        }

        Ok(())
    }

    fn effective_mask(&self, config: &Config) -> InfoMask {
        self.fields
            .mask()
            .unwrap_or_else(|| config.channel.initial_mask())
    }
}
