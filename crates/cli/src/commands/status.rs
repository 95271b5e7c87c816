//! Status command handler.

use clap::Args;
use handbook_core::{config::AppConfig, AppResult};
use handbook_knowledge::{build_embedder, build_index, SyncOrchestrator, SyncSettings};

/// Show what is indexed and what is pending
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let index = build_index(config)?;
        let orchestrator = SyncOrchestrator::new(
            config.documents_root(),
            config.manifest_file(),
            build_embedder(config)?,
            index.clone(),
            SyncSettings::from_config(config),
        )?;

        let manifest = orchestrator.manifest()?;
        let plan = orchestrator.plan()?;

        let points = match index.count().await {
            Ok(points) => Some(points),
            Err(e) => {
                tracing::warn!(error = %e, "Could not count indexed chunks");
                None
            }
        };

        if self.json {
            let output = serde_json::json!({
                "documentsRoot": config.documents_root(),
                "collection": index.collection(),
                "trackedFiles": manifest.len(),
                "lastProcessedAt": manifest.last_processed_at(),
                "pendingFiles": plan.changed.len(),
                "rejectedFiles": plan.rejected,
                "indexedChunks": points,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Documents: {}", config.documents_root().display());
            println!("  Tracked files: {}", manifest.len());
            println!("  Pending:       {}", plan.changed.len());
            println!("  Rejected:      {}", plan.rejected);
            if let Some(last) = manifest.last_processed_at() {
                println!("  Last sync:     {}", last);
            }
            match points {
                Some(points) => println!(
                    "Index: {} ({}), {} chunks",
                    index.collection(),
                    index.backend_name(),
                    points
                ),
                None => println!("Index: {} (unavailable)", index.collection()),
            }
        }

        Ok(())
    }
}
