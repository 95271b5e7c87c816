//! Sync command handler.

use clap::Args;
use handbook_core::{config::AppConfig, AppError, AppResult};
use handbook_knowledge::{
    build_sync_orchestrator, ProgressEvent, ProgressReporter, SyncOptions, SyncReport,
};
use std::sync::Arc;

/// Index new and modified documents
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// Rebuild the collection and re-index every document
    #[arg(long)]
    pub force: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(force = self.force, "Executing sync command");

        let mut orchestrator = build_sync_orchestrator(config)?;
        if !self.json {
            let print = |event: ProgressEvent| eprintln!("{}", event.format_simple());
            orchestrator = orchestrator.with_progress(ProgressReporter::new(Arc::new(print)));
        }

        let options = SyncOptions { force: self.force };

        // Files committed before an interrupt stay in the manifest.
        let report = tokio::select! {
            report = orchestrator.run(options) => report?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Sync interrupted, remaining files will be picked up next run");
                return Err(AppError::Cancelled);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "Indexed {} files ({} chunks) in {:.2}s",
        report.files_indexed, report.chunks_indexed, report.duration_secs
    );
    println!("  Scanned:   {}", report.files_scanned);
    println!("  Unchanged: {}", report.files_skipped);
    println!("  Rejected:  {}", report.files_rejected);
    println!("  Failed:    {}", report.files_failed);

    if report.is_partial() {
        println!();
        println!("Will retry on the next run:");
        for source in &report.failed_sources {
            println!("- {}", source);
        }
    }
}
