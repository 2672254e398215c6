//! Status command - Display local photo and upload queue status
//!
//! Reports the photo directory, how many photos it holds, which captures
//! are still waiting for upload, and whether remote storage is configured.
//! No network request is made.

use anyhow::{Context as _, Result};
use clap::Args;
use rostersnap_core::ports::photo_store::IPhotoStore;
use rostersnap_sync::filesystem::LocalPhotoStore;
use tracing::info;

use super::{plural, Context};

/// Status command
#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let root = ctx.config.sync.resolved_photo_dir();

        // Status never creates the directory.
        let store = LocalPhotoStore::new(&root);
        let records = store.records().await.context("Failed to read photo directory")?;
        let pending = store
            .list_pending()
            .await
            .context("Failed to read the pending upload queue")?;
        let configured = ctx.config.storage.is_configured();

        info!(
            photo_dir = %root.display(),
            photos = records.len(),
            pending = pending.len(),
            "Showing status"
        );

        if ctx.is_json() {
            let pending_json: Vec<_> = pending
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "path": entry.path.display().to_string(),
                        "queued_at": entry.queued_at.to_rfc3339(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "photo_dir": root.display().to_string(),
                "photo_dir_exists": root.is_dir(),
                "photos": records.len(),
                "pending": pending_json,
                "storage_configured": configured,
                "bucket": ctx.config.storage.bucket,
            }));
            return Ok(());
        }

        formatter.success("Rostersnap Status");
        formatter.info("");
        formatter.field("Photos", &root.display().to_string());
        if !root.is_dir() {
            formatter.info("(directory does not exist yet)");
        }
        formatter.field("Local", &format!("{} photo{}", records.len(), plural(records.len() as u32)));
        formatter.field("Pending", &format!("{} upload{}", pending.len(), plural(pending.len() as u32)));
        formatter.field(
            "Storage",
            &if configured {
                format!("configured (bucket {})", ctx.config.storage.bucket)
            } else {
                "not configured".to_string()
            },
        );

        if !pending.is_empty() && !ctx.quiet {
            formatter.info("");
            formatter.info("Pending uploads:");
            for entry in &pending {
                let name = entry
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| entry.path.display().to_string());
                formatter.info(&format!(
                    "  {:<30} queued {}",
                    name,
                    entry.queued_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
        }

        if !configured {
            formatter.info("");
            formatter.warn("Set storage.base_url and storage.api_key (or SUPABASE_URL / SUPABASE_ANON_KEY) to sync");
        }

        Ok(())
    }
}
