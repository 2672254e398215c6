//! Capture command - Store a new photo for a player
//!
//! The image is copied into the photo directory as `<logical name>.jpg`,
//! replacing any earlier photo of the same player, and queued for the next
//! upload phase.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use rostersnap_core::domain::newtypes::LogicalPhotoName;
use rostersnap_core::ports::photo_store::IPhotoStore;
use rostersnap_sync::validator::JPEG_SOI;
use tracing::info;

use super::Context;

/// Capture command arguments
#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Player name as shown on the roster ("Jane Smith" or "Smith, Jane")
    pub player: String,

    /// JPEG image to store for the player
    pub image: PathBuf,
}

impl CaptureCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();

        let name = LogicalPhotoName::from_roster_name(&self.player)
            .with_context(|| format!("Cannot derive a photo name from '{}'", self.player))?;
        let data = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("Failed to read {}", self.image.display()))?;
        check_capture(&data)?;

        let store = ctx.open_store().await?;
        let path = store
            .save_capture(&name, &data)
            .await
            .context("Failed to store captured photo")?;

        info!(player = %self.player, name = %name, path = %path.display(), "Captured photo");

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "player": self.player,
                "name": name.as_str(),
                "path": path.display().to_string(),
                "pending": true,
            }));
        } else {
            formatter.success(&format!("Stored photo for {}", self.player));
            formatter.field("File", &path.display().to_string());
            formatter.info("Queued for upload on the next sync");
        }

        Ok(())
    }
}

/// Captures are stored as `.jpg`, so only JPEG data is accepted
fn check_capture(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        anyhow::bail!("image file is empty");
    }
    if !data.starts_with(&JPEG_SOI) {
        anyhow::bail!("image is not a JPEG file");
    }
    Ok(())
}
