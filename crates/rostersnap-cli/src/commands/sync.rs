//! Sync command - Synchronize the photo directory with the storage bucket
//!
//! Provides the `rostersnap sync` CLI command which:
//! 1. Collects the expected player names from `--roster` and `--player`
//! 2. Builds the Supabase bucket adapter and the local photo store
//! 3. Runs the full sync (or a single phase) and prints the counts

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Args;
use rostersnap_core::domain::newtypes::LogicalPhotoName;
use rostersnap_storage::SupabaseBucket;
use rostersnap_sync::{SyncEngine, SyncError, SyncResult};
use tracing::{info, warn};

use super::{plural, Context};
use crate::output::OutputFormatter;

/// Sync command options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// File with one roster name per line; blank lines and `#` comments are skipped
    #[arg(long, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Expected player name (repeatable)
    #[arg(long, value_name = "NAME")]
    pub player: Vec<String>,

    /// Only download missing photos
    #[arg(long, conflicts_with = "upload_only")]
    pub download_only: bool,

    /// Only upload pending captures
    #[arg(long)]
    pub upload_only: bool,
}

impl SyncCommand {
    /// Wires up the adapters, runs the engine and displays the result
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();

        let expected = self.expected_names().await?;
        if let Some(names) = &expected {
            info!(expected = names.len(), "Using expected player names");
        }

        let bucket = SupabaseBucket::from_config(&ctx.config.storage)
            .context("Remote storage is not configured")?;
        let store = ctx.open_store().await?;
        let engine = SyncEngine::from_config(&ctx.config, Arc::new(bucket), Arc::new(store))?;

        let show_progress = !ctx.quiet && !ctx.is_json();
        let progress = |message: &str| eprintln!("  {message}");
        let on_progress: Option<&(dyn Fn(&str) + Send + Sync)> = if show_progress {
            Some(&progress)
        } else {
            None
        };

        let started = Instant::now();
        let outcome: Result<SyncResult, SyncError> = if self.download_only {
            engine
                .download_missing(on_progress, expected.as_deref())
                .await
                .map(SyncResult::from)
        } else if self.upload_only {
            engine.upload_pending(on_progress).await.map(SyncResult::from)
        } else {
            engine
                .run_full_sync(on_progress, expected.as_deref())
                .await
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                display_result(ctx, &*formatter, &result, elapsed_ms);
                Ok(())
            }
            Err(SyncError::PhaseFailed {
                phase,
                partial,
                source,
            }) => {
                warn!(phase = %phase, error = %source, "Sync phase failed");
                display_result(ctx, &*formatter, &partial, elapsed_ms);
                Err(anyhow::Error::new(*source).context(format!("{phase} phase failed")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Names from `--roster` and `--player`, or `None` if neither was given
    async fn expected_names(&self) -> Result<Option<Vec<LogicalPhotoName>>> {
        if self.roster.is_none() && self.player.is_empty() {
            return Ok(None);
        }

        let mut names = match &self.roster {
            Some(path) => read_roster(path).await?,
            None => Vec::new(),
        };
        for player in &self.player {
            let name = LogicalPhotoName::from_roster_name(player)
                .with_context(|| format!("Invalid player name '{player}'"))?;
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(Some(names))
    }
}

async fn read_roster(path: &Path) -> Result<Vec<LogicalPhotoName>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read roster {}", path.display()))?;
    parse_roster(&text).with_context(|| format!("Invalid roster {}", path.display()))
}

/// Parses one roster name per line, de-duplicated in file order
fn parse_roster(text: &str) -> Result<Vec<LogicalPhotoName>> {
    let mut names = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name = LogicalPhotoName::from_roster_name(line)
            .with_context(|| format!("line {}", index + 1))?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

fn display_result(
    ctx: &Context,
    formatter: &dyn OutputFormatter,
    result: &SyncResult,
    elapsed_ms: u64,
) {
    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "downloaded": result.downloaded,
            "uploaded": result.uploaded,
            "skipped": result.skipped,
            "failed": result.failed,
            "duration_ms": elapsed_ms,
        }));
        return;
    }

    if result.downloaded == 0 && result.uploaded == 0 && result.failed == 0 {
        formatter.success("Already up to date");
    } else {
        formatter.success(&format!("Sync finished in {}", format_duration(elapsed_ms)));
    }

    if ctx.quiet {
        return;
    }
    let rows = [
        ("Downloaded", result.downloaded),
        ("Uploaded", result.uploaded),
        ("Skipped", result.skipped),
    ];
    for (label, count) in rows {
        if count > 0 {
            formatter.field(label, &format!("{count} photo{}", plural(count)));
        }
    }
    if result.failed > 0 {
        formatter.warn(&format!(
            "{} photo{} failed; rerun sync to retry (use -v for details)",
            result.failed,
            plural(result.failed)
        ));
    }
}

fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}
