//! Subcommand implementations and shared invocation context

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use rostersnap_core::config::Config;
use rostersnap_sync::filesystem::LocalPhotoStore;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod capture;
pub mod completions;
pub mod config;
pub mod status;
pub mod sync;

/// Global flags and loaded configuration shared by every subcommand
#[derive(Debug)]
pub struct Context {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub config: Config,
}

impl Context {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Opens the configured photo directory, creating it if needed
    pub async fn open_store(&self) -> Result<LocalPhotoStore> {
        let root = self.config.sync.resolved_photo_dir();
        LocalPhotoStore::open(&root)
            .await
            .with_context(|| format!("Failed to open photo directory {}", root.display()))
    }
}

/// Loads the config file if present, then applies environment overrides
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else {
        Config::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// `"s"` unless `count` is one
pub(crate) fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
