//! Config command - View and check rostersnap configuration
//!
//! `show` prints the effective configuration (file plus environment
//! overrides) with the API key masked, `validate` checks the file against
//! the configuration rules, and `path` prints where the file is read from.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use rostersnap_core::config::Config;
use tracing::info;

use super::Context;

const MASKED: &str = "********";

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
        }
    }

    fn execute_show(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let config = masked(&ctx.config);

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            if !ctx.config_path.exists() {
                formatter.info("(file not found, showing defaults)");
            }
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_validate(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        info!(config_path = %path.display(), "Validating configuration");

        let errors = ctx.config.validate();
        let configured = ctx.config.storage.is_configured();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "file_exists": path.exists(),
                "storage_configured": configured,
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.field("File", &path.display().to_string());
            if !configured {
                formatter.warn(
                    "storage.base_url and storage.api_key must be set before syncing \
                     (or SUPABASE_URL / SUPABASE_ANON_KEY)",
                );
            }
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.field("File", &path.display().to_string());
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("configuration is invalid")
        }
    }

    fn execute_path(&self, ctx: &Context) -> Result<()> {
        if ctx.is_json() {
            ctx.formatter().print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": ctx.config_path.exists(),
            }));
        } else {
            println!("{}", ctx.config_path.display());
        }
        Ok(())
    }
}

/// Copy of `config` safe to print
fn masked(config: &Config) -> Config {
    let mut config = config.clone();
    if config.storage.api_key.is_some() {
        config.storage.api_key = Some(MASKED.to_string());
    }
    config
}
