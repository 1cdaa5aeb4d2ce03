//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use insights_core::config::AppConfig;
use insights_core::error::AppError;
use insights_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_dir: &str,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => match format {
            OutputFormat::Json => output::print_json(config),
            OutputFormat::Table => print_summary(config),
        },
        ConfigCommand::Validate => {
            validate(config)?;
            output::print_success(&format!("Configuration in '{}' is valid", config_dir));
            print_summary(config);
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to create dir: {}", e)))?;
            }

            tokio::fs::write(out_path, default_config)
                .await
                .map_err(|e| AppError::internal(format!("Failed to write config: {}", e)))?;

            output::print_success(&format!("Default config written to '{}'", out_path));
        }
    }

    Ok(())
}

fn print_summary(config: &AppConfig) {
    output::print_kv("API", &config.api.base_url);
    output::print_kv("Auth endpoint", &config.api.auth_url());
    output::print_kv("Login path", &config.session.login_path);
    output::print_kv("Landing path", &config.session.landing_path);
    output::print_kv(
        "Expiry check",
        &format!("every {}s", config.session.check_interval_seconds),
    );
    output::print_kv(
        "Store",
        &format!("{} ({})", config.storage.backend, config.storage.path),
    );
    output::print_kv("Log level", &config.logging.level);
}

/// Checks settings the session manager cannot work without.
fn validate(config: &AppConfig) -> AppResult<()> {
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        return Err(AppError::configuration(format!(
            "api.base_url must be an http(s) URL, got '{}'",
            config.api.base_url
        )));
    }
    if !config.session.login_path.starts_with('/') || !config.session.landing_path.starts_with('/')
    {
        return Err(AppError::configuration(
            "session.login_path and session.landing_path must start with '/'",
        ));
    }
    if config.session.check_interval_seconds == 0 {
        return Err(AppError::configuration(
            "session.check_interval_seconds must be at least 1",
        ));
    }
    if !matches!(config.logging.format.as_str(), "pretty" | "json") {
        return Err(AppError::configuration(format!(
            "logging.format must be 'pretty' or 'json', got '{}'",
            config.logging.format
        )));
    }
    Ok(())
}
