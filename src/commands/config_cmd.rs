use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::OutputFormat;
use skolai::config::{mask_key, Config, ConfigError};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a starter config file
    Init {
        /// Where to write it (defaults to the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&config.redacted())?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("school_name: {}", config.school_name.value);
                        println!("  source: {}", config.school_name.source);
                        println!();

                        let remote = &config.remote;
                        println!("remote:");
                        println!("  base_url: {}", or_unset(remote.base_url.as_deref()));
                        println!(
                            "  api_key: {}",
                            remote.api_key.as_deref().map(mask_key).as_deref().unwrap_or("(not set)")
                        );
                        println!("  auto_sync: {}", remote.auto_sync);
                        println!();

                        let ai = &config.ai;
                        println!("ai:");
                        println!("  endpoint: {}", ai.endpoint);
                        println!("  model: {}", ai.model);
                        println!(
                            "  api_key: {}",
                            ai.api_key.as_deref().map(mask_key).as_deref().unwrap_or("(not set)")
                        );
                        if !ai.is_configured() {
                            println!("  (reports use the local template)");
                        }
                        println!();

                        println!(
                            "dashboard.poll_interval_secs: {}",
                            config.dashboard.poll_interval_secs
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init { path, force } => {
                let path = path
                    .clone()
                    .or_else(|| config.config_file.clone())
                    .unwrap_or_else(Config::default_config_path);

                if path.exists() && !force {
                    return Err(format!(
                        "Config file already exists: {} (use --force to overwrite)",
                        path.display()
                    )
                    .into());
                }

                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| ConfigError::WriteError(path.clone(), e))?;
                }
                std::fs::write(&path, Config::template())
                    .map_err(|e| ConfigError::WriteError(path.clone(), e))?;

                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}
