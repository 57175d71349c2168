use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

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
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
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

                        println!(
                            "spreadsheet_id: {}",
                            config
                                .spreadsheet_id
                                .value
                                .as_deref()
                                .unwrap_or("(not set)")
                        );
                        println!("  source: {}", config.spreadsheet_id.source);
                        println!();

                        println!(
                            "credentials_path: {}",
                            config.credentials_path.value.display()
                        );
                        println!("  source: {}", config.credentials_path.source);
                        println!();

                        println!("token_path: {}", config.token_path.value.display());
                        println!("  source: {}", config.token_path.source);
                        println!();

                        println!("api_base_url: {}", config.api_base_url.value);
                        println!("  source: {}", config.api_base_url.source);
                    }
                }
                Ok(())
            }
        }
    }
}
