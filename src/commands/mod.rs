mod auth;
mod config_cmd;
mod fields;
mod records;

use clap::ValueEnum;
use sheetdb_core::{Authenticator, SheetsClient, Store};

use crate::config::Config;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use records::{
    DeleteCommand, FindCommand, InsertCommand, ListCommand, RefreshCommand, UpdateCommand,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Connects to the configured spreadsheet.
pub async fn open_store(
    config: &Config,
) -> Result<Store<SheetsClient>, Box<dyn std::error::Error>> {
    let spreadsheet_id = config.require_spreadsheet_id()?;
    let auth =
        Authenticator::from_files(&config.credentials_path.value, config.token_path.value.clone())
            .await?;
    let client =
        SheetsClient::new(spreadsheet_id, auth).with_base_url(config.api_base_url.value.clone());
    Ok(Store::open(client).await?)
}
