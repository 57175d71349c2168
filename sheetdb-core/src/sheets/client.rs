//! [`GridClient`] over the Sheets v4 REST API.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::auth::Authenticator;
use super::protocol::{
    ApiErrorBody, BatchUpdateRequest, DimensionRange, Request, SpreadsheetMetadata, ValueRange,
};
use crate::a1::GridRange;
use crate::grid::{GridClient, GridError, Row, SheetProperties};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Client bound to one spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    auth: Authenticator,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, auth: Authenticator) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        }
    }

    /// Points the client at another API root (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }

    fn values_url(&self, a1: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(a1))
    }

    async fn call<B, T>(&self, method: Method, url: String, body: Option<&B>) -> Result<T, GridError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.auth.access_token().await?;
        debug!(%method, %url, "sheets request");

        let mut request = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| GridError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GridError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(api_error(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| GridError::Decode(e.to_string()))
    }

    async fn batch_update(&self, requests: Vec<Request>) -> Result<(), GridError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = BatchUpdateRequest { requests };
        let _: serde_json::Value = self.call(Method::POST, url, Some(&body)).await?;
        Ok(())
    }
}

fn address(range: &GridRange) -> Result<String, GridError> {
    range
        .to_a1()
        .map_err(|e| GridError::InvalidRange(e.to_string()))
}

/// Maps a failed response to a [`GridError`], preferring the API's own
/// message.
fn api_error(status: StatusCode, body: &str) -> GridError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    match status {
        StatusCode::UNAUTHORIZED => GridError::Auth(message),
        _ => GridError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl GridClient for SheetsClient {
    async fn authenticate(&self) -> Result<(), GridError> {
        self.auth.access_token().await.map(|_| ())
    }

    async fn list_sheets(&self) -> Result<Vec<SheetProperties>, GridError> {
        let url = format!("{}?fields=sheets.properties", self.spreadsheet_url());
        let metadata: SpreadsheetMetadata = self.call::<(), _>(Method::GET, url, None).await?;
        Ok(metadata.into_sheets())
    }

    async fn create_sheet(&self, title: &str) -> Result<Vec<SheetProperties>, GridError> {
        match self.batch_update(vec![Request::add_sheet(title)]).await {
            Ok(()) => {}
            Err(GridError::Api { status: 400, message }) if message.contains("already exists") => {
                return Err(GridError::DuplicateName(title.to_string()));
            }
            Err(e) => return Err(e),
        }
        self.list_sheets().await
    }

    async fn apply_header_style(&self, sheet_id: i64) -> Result<(), GridError> {
        self.batch_update(vec![
            Request::bold_header(sheet_id),
            Request::freeze_header(sheet_id),
        ])
        .await
    }

    async fn read_range(&self, range: &GridRange) -> Result<Option<Vec<Row>>, GridError> {
        let a1 = address(range)?;
        let url = format!(
            "{}?majorDimension=ROWS&valueRenderOption=UNFORMATTED_VALUE",
            self.values_url(&a1)
        );
        let values: ValueRange = self.call::<(), _>(Method::GET, url, None).await?;
        Ok(values.into_rows())
    }

    async fn write_range(&self, range: &GridRange, rows: &[Row]) -> Result<(), GridError> {
        let a1 = address(range)?;
        let url = format!("{}?valueInputOption=USER_ENTERED", self.values_url(&a1));
        let body = ValueRange::from_rows(a1, rows);
        let _: serde_json::Value = self.call(Method::PUT, url, Some(&body)).await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        self.batch_update(vec![Request::InsertDimension {
            range: DimensionRange::rows(sheet_id, start_index, count),
            inherit_from_before: start_index > 0,
        }])
        .await
    }

    async fn insert_columns(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        self.batch_update(vec![Request::InsertDimension {
            range: DimensionRange::columns(sheet_id, start_index, count),
            inherit_from_before: start_index > 0,
        }])
        .await
    }

    async fn remove_rows(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        self.batch_update(vec![Request::DeleteDimension {
            range: DimensionRange::rows(sheet_id, start_index, count),
        }])
        .await
    }
}
