//! OAuth 2.0 credentials for the installed-app flow.
//!
//! Two files are involved:
//!
//! - the client secret (`credentials.json`) downloaded from the cloud
//!   console, with an `installed` or `web` section
//! - the saved token (`token.json`), written after login and rewritten on
//!   every refresh
//!
//! [`Authenticator`] hands out access tokens, refreshing them shortly before
//! they expire.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::grid::GridError;

/// Scope granting read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client identity from `credentials.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Reads a client secret file, accepting `installed` or `web` sections.
    pub async fn load(path: &Path) -> Result<Self, GridError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GridError::Io(path.to_path_buf(), e))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, GridError> {
        let file: CredentialsFile = serde_json::from_str(contents)
            .map_err(|e| GridError::Decode(format!("invalid credentials file: {}", e)))?;
        file.installed.or(file.web).ok_or_else(|| {
            GridError::Auth("credentials file has no 'installed' or 'web' client".to_string())
        })
    }

    /// Consent page URL for the installed-app flow.
    ///
    /// Requests offline access so the token response carries a refresh
    /// token.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SHEETS_SCOPE),
            urlencoding::encode(state)
        )
    }
}

/// A saved access token. `expiry_date` is in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Body of a successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl Token {
    /// Builds a token from an endpoint response.
    ///
    /// Refresh responses usually omit the refresh token, so the previous one
    /// is carried over.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry_date: response
                .expires_in
                .map(|secs| (now + Duration::seconds(secs)).timestamp_millis()),
            token_type: response.token_type,
            scope: response.scope,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }

    /// True when the token is expired or about to be. A token without an
    /// expiry never expires.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .is_some_and(|at| at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now)
    }

    /// Loads a saved token. Returns `None` if the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>, GridError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| GridError::Decode(format!("invalid token file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GridError::Io(path.to_path_buf(), e)),
        }
    }

    /// Writes the token, creating parent directories as needed.
    pub async fn save(&self, path: &Path) -> Result<(), GridError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GridError::Io(parent.to_path_buf(), e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| GridError::Decode(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| GridError::Io(path.to_path_buf(), e))
    }
}

/// Supplies valid access tokens, refreshing and persisting as needed.
#[derive(Debug)]
pub struct Authenticator {
    http: reqwest::Client,
    secret: ClientSecret,
    token_path: PathBuf,
    token: Mutex<Option<Token>>,
}

impl Authenticator {
    pub fn new(secret: ClientSecret, token_path: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret,
            token_path: token_path.into(),
            token: Mutex::new(None),
        }
    }

    /// Reads the client secret and prepares to use the token at `token_path`.
    pub async fn from_files(
        credentials_path: &Path,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self, GridError> {
        let secret = ClientSecret::load(credentials_path).await?;
        Ok(Self::new(secret, token_path))
    }

    pub fn secret(&self) -> &ClientSecret {
        &self.secret
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Returns a usable access token.
    ///
    /// Loads the saved token on first use and refreshes it when it is about
    /// to expire. Fails with [`GridError::Auth`] when no token was saved.
    pub async fn access_token(&self) -> Result<String, GridError> {
        let mut cached = self.token.lock().await;
        if cached.is_none() {
            *cached = Token::load(&self.token_path).await?;
        }
        let Some(token) = cached.as_ref() else {
            return Err(GridError::Auth(format!(
                "no saved token at {}; run `sheetdb auth login`",
                self.token_path.display()
            )));
        };

        if !token.needs_refresh(Utc::now()) {
            return Ok(token.access_token.clone());
        }

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            GridError::Auth("token expired and no refresh token was saved".to_string())
        })?;
        debug!("refreshing access token");
        let response = self
            .post_token(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        let fresh = Token::from_response(response, Some(refresh_token), Utc::now());
        fresh.save(&self.token_path).await?;
        let access = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access)
    }

    /// Trades an authorization code for a token and saves it.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, GridError> {
        let response = self
            .post_token(&[
                ("code", code),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let token = Token::from_response(response, None, Utc::now());
        token.save(&self.token_path).await?;
        info!(path = %self.token_path.display(), "saved token");
        *self.token.lock().await = Some(token.clone());
        Ok(token)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, GridError> {
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| GridError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GridError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(GridError::Auth(message));
        }

        serde_json::from_str(&body).map_err(|e| GridError::Decode(e.to_string()))
    }
}
