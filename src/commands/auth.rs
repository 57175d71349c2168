//! Authentication commands for the sheetdb CLI.
//!
//! Login runs the OAuth installed-app flow: a local callback server receives
//! the authorization code, which is exchanged for a token and saved to
//! `token_path`.

use crate::config::Config;
use axum::{extract::Query, response::Html, routing::get, Router};
use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Deserialize;
use sheetdb_core::{Authenticator, ClientSecret, GridError, Token};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// How long to wait for the browser to come back.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Log in with a Google account (opens the consent page)
    Login,
    /// Log out (remove the saved token)
    Logout,
    /// Show authentication status
    Status,
}

impl AuthCommand {
    pub async fn run(&self, config: &Config) -> Result<(), AuthError> {
        match &self.command {
            AuthSubcommand::Login => login(config).await,
            AuthSubcommand::Logout => logout(config),
            AuthSubcommand::Status => status(config).await,
        }
    }
}

/// Errors that can occur during authentication
#[derive(Debug)]
pub enum AuthError {
    /// I/O error
    IoError(io::Error),
    /// Credentials or token problem reported by the client
    Grid(GridError),
    /// The consent page reported an error
    Denied(String),
    /// Callback carried a state we did not issue
    StateMismatch,
    /// Timeout waiting for callback
    Timeout,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::IoError(e) => write!(f, "I/O error: {}", e),
            AuthError::Grid(e) => write!(f, "{}", e),
            AuthError::Denied(reason) => write!(f, "Authorization denied: {}", reason),
            AuthError::StateMismatch => {
                write!(f, "Authorization callback did not match this login attempt")
            }
            AuthError::Timeout => write!(f, "Timed out waiting for authentication"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::IoError(e)
    }
}

impl From<GridError> for AuthError {
    fn from(e: GridError) -> Self {
        AuthError::Grid(e)
    }
}

/// Query parameters of the OAuth redirect
#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Outcome of the redirect: the authorization code, or why there is none
type CallbackResult = Result<String, AuthError>;

fn check_callback(params: CallbackParams, expected_state: &str) -> CallbackResult {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params
        .code
        .ok_or_else(|| AuthError::Denied("no authorization code returned".to_string()))
}

/// Interactive login flow
async fn login(config: &Config) -> Result<(), AuthError> {
    let secret = ClientSecret::load(&config.credentials_path.value).await?;
    let auth = Authenticator::new(secret, config.token_path.value.clone());

    // Create channel to receive the result
    let (tx, rx) = oneshot::channel::<CallbackResult>();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let state = Uuid::new_v4().to_string();

    // Start local callback server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let local_port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{}/callback", local_port);

    let expected_state = state.clone();
    let server_handle = tokio::spawn(async move {
        let app = Router::new().route(
            "/callback",
            get(move |Query(params): Query<CallbackParams>| {
                let tx = tx.clone();
                let expected_state = expected_state.clone();
                async move {
                    let result = check_callback(params, &expected_state);
                    let page = if result.is_ok() {
                        "<h1>Authentication successful!</h1>"
                    } else {
                        "<h1>Authentication failed.</h1>"
                    };

                    // Send result through channel
                    if let Ok(mut guard) = tx.lock() {
                        if let Some(tx) = guard.take() {
                            let _ = tx.send(result);
                        }
                    }

                    Html(format!(
                        r#"<!DOCTYPE html>
<html>
<head><title>sheetdb</title></head>
<body>
{}
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#,
                        page
                    ))
                }
            }),
        );

        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!("callback server stopped: {}", e);
        }
    });

    println!("Open this URL in your browser to authorize sheetdb:\n");
    println!("  {}\n", auth.secret().authorization_url(&redirect_uri, &state));
    println!("Waiting for authorization (timeout: 5 minutes)");

    // Wait for callback with timeout
    let result = tokio::time::timeout(LOGIN_TIMEOUT, rx).await;

    // Shutdown server
    server_handle.abort();

    let code = match result {
        Ok(Ok(callback)) => callback?,
        Ok(Err(_)) => return Err(AuthError::Timeout),
        Err(_) => return Err(AuthError::Timeout),
    };

    auth.exchange_code(&code, &redirect_uri).await?;
    println!(
        "Authenticated. Token saved to {}",
        config.token_path.value.display()
    );
    Ok(())
}

/// Remove the saved token
fn logout(config: &Config) -> Result<(), AuthError> {
    let token_path = &config.token_path.value;
    if !token_path.exists() {
        println!("Already logged out (no saved token).");
        return Ok(());
    }

    std::fs::remove_file(token_path)?;
    println!("Logged out. Removed {}", token_path.display());
    Ok(())
}

/// Show authentication status
async fn status(config: &Config) -> Result<(), AuthError> {
    if !config.credentials_path.value.exists() {
        println!(
            "Not configured. Save your OAuth client file to {}",
            config.credentials_path.value.display()
        );
        return Ok(());
    }

    match Token::load(&config.token_path.value).await? {
        None => println!("Not logged in. Run 'sheetdb auth login' to authenticate."),
        Some(token) => {
            let expiry = match token.expires_at() {
                Some(at) if at <= Utc::now() => format!("expired at {}", at.to_rfc3339()),
                Some(at) => format!("expires at {}", at.to_rfc3339()),
                None => "no expiry".to_string(),
            };
            let refresh = if token.refresh_token.is_some() {
                "refreshable"
            } else {
                "not refreshable"
            };
            println!("Logged in (access token {}, {})", expiry, refresh);
        }
    }
    Ok(())
}
