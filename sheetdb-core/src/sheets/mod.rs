//! Google Sheets backend: OAuth credentials, wire types and the HTTP
//! [`GridClient`](crate::grid::GridClient) implementation.

pub mod auth;
mod client;
pub mod protocol;

pub use auth::{Authenticator, ClientSecret, Token, SHEETS_SCOPE};
pub use client::{SheetsClient, DEFAULT_BASE_URL};
