//! Typed clients for the BrightTimes backend.
//!
//! [`CatalogClient`] and [`AuthClient`] talk to public endpoints directly.
//! [`OrganizerClient`] routes everything through the [`AuthGateway`](crate::gateway::AuthGateway).

pub mod auth;
pub mod catalog;
pub mod links;
pub mod models;
pub mod organizer;

pub use auth::AuthClient;
pub use catalog::CatalogClient;
pub use organizer::OrganizerClient;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// Fails with [`ApiError::Status`] unless the response is 2xx.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_body(status.as_u16(), &body).into())
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = ensure_success(response).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()).into())
}
