use url::Url;

use crate::error::{ClientError, Result};

/// Hosts the backend accepts for activity join links.
pub const ALLOWED_JOIN_HOSTS: &[&str] = &["zoom.us", "meet.google.com"];

/// Checks a join link before it is sent, mirroring the backend's rule of
/// https-only Zoom or Google Meet URLs.
pub fn validate_join_link(link: &str) -> Result<Url> {
    let link = link.trim();
    let url = Url::parse(link)
        .map_err(|e| ClientError::ValidationError(format!("Invalid join link: {}", e)))?;

    if url.scheme() != "https" {
        return Err(ClientError::ValidationError(
            "Join link must use https".to_string(),
        ));
    }

    if !url.username().is_empty() || url.password().is_some() || url.port().is_some() {
        return Err(ClientError::ValidationError(
            "Join link must not carry credentials or a port".to_string(),
        ));
    }

    let host = match url.host_str() {
        Some(host) if ALLOWED_JOIN_HOSTS.contains(&host) => host,
        _ => {
            return Err(ClientError::ValidationError(format!(
                "Join link must point to one of: {}",
                ALLOWED_JOIN_HOSTS.join(", ")
            )))
        }
    };

    // The parsed URL always has a path, so check the link as written.
    if !link.starts_with(&format!("https://{}/", host)) {
        return Err(ClientError::ValidationError(
            "Join link must include a meeting path".to_string(),
        ));
    }
    Ok(url)
}
