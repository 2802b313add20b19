//! Client-side session state.
//!
//! The access token, refresh token and display name live in a key-value store
//! behind [`SessionStore`]. Everything else in the crate goes through
//! [`SessionManager`] instead of touching the store directly.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{SessionBackend, SessionConfig};
use crate::error::{Result, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USERNAME_KEY: &str = "username";

/// Persistent key-value storage for session values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError>;
    async fn remove(&self, key: &str) -> std::result::Result<(), StorageError>;
}

/// Credentials handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        match config.backend {
            SessionBackend::File => Self::new(Arc::new(FileStore::new(&config.path))),
            SessionBackend::Memory => Self::in_memory(),
        }
    }

    // Empty strings count as missing.
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key).await?.filter(|value| !value.is_empty()))
    }

    pub async fn access_token(&self) -> Result<Option<String>> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    pub async fn username(&self) -> Result<Option<String>> {
        self.read(USERNAME_KEY).await
    }

    pub async fn is_logged_in(&self) -> Result<bool> {
        Ok(self.access_token().await?.is_some())
    }

    pub async fn set_access_token(&self, token: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token).await?;
        debug!("Stored rotated access token");
        Ok(())
    }

    pub async fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.store.set(REFRESH_TOKEN_KEY, token).await?;
        debug!("Stored rotated refresh token");
        Ok(())
    }

    /// Persists the credentials from a login, replacing whatever was stored.
    pub async fn begin(&self, credentials: &SessionCredentials) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &credentials.access_token).await?;
        match &credentials.refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, token).await?,
            None => self.store.remove(REFRESH_TOKEN_KEY).await?,
        }
        self.store.set(USERNAME_KEY, &credentials.username).await?;
        info!("Session started for {}", credentials.username);
        Ok(())
    }

    /// Removes all three session values.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        self.store.remove(REFRESH_TOKEN_KEY).await?;
        self.store.remove(USERNAME_KEY).await?;
        info!("Session cleared");
        Ok(())
    }
}
