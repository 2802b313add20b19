pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

use std::sync::Arc;
use url::Url;

pub use error::{ApiError, ClientError, Result, StorageError};
pub use config::Settings;

pub use api::{AuthClient, CatalogClient, OrganizerClient};
pub use gateway::{ApiRequest, AuthGateway, GatewayOutcome, LoginReason, LoginRedirect};
pub use session::{SessionCredentials, SessionManager, SessionStore};

/// Shared client state: configuration, the session and one HTTP connection pool.
#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<Settings>,
    pub session: SessionManager,
    pub gateway: Arc<AuthGateway>,
    http: reqwest::Client,
    base_url: Url,
}

impl ClientState {
    pub fn new(config: Settings) -> Result<Self> {
        let session = SessionManager::from_config(&config.session);
        Self::with_session(config, session)
    }

    pub fn with_session(config: Settings, session: SessionManager) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("brighttimes-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = config.api.base()?;
        let gateway = AuthGateway::from_settings(&config, http.clone(), session.clone())?;

        Ok(Self {
            config: Arc::new(config),
            session,
            gateway: Arc::new(gateway),
            http,
            base_url,
        })
    }

    pub fn catalog(&self) -> CatalogClient {
        CatalogClient::new(self.http.clone(), self.base_url.clone())
    }

    pub fn organizer(&self) -> OrganizerClient {
        OrganizerClient::new(self.gateway.clone(), self.base_url.clone())
    }

    pub fn auth(&self) -> Result<AuthClient> {
        Ok(AuthClient::new(
            self.http.clone(),
            self.config.api.login_url()?,
            self.session.clone(),
        ))
    }
}
