use tracing::{info, warn};
use url::Url;

use super::models::LoginResponse;
use super::read_json;
use crate::error::{ClientError, Result};
use crate::session::{SessionCredentials, SessionManager};

/// Login and sign-out. Tokens are issued by the backend; this only stores them.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    login_url: Url,
    session: SessionManager,
}

impl AuthClient {
    pub fn new(http: reqwest::Client, login_url: Url, session: SessionManager) -> Self {
        Self {
            http,
            login_url,
            session,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionCredentials> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::ValidationError(
                "Username and password are required".into(),
            ));
        }

        let response = self
            .http
            .get(self.login_url.clone())
            .query(&[("username", username), ("password", password)])
            .send()
            .await?;

        let login: LoginResponse = match read_json(response).await {
            Ok(login) => login,
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                return Err(e);
            }
        };

        let credentials = SessionCredentials {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            username: login.username,
        };
        self.session.begin(&credentials).await?;
        info!("Logged in as {}", credentials.username);
        Ok(credentials)
    }

    /// Explicit sign-out; only local state is touched.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await
    }

    pub async fn current_user(&self) -> Result<Option<String>> {
        if !self.session.is_logged_in().await? {
            return Ok(None);
        }
        self.session.username().await
    }
}
