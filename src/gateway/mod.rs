//! Authenticated request gateway.
//!
//! [`AuthGateway::request`] sends a request with the stored access token as a
//! bearer credential. On a 401 it rotates the access token once through the
//! refresh endpoint and reissues the same request a single time. When the
//! session cannot be recovered it hands back [`GatewayOutcome::LoginRequired`]
//! and leaves navigation to the caller.

mod refresh;

pub use refresh::RefreshOutcome;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{ClientError, Result};
use crate::session::SessionManager;

/// A request that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// The caller's headers with `Authorization` replaced by `token`.
    fn headers_with_bearer(&self, token: &str) -> Result<HeaderMap> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ClientError::InvalidCredential("token is not a valid header value".into())
        })?;
        bearer.set_sensitive(true);

        let mut headers = self.headers.clone();
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

/// Why the session could not be used or recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginReason {
    MissingAccessToken,
    MissingRefreshToken,
    RefreshRejected(u16),
    RefreshUnreachable,
    RefreshMalformed,
    /// Another request already ended the session while this one waited.
    SessionCleared,
}

impl fmt::Display for LoginReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginReason::MissingAccessToken => write!(f, "no access token stored"),
            LoginReason::MissingRefreshToken => write!(f, "no refresh token stored"),
            LoginReason::RefreshRejected(status) => {
                write!(f, "refresh endpoint rejected the token (status {})", status)
            }
            LoginReason::RefreshUnreachable => write!(f, "refresh endpoint unreachable"),
            LoginReason::RefreshMalformed => {
                write!(f, "refresh response carried no access token")
            }
            LoginReason::SessionCleared => write!(f, "session ended by a concurrent request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub reason: LoginReason,
    /// The login entry point the caller should navigate to.
    pub location: String,
}

#[derive(Debug)]
pub enum GatewayOutcome {
    Response(Response),
    LoginRequired(LoginRedirect),
}

impl GatewayOutcome {
    pub fn is_login_required(&self) -> bool {
        matches!(self, GatewayOutcome::LoginRequired(_))
    }

    /// Unwraps the response, turning a login redirect into an error.
    pub fn into_response(self) -> Result<Response> {
        match self {
            GatewayOutcome::Response(response) => Ok(response),
            GatewayOutcome::LoginRequired(redirect) => {
                Err(ClientError::LoginRequired(redirect.reason))
            }
        }
    }
}

pub struct AuthGateway {
    http: reqwest::Client,
    session: SessionManager,
    refresh_url: Url,
    login_route: String,
    coalesce_refresh: bool,
    refresh_lock: Mutex<()>,
}

impl AuthGateway {
    pub fn new(http: reqwest::Client, session: SessionManager, refresh_url: Url) -> Self {
        Self {
            http,
            session,
            refresh_url,
            login_route: "/login".to_string(),
            coalesce_refresh: true,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(
        settings: &Settings,
        http: reqwest::Client,
        session: SessionManager,
    ) -> Result<Self> {
        Ok(Self::new(http, session, settings.api.refresh_url()?)
            .with_login_route(&settings.auth.login_route)
            .with_coalesced_refresh(settings.auth.coalesce_refresh))
    }

    pub fn with_login_route(mut self, route: &str) -> Self {
        self.login_route = route.to_string();
        self
    }

    /// When enabled, concurrent 401s share one refresh call instead of each
    /// spending the refresh token.
    pub fn with_coalesced_refresh(mut self, enabled: bool) -> Self {
        self.coalesce_refresh = enabled;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub async fn request(&self, request: &ApiRequest) -> Result<GatewayOutcome> {
        let Some(access_token) = self.session.access_token().await? else {
            warn!(
                "No access token stored, {} {} needs a login",
                request.method, request.url
            );
            return Ok(self.login_required(LoginReason::MissingAccessToken));
        };

        let response = self.send(request, &access_token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(GatewayOutcome::Response(response));
        }

        info!(
            "Access token rejected for {} {}, refreshing",
            request.method, request.url
        );

        match self.rotate(&access_token).await? {
            RefreshOutcome::Refreshed(token) => {
                let retried = self.send(request, &token).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    warn!(
                        "{} {} still unauthorized after token refresh",
                        request.method, request.url
                    );
                }
                Ok(GatewayOutcome::Response(retried))
            }
            RefreshOutcome::Failed(reason) => Ok(self.login_required(reason)),
        }
    }

    async fn send(&self, request: &ApiRequest, token: &str) -> Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers_with_bearer(token)?);

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        debug!(
            "{} {} -> {}",
            request.method,
            request.url,
            response.status()
        );
        Ok(response)
    }

    /// Obtains a replacement for `stale`, refreshing at most once per caller.
    async fn rotate(&self, stale: &str) -> Result<RefreshOutcome> {
        if !self.coalesce_refresh {
            return self.refresh().await;
        }

        let _guard = self.refresh_lock.lock().await;
        match self.session.access_token().await? {
            Some(current) if current != stale => {
                debug!("Access token already rotated by a concurrent request");
                Ok(RefreshOutcome::Refreshed(current))
            }
            Some(_) => self.refresh().await,
            None => Ok(RefreshOutcome::Failed(LoginReason::SessionCleared)),
        }
    }

    fn login_required(&self, reason: LoginReason) -> GatewayOutcome {
        GatewayOutcome::LoginRequired(LoginRedirect {
            reason,
            location: self.login_route.clone(),
        })
    }
}
