use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::{AuthGateway, LoginReason};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    /// The session is over; credentials have been cleared.
    Failed(LoginReason),
}

impl AuthGateway {
    /// Trades the stored refresh token for a new access token.
    ///
    /// Issues at most one request and talks to the refresh endpoint directly,
    /// never through [`AuthGateway::request`]. Every failure clears the session.
    pub(super) async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(refresh_token) = self.session.refresh_token().await? else {
            warn!("No refresh token stored, ending session");
            return self.end_session(LoginReason::MissingRefreshToken).await;
        };

        let response = match self
            .http
            .post(self.refresh_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&refresh_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Refresh request to {} failed: {}", self.refresh_url, e);
                return self.end_session(LoginReason::RefreshUnreachable).await;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Refresh endpoint answered {}, ending session", status);
            return self
                .end_session(LoginReason::RefreshRejected(status.as_u16()))
                .await;
        }

        let body = match response.json::<RefreshResponse>().await {
            Ok(body) => body,
            Err(e) => {
                error!("Unreadable refresh response: {}", e);
                return self.end_session(LoginReason::RefreshMalformed).await;
            }
        };

        let Some(access_token) = body.access_token.filter(|token| !token.is_empty()) else {
            warn!("Refresh response carried no access token, ending session");
            return self.end_session(LoginReason::RefreshMalformed).await;
        };

        self.session.set_access_token(&access_token).await?;
        if let Some(rotated) = body.refresh_token.filter(|token| !token.is_empty()) {
            self.session.set_refresh_token(&rotated).await?;
        }

        info!("Access token refreshed");
        Ok(RefreshOutcome::Refreshed(access_token))
    }

    async fn end_session(&self, reason: LoginReason) -> Result<RefreshOutcome> {
        self.session.clear().await?;
        Ok(RefreshOutcome::Failed(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionCredentials, SessionManager};
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway_for(server_uri: &str, refresh_token: Option<&str>) -> AuthGateway {
        let session = SessionManager::in_memory();
        session
            .begin(&SessionCredentials {
                access_token: "A1".into(),
                refresh_token: refresh_token.map(str::to_string),
                username: "sarah".into(),
            })
            .await
            .unwrap();

        let refresh_url = Url::parse(&format!("{}/auth/refresh", server_uri)).unwrap();
        AuthGateway::new(reqwest::Client::new(), session, refresh_url)
    }

    #[tokio::test]
    async fn test_refresh_stores_new_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(header("Authorization", "Bearer R1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "A2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri(), Some("R1")).await;
        let outcome = gateway.refresh().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed("A2".into()));
        let session = gateway.session();
        assert_eq!(session.access_token().await.unwrap().as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().await.unwrap().as_deref(), Some("R1"));
        assert_eq!(session.username().await.unwrap().as_deref(), Some("sarah"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_rotated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "A2", "refresh_token": "R2"}),
            ))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri(), Some("R1")).await;
        gateway.refresh().await.unwrap();

        assert_eq!(
            gateway.session().refresh_token().await.unwrap().as_deref(),
            Some("R2")
        );
    }

    #[tokio::test]
    async fn test_refresh_without_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri(), None).await;
        let outcome = gateway.refresh().await.unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Failed(LoginReason::MissingRefreshToken)
        );
        assert!(!gateway.session().is_logged_in().await.unwrap());
        assert_eq!(gateway.session().username().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refresh_with_empty_body_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server.uri(), Some("R1")).await;
        let outcome = gateway.refresh().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Failed(LoginReason::RefreshMalformed));
        assert_eq!(gateway.session().refresh_token().await.unwrap(), None);
    }
}
