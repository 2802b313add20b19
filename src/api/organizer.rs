use reqwest::Response;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::models::{
    Activity, ActivityUpdate, CreatedActivity, MessageResponse, NewActivity, OrganizerProfile,
    ProfileUpdate,
};
use super::{ensure_success, read_json};
use crate::config::join_endpoint;
use crate::error::{ClientError, Result};
use crate::gateway::{ApiRequest, AuthGateway};

/// Organizer dashboard calls. All of them need a logged-in session.
#[derive(Clone)]
pub struct OrganizerClient {
    gateway: Arc<AuthGateway>,
    base_url: Url,
}

impl OrganizerClient {
    pub fn new(gateway: Arc<AuthGateway>, base_url: Url) -> Self {
        Self { gateway, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(join_endpoint(&self.base_url, path)?)
    }

    async fn send(&self, request: ApiRequest) -> Result<Response> {
        self.gateway.request(&request).await?.into_response()
    }

    pub async fn my_activities(&self) -> Result<Vec<Activity>> {
        let request = ApiRequest::get(self.endpoint("/activities/mine")?);
        read_json(self.send(request).await?).await
    }

    pub async fn create_activity(&self, activity: &NewActivity) -> Result<CreatedActivity> {
        activity.validate()?;
        let request = ApiRequest::post(self.endpoint("/activities")?).json(activity)?;
        let created: CreatedActivity = read_json(self.send(request).await?).await?;
        info!("Created activity {} ({})", created.id, activity.title);
        Ok(created)
    }

    pub async fn update_activity(&self, id: i64, update: &ActivityUpdate) -> Result<MessageResponse> {
        update.validate()?;
        let request =
            ApiRequest::put(self.endpoint(&format!("/activities/{}", id))?).json(update)?;
        let message = read_json(self.send(request).await?).await?;
        info!("Updated activity {}", id);
        Ok(message)
    }

    pub async fn delete_activity(&self, id: i64) -> Result<()> {
        let request = ApiRequest::delete(self.endpoint(&format!("/activities/{}", id))?);
        ensure_success(self.send(request).await?).await?;
        info!("Deleted activity {}", id);
        Ok(())
    }

    pub async fn profile(&self) -> Result<OrganizerProfile> {
        let request = ApiRequest::get(self.endpoint("/organizer/profile")?);
        read_json(self.send(request).await?).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<MessageResponse> {
        if update.is_empty() {
            return Err(ClientError::ValidationError("Nothing to update".into()));
        }
        let request = ApiRequest::put(self.endpoint("/organizer/profile")?).json(update)?;
        read_json(self.send(request).await?).await
    }
}
