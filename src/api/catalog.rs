use tracing::debug;
use url::Url;

use super::models::{Activity, ActivityFilter};
use super::read_json;
use crate::config::join_endpoint;
use crate::error::Result;

/// Public activity catalog. No credentials are attached.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Upcoming activities matching `filter`.
    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let url = join_endpoint(&self.base_url, "/activities")?;
        let response = self
            .http
            .get(url)
            .query(&filter.query_pairs())
            .send()
            .await?;

        let activities: Vec<Activity> = read_json(response).await?;
        let total = activities.len();
        let matching: Vec<Activity> = activities
            .into_iter()
            .filter(|activity| filter.matches(activity))
            .collect();
        debug!("Catalog returned {} activities, {} after filtering", total, matching.len());
        Ok(matching)
    }

    pub async fn topics(&self) -> Result<Vec<String>> {
        let url = join_endpoint(&self.base_url, "/activities/topics")?;
        read_json(self.http.get(url).send().await?).await
    }

    pub async fn age_groups(&self) -> Result<Vec<String>> {
        let url = join_endpoint(&self.base_url, "/activities/age_groups")?;
        read_json(self.http.get(url).send().await?).await
    }

    pub async fn get(&self, id: i64) -> Result<Activity> {
        let url = join_endpoint(&self.base_url, &format!("/activities/{}", id))?;
        read_json(self.http.get(url).send().await?).await
    }
}
