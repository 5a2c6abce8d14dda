//! Client for the upstream timeline/location API.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::model::{Location, TimelineItem};

/// The upstream calls a notification may trigger, on behalf of one user.
#[async_trait]
pub trait Mirror: Send + Sync {
    async fn get_timeline_item(&self, id: &str) -> Result<TimelineItem, UpstreamError>;

    async fn get_location(&self, id: &str) -> Result<Location, UpstreamError>;

    async fn insert_timeline_item(&self, item: &TimelineItem) -> Result<TimelineItem, UpstreamError>;
}

pub fn build_http_client(timeout_seconds: u64) -> Result<Client, UpstreamError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?;
    Ok(client)
}

pub struct MirrorClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MirrorClient {
    pub fn new(client: Client, base_url: &str, access_token: &str) -> Result<Self, UpstreamError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(UpstreamError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl Mirror for MirrorClient {
    async fn get_timeline_item(&self, id: &str) -> Result<TimelineItem, UpstreamError> {
        tracing::debug!("fetching timeline item {}", id);
        let response = self
            .client
            .get(self.url(&format!("timeline/{}", urlencoding::encode(id))))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn get_location(&self, id: &str) -> Result<Location, UpstreamError> {
        tracing::debug!("fetching location {}", id);
        let response = self
            .client
            .get(self.url(&format!("locations/{}", urlencoding::encode(id))))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn insert_timeline_item(&self, item: &TimelineItem) -> Result<TimelineItem, UpstreamError> {
        let response = self
            .client
            .post(self.url("timeline"))
            .bearer_auth(&self.access_token)
            .json(item)
            .send()
            .await?;
        Self::read_json(response).await
    }
}
