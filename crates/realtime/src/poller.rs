//! HTTP fallback: fetches a group's visible decisions.

use platepick_core::decision::Decision;
use platepick_core::types::DbId;
use serde::Deserialize;

use crate::error::RealtimeError;

/// Response envelope used by the server for every JSON body.
#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// Fetches the polling view for groups on one server.
#[derive(Debug, Clone)]
pub struct DecisionPoller {
    client: reqwest::Client,
    api_url: String,
}

impl DecisionPoller {
    /// * `api_url` - HTTP base URL without a trailing slash.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// `GET /api/v1/groups/{group_id}/decisions`.
    pub async fn fetch_group(&self, group_id: DbId) -> Result<Vec<Decision>, RealtimeError> {
        let url = format!("{}/api/v1/groups/{group_id}/decisions", self.api_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError::PollStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: DataResponse<Vec<Decision>> = response.json().await?;
        tracing::debug!(group_id, count = envelope.data.len(), "Polled group decisions");
        Ok(envelope.data)
    }
}
