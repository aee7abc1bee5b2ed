use std::time::Duration;

use platepick_core::types::DbId;

use crate::reconnect::ReconnectConfig;

/// Default interval between polls while the subscription is down.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where the feed connects and how it recovers.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket base URL, e.g. `ws://localhost:3000`.
    pub ws_url: String,
    /// HTTP base URL, e.g. `http://localhost:3000`.
    pub api_url: String,
    /// How often the group list is fetched while not live.
    pub poll_interval: Duration,
    pub reconnect: ReconnectConfig,
}

impl RealtimeConfig {
    /// Config with the default poll interval and backoff.
    ///
    /// Trailing slashes are trimmed so paths can be appended directly.
    pub fn new(ws_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            ws_url: trim_base(ws_url.into()),
            api_url: trim_base(api_url.into()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Subscription endpoint for one group.
    pub fn group_ws_url(&self, group_id: DbId) -> String {
        format!("{}/api/v1/ws/groups/{group_id}", self.ws_url)
    }

    /// Polling endpoint for one group's visible decisions.
    pub fn group_decisions_url(&self, group_id: DbId) -> String {
        format!("{}/api/v1/groups/{group_id}/decisions", self.api_url)
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
