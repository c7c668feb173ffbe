use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::storage::entities::Category;

use super::aggregate::Observation;

/// Wire format of one forwarded observation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncPayload<'a> {
    domain: &'a str,
    seconds: u64,
    category: Category,
    timestamp: DateTime<Utc>,
    extension_id: &'a str,
}

/// Best-effort mirror of observations to an external collector. Pushes
/// happen on detached tasks so a slow or dead endpoint can never delay the
/// aggregator's persisted write; failures are logged and dropped.
pub struct SyncForwarder {
    client: reqwest::Client,
    client_id: String,
}

impl SyncForwarder {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
        }
    }

    pub fn forward(&self, server_url: &str, observation: &Observation) {
        let url = format!("{}/api/track", server_url.trim_end_matches('/'));
        let request = self.client.post(url).json(&SyncPayload {
            domain: &observation.domain,
            seconds: observation.seconds,
            category: observation.category,
            timestamp: observation.timestamp,
            extension_id: &self.client_id,
        });

        tokio::spawn(async move {
            if let Err(e) = request.send().await {
                debug!("Sync push failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_matches_wire_format() {
        let payload = SyncPayload {
            domain: "github.com",
            seconds: 90,
            category: Category::Productive,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            extension_id: "webtime/0.1.0",
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "domain": "github.com",
                "seconds": 90,
                "category": "productive",
                "timestamp": "2024-03-01T09:00:00Z",
                "extensionId": "webtime/0.1.0",
            })
        );
    }
}
