//! Wiremock helpers for the history provider API

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock history provider speaking the listens endpoint contract
pub struct MockHistoryServer {
    pub server: MockServer,
}

impl MockHistoryServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Serve `(listened_at, track_ref)` entries for one subject
    pub async fn mock_listens(&self, subject: &str, entries: &[(i64, &str)]) {
        Mock::given(method("GET"))
            .and(path(format!("/1/user/{subject}/listens")))
            .respond_with(ResponseTemplate::new(200).set_body_json(listens_body(entries)))
            .mount(&self.server)
            .await;
    }

    /// Serve a fixed error status for every request
    pub async fn mock_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

pub fn listens_body(entries: &[(i64, &str)]) -> serde_json::Value {
    json!({
        "listens": entries
            .iter()
            .map(|(ts, track)| json!({
                "listened_at": ts,
                "track_metadata": {
                    "track_ref": track,
                    "track_name": format!("Track {track}")
                },
                "source": "spotify"
            }))
            .collect::<Vec<_>>()
    })
}
