//! History provider API response models

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// A single listen event fetched from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listen {
    /// Provider-scoped track reference
    pub track_ref: String,
    /// When the listen happened
    pub listened_at: DateTime<Utc>,
    /// Originating source (client name reported by the provider)
    pub source: String,
    /// Remaining per-listen metadata, kept opaque
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// Internal response types for deserialization.
// The provider wraps everything in a `listens` array of loosely-typed
// objects; only the fields the pipeline needs are pulled out here.

#[derive(Debug, Deserialize)]
pub(crate) struct ListensResponse {
    pub listens: Vec<RawListenEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawListenEntry {
    pub listened_at: i64,
    pub track_metadata: RawTrackMetadata,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrackMetadata {
    pub track_ref: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawListenEntry> for Listen {
    type Error = HistoryError;

    /// An out-of-range timestamp is a malformed payload, never silently
    /// replaced: a fabricated timestamp would poison the sync cursor
    fn try_from(raw: RawListenEntry) -> Result<Self, Self::Error> {
        let listened_at = Utc.timestamp_opt(raw.listened_at, 0).single().ok_or_else(|| {
            HistoryError::MalformedListen(format!(
                "listened_at out of range: {}",
                raw.listened_at
            ))
        })?;

        Ok(Self {
            track_ref: raw.track_metadata.track_ref,
            listened_at,
            source: raw.source.unwrap_or_else(|| "unknown".to_string()),
            metadata: raw.track_metadata.extra,
        })
    }
}
