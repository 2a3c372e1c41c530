//! MediaProgress record

use serde::{Deserialize, Serialize};

use super::key::ProgressKey;
use crate::error::ProgressError;

/// Well-known `data_type` values; the field itself is an opaque string
pub mod data_type {
    pub const AUDIO: &str = "AUDIO";
    pub const VIDEO: &str = "VIDEO";
}

/// Playback progress of one user on one media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProgress {
    /// Owner of the record
    pub user_id: String,

    /// Partition discriminator, e.g. "AUDIO" or "VIDEO"
    pub data_type: String,

    /// Show, podcast or other content title
    pub title_id: String,

    /// Episode or other media unit within the title
    pub media_id: String,

    /// Playback offset in milliseconds
    #[serde(rename = "milliseconds")]
    pub milliseconds_played: i64,

    /// Unix timestamp (seconds) of the playback event
    pub event_at: i64,
}

impl MediaProgress {
    pub fn new(
        user_id: impl Into<String>,
        data_type: impl Into<String>,
        title_id: impl Into<String>,
        media_id: impl Into<String>,
        milliseconds_played: i64,
        event_at: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            data_type: data_type.into(),
            title_id: title_id.into(),
            media_id: media_id.into(),
            milliseconds_played,
            event_at,
        }
    }

    /// Build a record from a key and its two values
    pub fn from_key(key: ProgressKey, milliseconds_played: i64, event_at: i64) -> Self {
        let (user_id, data_type, title_id, media_id) = key.into_parts();
        Self {
            user_id,
            data_type,
            title_id,
            media_id,
            milliseconds_played,
            event_at,
        }
    }

    /// Validated identity of this record
    pub fn key(&self) -> Result<ProgressKey, ProgressError> {
        ProgressKey::new(&self.user_id, &self.data_type, &self.title_id, &self.media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let progress = MediaProgress::new("user_1", data_type::VIDEO, "title_1", "media_1", 1000, 1_700_000_000);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "user_1",
                "data_type": "VIDEO",
                "title_id": "title_1",
                "media_id": "media_1",
                "milliseconds": 1000,
                "event_at": 1_700_000_000,
            })
        );
    }

    #[test]
    fn test_key_round_trip() {
        let progress = MediaProgress::new("user_1", data_type::AUDIO, "pod_1", "media_4", 5, 6);
        let key = progress.key().unwrap();
        assert_eq!(key.row_key(), "user_1#AUDIO#pod_1#media_4");
        assert_eq!(MediaProgress::from_key(key, 5, 6), progress);
    }

    #[test]
    fn test_key_rejects_delimiter() {
        let progress = MediaProgress::new("user#1", data_type::AUDIO, "pod_1", "media_4", 5, 6);
        assert!(progress.key().is_err());
    }
}
