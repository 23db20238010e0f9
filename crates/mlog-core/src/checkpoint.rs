//! Crash-recovery snapshots of recorder state.
//!
//! Two slots are used: [`LIVE_SESSION_KEY`] while a segment is open and
//! [`ENDED_SESSION_KEY`] between stopping and saving/discarding. Both hold
//! JSON. Decoding is best-effort: anything that fails to parse is treated as
//! absent, and new fields must carry `#[serde(default)]` so older blobs still
//! load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::{Segment, TrackPoint};
use crate::types::{Coordinate, SegmentId, SegmentKind};

/// Slot holding the in-progress recording.
pub const LIVE_SESSION_KEY: &str = "session.live";

/// Slot holding segments of a stopped but unsaved recording.
pub const ENDED_SESSION_KEY: &str = "session.ended";

/// Snapshot of an in-progress recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveCheckpoint {
    pub is_recording: bool,
    /// Start of the open segment, in epoch seconds.
    pub current_segment_start: i64,
    pub active_kind: SegmentKind,
    #[serde(default)]
    pub current_track_points: Vec<TrackPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<SegmentId>,
    /// Segments closed earlier in this recording.
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sampled_location: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_location: Option<Coordinate>,
}

impl LiveCheckpoint {
    /// Start of the open segment, or `None` for an out-of-range value.
    pub fn segment_start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.current_segment_start, 0)
    }
}

/// Snapshot of a stopped recording awaiting save or discard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedSession {
    pub segments: Vec<Segment>,
}

/// Decodes a blob, logging and returning `None` on failure.
pub(crate) fn decode<T: for<'de> Deserialize<'de>>(key: &str, bytes: &[u8]) -> Option<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding malformed checkpoint");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn minimal_checkpoint_decodes_with_defaults() {
        let json = r#"{
            "is_recording": true,
            "current_segment_start": 1767225600,
            "active_kind": "drive",
            "current_track_points": []
        }"#;
        let checkpoint: LiveCheckpoint = decode(LIVE_SESSION_KEY, json.as_bytes()).unwrap();
        assert!(checkpoint.segments.is_empty());
        assert!(checkpoint.segment_id.is_none());
        assert_eq!(
            checkpoint.segment_start(),
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn malformed_blob_decodes_to_none() {
        assert!(decode::<LiveCheckpoint>(LIVE_SESSION_KEY, b"{not json").is_none());
        assert!(decode::<EndedSession>(ENDED_SESSION_KEY, b"[]").is_none());
    }

    #[test]
    fn out_of_range_start_is_rejected() {
        let checkpoint = LiveCheckpoint {
            is_recording: true,
            current_segment_start: i64::MAX,
            active_kind: SegmentKind::Work,
            current_track_points: Vec::new(),
            segment_id: None,
            segments: Vec::new(),
            last_sampled_location: None,
            last_known_location: None,
        };
        assert!(checkpoint.segment_start().is_none());
    }
}
