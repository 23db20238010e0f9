//! Recorded segments and their derived durations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::types::{Coordinate, SegmentId, SegmentKind};

/// Place label for work segments until reverse geocoding answers.
pub const WORK_PLACE_FALLBACK: &str = "Workplace";

/// Place label carried by every drive segment.
pub const DRIVE_PLACE_LABEL: &str = "Driving";

const MS_PER_HOUR: f64 = 3_600_000.0;

/// One GPS sample captured while driving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl TrackPoint {
    #[must_use]
    pub const fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
            timestamp,
        }
    }

    /// The point's position, or `None` if the stored values are out of range.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude, self.longitude).ok()
    }
}

/// Path length over track points in kilometers.
pub fn track_length_km(points: &[TrackPoint]) -> f64 {
    geo::path_length_km(points.iter().filter_map(TrackPoint::coordinate))
}

/// Rounds an hour value up to the next half hour.
///
/// This is the billing rule for saved work days; live totals stay unrounded.
pub fn round_up_to_half_hour(hours: f64) -> f64 {
    if hours <= 0.0 {
        return 0.0;
    }
    let minutes = hours * 60.0;
    (minutes / 30.0).ceil() * 30.0 / 60.0
}

/// A contiguous span of one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub start_time: DateTime<Utc>,
    /// `None` only for the segment currently being recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub track_points: Vec<TrackPoint>,
    #[serde(default)]
    pub kilometers: f64,
    pub place_name: String,
}

impl Segment {
    /// Opens a new segment of `kind` at `start_time`.
    pub fn open(id: SegmentId, kind: SegmentKind, start_time: DateTime<Utc>) -> Self {
        let place_name = match kind {
            SegmentKind::Drive => DRIVE_PLACE_LABEL,
            SegmentKind::Work => WORK_PLACE_FALLBACK,
        };
        Self {
            id,
            kind,
            start_time,
            end_time: None,
            track_points: Vec::new(),
            kilometers: 0.0,
            place_name: place_name.to_string(),
        }
    }

    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed hours, measured to `now` while the segment is open.
    pub fn duration_hours(&self, now: DateTime<Utc>) -> f64 {
        let end = self.end_time.unwrap_or(now);
        #[expect(
            clippy::cast_precision_loss,
            reason = "segment durations are far below 2^52 ms"
        )]
        let ms = (end - self.start_time).num_milliseconds().max(0) as f64;
        ms / MS_PER_HOUR
    }

    pub fn rounded_duration_hours(&self, now: DateTime<Utc>) -> f64 {
        round_up_to_half_hour(self.duration_hours(now))
    }
}
