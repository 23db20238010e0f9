//! Work-day records built from a finished recording.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::{Segment, TrackPoint};
use crate::types::SegmentKind;

/// Note attached to every record produced by a live recording.
pub const LIVE_RECORDING_NOTE: &str = "Recorded live";

/// Day type of records produced by a live recording.
pub const WORK_DAY_TYPE: &str = "work";

/// One reportable day of driving and work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDayRecord {
    pub date: NaiveDate,
    /// Sum of per-segment durations rounded up to half hours.
    pub driving_hours: f64,
    pub working_hours: f64,
    pub kilometers: f64,
    pub city: String,
    /// `None` when no drive segment captured any point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_points: Option<Vec<TrackPoint>>,
    pub note: String,
    pub completed: bool,
    pub day_type: String,
}

impl WorkDayRecord {
    /// Aggregates closed segments into the record filed under `date`.
    ///
    /// `now` only matters for segments that are still open, which callers
    /// should not pass.
    pub fn from_segments(segments: &[Segment], date: NaiveDate, now: DateTime<Utc>) -> Self {
        let drives = || segments.iter().filter(|s| s.kind == SegmentKind::Drive);
        let works = || segments.iter().filter(|s| s.kind == SegmentKind::Work);

        let driving_hours: f64 = drives().map(|s| s.rounded_duration_hours(now)).sum();
        let working_hours: f64 = works().map(|s| s.rounded_duration_hours(now)).sum();
        let kilometers: f64 = drives().map(|s| s.kilometers).sum();

        let points: Vec<TrackPoint> = drives()
            .flat_map(|s| s.track_points.iter().copied())
            .collect();

        let city = works()
            .next()
            .or_else(|| drives().next())
            .map(|s| s.place_name.clone())
            .unwrap_or_default();

        Self {
            date,
            driving_hours,
            working_hours,
            kilometers,
            city,
            track_points: if points.is_empty() {
                None
            } else {
                Some(points)
            },
            note: LIVE_RECORDING_NOTE.to_string(),
            completed: false,
            day_type: WORK_DAY_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::segment::DRIVE_PLACE_LABEL;
    use crate::types::{Coordinate, SegmentId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 14, 6, 30, 0).unwrap()
    }

    fn closed(kind: SegmentKind, start: DateTime<Utc>, minutes: i64) -> Segment {
        let mut segment = Segment::open(SegmentId::new(), kind, start);
        segment.end_time = Some(start + Duration::minutes(minutes));
        segment
    }

    #[test]
    fn empty_segments_give_empty_city_and_no_track() {
        let day = t0().date_naive();
        let record = WorkDayRecord::from_segments(&[], day, t0());
        assert_eq!(record.city, "");
        assert!(record.track_points.is_none());
        assert!(record.driving_hours.abs() < f64::EPSILON);
        assert_eq!(record.day_type, WORK_DAY_TYPE);
        assert!(!record.completed);
    }

    #[test]
    fn drive_only_uses_drive_label() {
        let day = t0().date_naive();
        let mut drive = closed(SegmentKind::Drive, t0(), 20);
        drive.kilometers = 12.5;
        drive.track_points.push(TrackPoint::new(
            Coordinate::new(49.0, 14.0).unwrap(),
            t0(),
        ));
        let record = WorkDayRecord::from_segments(&[drive], day, t0());
        assert_eq!(record.city, DRIVE_PLACE_LABEL);
        assert!((record.kilometers - 12.5).abs() < 1e-9);
        assert!((record.driving_hours - 0.5).abs() < 1e-9);
        assert_eq!(record.track_points.map(|p| p.len()), Some(1));
    }

    #[test]
    fn each_segment_is_rounded_before_summing() {
        let day = t0().date_naive();
        let first = closed(SegmentKind::Work, t0(), 10);
        let mut second = closed(SegmentKind::Work, t0() + Duration::minutes(10), 10);
        second.place_name = "Klatovy".to_string();
        let record = WorkDayRecord::from_segments(&[first, second], day, t0());
        assert!((record.working_hours - 1.0).abs() < 1e-9);
        assert_eq!(record.city, "Workplace");
    }
}
