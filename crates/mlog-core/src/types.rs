//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Latitude outside \[-90, 90\] or NaN.
    #[error("latitude must be between -90 and 90, got {value}")]
    LatitudeOutOfRange { value: f64 },

    /// Longitude outside \[-180, 180\] or NaN.
    #[error("longitude must be between -180 and 180, got {value}")]
    LongitudeOutOfRange { value: f64 },

    /// Invalid segment kind value.
    #[error("invalid segment kind: {value}")]
    InvalidSegmentKind { value: String },
}

/// The activity a segment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Driving between customers; carries a GPS trace.
    #[default]
    Drive,
    /// Working on site; carries a place name only.
    Work,
}

impl SegmentKind {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Work => "work",
        }
    }

    /// The kind a switch toggles to when none is given.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Drive => Self::Work,
            Self::Work => Self::Drive,
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SegmentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drive" => Ok(Self::Drive),
            "work" => Ok(Self::Work),
            _ => Err(ValidationError::InvalidSegmentKind {
                value: s.to_string(),
            }),
        }
    }
}

/// A stable segment identifier.
///
/// Place-name write-backs address segments by this id rather than by
/// position, so a lookup that completes after the list changed cannot
/// land on the wrong segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SegmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A validated WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate after range validation.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if latitude.is_nan() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange { value: latitude });
        }
        if longitude.is_nan() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_kind_roundtrips_through_str() {
        for kind in [SegmentKind::Drive, SegmentKind::Work] {
            let parsed: SegmentKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("lunch".parse::<SegmentKind>().is_err());
    }

    #[test]
    fn segment_kind_other_toggles() {
        assert_eq!(SegmentKind::Drive.other(), SegmentKind::Work);
        assert_eq!(SegmentKind::Work.other(), SegmentKind::Drive);
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(49.74, 13.37).is_ok());
        assert!(matches!(
            Coordinate::new(91.0, 0.0),
            Err(ValidationError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5),
            Err(ValidationError::LongitudeOutOfRange { .. })
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn coordinate_deserialization_validates() {
        let result: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude":120.0,"longitude":0.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn segment_ids_are_unique() {
        assert_ne!(SegmentId::new(), SegmentId::new());
    }
}
