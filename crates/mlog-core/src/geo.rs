//! Great-circle distance helpers.

use crate::types::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = (b.latitude() - a.latitude()).to_radians();
    let dlon = (b.longitude() - a.longitude()).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum of consecutive pairwise distances along a path, in kilometers.
///
/// Paths with fewer than two points have zero length.
pub fn path_length_km<I>(points: I) -> f64
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut meters = 0.0;
    let mut previous: Option<Coordinate> = None;
    for point in points {
        if let Some(prev) = previous {
            meters += distance_m(prev, point);
        }
        previous = Some(point);
    }
    meters / 1000.0
}
