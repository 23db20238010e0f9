//! Location sources feeding the recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::recorder::Recorder;
use crate::store::CheckpointStore;
use crate::types::{Coordinate, ValidationError};

#[derive(Debug, Error)]
pub enum LocationError {
    /// The platform refused access to location services.
    #[error("location permission denied")]
    PermissionDenied,
    /// The source could not be started.
    #[error("location source unavailable: {0}")]
    Unavailable(String),
}

/// One raw position report from a location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationSample {
    pub fn coordinate(&self) -> Result<Coordinate, ValidationError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A stream of position reports at a cadence the source decides.
///
/// `next_sample` blocks until a sample arrives and returns `None` once the
/// source is exhausted or stopped.
pub trait LocationSource {
    fn start(&mut self) -> Result<(), LocationError>;
    fn stop(&mut self);
    fn next_sample(&mut self) -> Option<LocationSample>;
}

/// Counters from one [`pump_locations`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    pub received: usize,
    pub accepted: usize,
    pub invalid: usize,
}

/// Starts `source` and hands each valid coordinate to `ingest`.
///
/// `ingest` returns `Some(accepted)` to keep going or `None` once recording
/// has ended, at which point the source is stopped. The source is also
/// stopped when it runs dry.
pub fn pump_locations<L, F>(source: &mut L, mut ingest: F) -> Result<PumpStats, LocationError>
where
    L: LocationSource + ?Sized,
    F: FnMut(Coordinate) -> Option<bool>,
{
    source.start()?;
    let mut stats = PumpStats::default();

    while let Some(sample) = source.next_sample() {
        stats.received += 1;
        let coordinate = match sample.coordinate() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "skipping invalid location sample");
                stats.invalid += 1;
                continue;
            }
        };
        match ingest(coordinate) {
            Some(true) => stats.accepted += 1,
            Some(false) => {}
            None => break,
        }
    }

    source.stop();
    tracing::debug!(?stats, "location source stopped");
    Ok(stats)
}

impl<S: CheckpointStore, C: Clock> Recorder<S, C> {
    /// Drives this recorder from `source` while it is recording.
    pub fn pump<L: LocationSource + ?Sized>(
        &mut self,
        source: &mut L,
    ) -> Result<PumpStats, LocationError> {
        if !self.is_recording() {
            return Ok(PumpStats::default());
        }
        pump_locations(source, |coordinate| {
            let accepted = self.ingest_location(coordinate);
            self.is_recording().then_some(accepted)
        })
    }
}
