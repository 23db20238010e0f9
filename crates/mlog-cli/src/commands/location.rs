//! Location feeding: one-shot samples and a JSON-lines stream.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use mlog_core::{Coordinate, LocationError, LocationSample, LocationSource, pump_locations};

use crate::Config;
use crate::session::with_recorder;

pub fn run<W: Write>(writer: &mut W, config: &Config, lat: f64, lon: f64) -> Result<()> {
    let coordinate = Coordinate::new(lat, lon).context("invalid coordinate")?;
    let (accepted, recording) = with_recorder(config, |recorder| {
        let accepted = recorder.ingest_location(coordinate);
        Ok((accepted, recorder.is_recording()))
    })?;

    if accepted {
        writeln!(writer, "Track point added at {coordinate}.")?;
    } else if recording {
        writeln!(writer, "Location noted at {coordinate}.")?;
    } else {
        writeln!(writer, "Not recording; location ignored.")?;
    }
    Ok(())
}

/// Reads samples from `reader` until EOF or the recording ends.
///
/// Each sample is applied under the lock on its own, so other commands can
/// switch or end the recording while a track is being fed.
pub fn track<R: BufRead, W: Write>(reader: R, writer: &mut W, config: &Config) -> Result<()> {
    let mut source = LineSource::new(reader);
    let mut failure = None;

    let stats = pump_locations(&mut source, |coordinate| {
        let outcome = with_recorder(config, |recorder| {
            let accepted = recorder.ingest_location(coordinate);
            Ok(recorder.is_recording().then_some(accepted))
        });
        match outcome {
            Ok(next) => next,
            Err(e) => {
                failure = Some(e);
                None
            }
        }
    })?;

    if let Some(e) = failure {
        return Err(e.context("failed to record location"));
    }
    writeln!(
        writer,
        "Received {} sample(s): {} track point(s), {} invalid.",
        stats.received, stats.accepted, stats.invalid
    )?;
    Ok(())
}

/// A location source reading one JSON sample per line.
///
/// Blank lines are skipped; unparseable lines are logged and skipped.
pub struct LineSource<R> {
    lines: std::io::Lines<R>,
    started: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            started: false,
        }
    }
}

impl<R: BufRead> LocationSource for LineSource<R> {
    fn start(&mut self) -> Result<(), LocationError> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn next_sample(&mut self) -> Option<LocationSample> {
        if !self.started {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read location input");
                    return None;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LocationSample>(line) {
                Ok(sample) => return Some(sample),
                Err(e) => tracing::warn!(error = %e, line, "skipping unparseable location line"),
            }
        }
    }
}
