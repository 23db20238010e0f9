//! Status command for showing the current recording.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use mlog_core::{CheckpointStore, Clock, LiveTotals, Recorder, SegmentKind, SessionState};
use serde::Serialize;

use crate::Config;
use crate::session::with_recorder;

#[derive(Debug, Serialize)]
struct StatusJson {
    state: SessionState,
    active_kind: Option<SegmentKind>,
    segment_start: Option<DateTime<Utc>>,
    closed_segments: usize,
    current_track_points: usize,
    totals: LiveTotals,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    with_recorder(config, |recorder| {
        if !json {
            writeln!(writer, "Database: {}", config.database_path.display())?;
        }
        render_status(writer, recorder, json)
    })
}

/// Writes the recorder's state as text or JSON.
pub fn render_status<W, S, C>(writer: &mut W, recorder: &Recorder<S, C>, json: bool) -> Result<()>
where
    W: Write,
    S: CheckpointStore,
    C: Clock,
{
    let state = recorder.state();
    let totals = recorder.live_totals();

    if json {
        let status = StatusJson {
            state,
            active_kind: recorder.is_recording().then(|| recorder.active_kind()),
            segment_start: recorder.current_segment_start(),
            closed_segments: recorder.segments().len(),
            current_track_points: recorder.current_track_points().len(),
            totals,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(());
    }

    writeln!(writer, "State: {state}")?;
    if state == SessionState::Idle {
        return Ok(());
    }
    if let Some(start) = recorder.current_segment_start() {
        writeln!(
            writer,
            "Current: {} since {} ({} track point(s))",
            recorder.active_kind(),
            start.format("%H:%M:%S UTC"),
            recorder.current_track_points().len()
        )?;
    }
    writeln!(writer, "Closed segments: {}", recorder.segments().len())?;
    let now = Utc::now();
    for segment in recorder.segments() {
        writeln!(
            writer,
            "- {} {}: {:.2} h, {:.1} km",
            segment.kind,
            segment.place_name,
            segment.duration_hours(now),
            segment.kilometers
        )?;
    }
    writeln!(
        writer,
        "Totals: {:.2} h driving, {:.2} h working, {:.1} km",
        totals.driving_hours, totals.working_hours, totals.kilometers
    )?;
    Ok(())
}
