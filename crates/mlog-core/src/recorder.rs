//! The live recording session engine.
//!
//! A [`Recorder`] owns all mutable session state and exposes only intent
//! methods. It is not internally synchronized: callers must funnel every
//! mutation (transitions, location samples, place-name write-backs) through
//! one owner, e.g. a single task or a `Mutex<Recorder<_>>`.
//!
//! ```text
//!          start_recording            end_recording
//!   Idle ───────────────▶ Recording ───────────────▶ Stopped
//!    ▲                     │    ▲                     │
//!    │                     └────┘                     │
//!    │               switch_segment_type              │
//!    └────────────────────────────────────────────────┘
//!                   finalize / discard
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint::{self, ENDED_SESSION_KEY, EndedSession, LIVE_SESSION_KEY, LiveCheckpoint};
use crate::clock::{Clock, SystemClock, local_day};
use crate::geo;
use crate::record::WorkDayRecord;
use crate::segment::{Segment, TrackPoint, track_length_km};
use crate::store::{ArchivingStore, CheckpointStore, ReportSink, StoreError};
use crate::types::{Coordinate, SegmentId, SegmentKind};

/// Samples closer than this to the previous accepted one are dropped.
pub const DEFAULT_MIN_SAMPLE_DISTANCE_M: f64 = 15.0;

/// Tunables for the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    pub min_sample_distance_m: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_sample_distance_m: DEFAULT_MIN_SAMPLE_DISTANCE_M,
        }
    }
}

/// Coarse lifecycle state, derived from the recorder's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Not recording and nothing left unsaved.
    Idle,
    /// One segment is open.
    Recording,
    /// Recording ended; closed segments await save or discard.
    Stopped,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("{count} unsaved segment(s) must be saved or discarded first")]
    UnsavedSegments { count: usize },
    #[error("recording must be ended before it can be saved")]
    StillRecording,
    #[error("failed to submit work day: {0}")]
    Report(#[from] StoreError),
}

/// A reverse-geocoding request produced when a work segment closes.
///
/// Resolve it out of band and hand the answer to
/// [`Recorder::apply_place_name`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceLookup {
    pub segment_id: SegmentId,
    pub coordinate: Coordinate,
}

/// Unrounded totals including the open segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LiveTotals {
    pub driving_hours: f64,
    pub working_hours: f64,
    pub kilometers: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenSegment {
    id: SegmentId,
    start: DateTime<Utc>,
}

/// Owner of one recording session's state.
pub struct Recorder<S, C = SystemClock> {
    store: S,
    clock: C,
    config: RecorderConfig,
    is_recording: bool,
    active_kind: SegmentKind,
    segments: Vec<Segment>,
    current: Option<OpenSegment>,
    current_track_points: Vec<TrackPoint>,
    last_sampled_location: Option<Coordinate>,
    last_known_location: Option<Coordinate>,
}

impl<S: CheckpointStore> Recorder<S, SystemClock> {
    /// Creates an idle recorder on the wall clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock, RecorderConfig::default())
    }
}

impl<S: CheckpointStore, C: Clock> Recorder<S, C> {
    /// Creates an idle recorder. Nothing is read from `store` until
    /// [`Self::restore_if_checkpointed`] is called.
    pub fn with_clock(store: S, clock: C, config: RecorderConfig) -> Self {
        Self {
            store,
            clock,
            config,
            is_recording: false,
            active_kind: SegmentKind::default(),
            segments: Vec::new(),
            current: None,
            current_track_points: Vec::new(),
            last_sampled_location: None,
            last_known_location: None,
        }
    }

    /// Creates a recorder and immediately restores any checkpoint.
    pub fn restore(store: S, clock: C, config: RecorderConfig) -> Self {
        let mut recorder = Self::with_clock(store, clock, config);
        recorder.restore_if_checkpointed();
        recorder
    }

    // ========== Queries ==========

    pub const fn state(&self) -> SessionState {
        if self.is_recording {
            SessionState::Recording
        } else if self.segments.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Stopped
        }
    }

    pub const fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub const fn active_kind(&self) -> SegmentKind {
        self.active_kind
    }

    /// Closed segments in chronological order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn current_track_points(&self) -> &[TrackPoint] {
        &self.current_track_points
    }

    pub fn current_segment_start(&self) -> Option<DateTime<Utc>> {
        self.current.map(|open| open.start)
    }

    pub const fn last_known_location(&self) -> Option<Coordinate> {
        self.last_known_location
    }

    /// A view of the open segment as it would look if it stayed open.
    pub fn open_segment(&self) -> Option<Segment> {
        let open = self.current?;
        let mut segment = Segment::open(open.id, self.active_kind, open.start);
        if self.active_kind == SegmentKind::Drive {
            segment.track_points.clone_from(&self.current_track_points);
            segment.kilometers = track_length_km(&self.current_track_points);
        }
        Some(segment)
    }

    pub fn live_totals(&self) -> LiveTotals {
        let now = self.clock.now();
        let open = self.open_segment();
        let mut totals = LiveTotals::default();
        for segment in self.segments.iter().chain(open.as_ref()) {
            let hours = segment.duration_hours(now);
            match segment.kind {
                SegmentKind::Drive => {
                    totals.driving_hours += hours;
                    totals.kilometers += segment.kilometers;
                }
                SegmentKind::Work => totals.working_hours += hours,
            }
        }
        totals
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========== Transitions ==========

    /// Idle → Recording with a fresh segment of `kind`.
    pub fn start_recording(&mut self, kind: SegmentKind) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Recording => return Err(SessionError::AlreadyRecording),
            SessionState::Stopped => {
                return Err(SessionError::UnsavedSegments {
                    count: self.segments.len(),
                });
            }
            SessionState::Idle => {}
        }

        self.is_recording = true;
        self.open_segment_of(kind);
        self.write_live_checkpoint();
        tracing::info!(%kind, "recording started");
        Ok(())
    }

    /// Closes the open segment and opens one of `kind` at the same instant.
    ///
    /// Switching to the kind already open still produces two adjacent
    /// segments. A no-op when not recording.
    pub fn switch_segment_type(&mut self, kind: SegmentKind) -> Option<PlaceLookup> {
        if !self.is_recording {
            tracing::debug!(%kind, "switch ignored, not recording");
            return None;
        }
        let lookup = self.close_current();
        self.open_segment_of(kind);
        self.write_live_checkpoint();
        tracing::info!(%kind, segments = self.segments.len(), "segment switched");
        lookup
    }

    /// Recording → Stopped. A no-op when nothing is open.
    pub fn end_recording(&mut self) -> Option<PlaceLookup> {
        if !self.is_recording {
            tracing::debug!("end ignored, not recording");
            return None;
        }
        let lookup = self.close_current();
        self.is_recording = false;
        self.last_sampled_location = None;
        self.clear_slot(LIVE_SESSION_KEY);
        self.write_ended_session();
        tracing::info!(segments = self.segments.len(), "recording ended");
        lookup
    }

    /// Stopped → Idle, handing one aggregated record to `sink`.
    ///
    /// Returns `Ok(None)` without touching the sink when there is nothing to
    /// save. If the sink fails the segments stay buffered.
    pub fn finalize<R: ReportSink + ?Sized>(
        &mut self,
        sink: &mut R,
    ) -> Result<Option<WorkDayRecord>, SessionError> {
        let Some(record) = self.pending_record()? else {
            return Ok(None);
        };
        sink.submit(&record)?;
        self.clear_slot(ENDED_SESSION_KEY);
        Ok(Some(self.finish_saved(record)))
    }

    /// Like [`finalize`](Self::finalize), but files the record through the
    /// checkpoint store so the record and the ended slot's removal commit
    /// together.
    pub fn finalize_in_store(&mut self) -> Result<Option<WorkDayRecord>, SessionError>
    where
        S: ArchivingStore,
    {
        let Some(record) = self.pending_record()? else {
            return Ok(None);
        };
        self.store.submit_clearing(&record, ENDED_SESSION_KEY)?;
        Ok(Some(self.finish_saved(record)))
    }

    /// Drops everything buffered and both checkpoint slots. Never produces a record.
    pub fn discard(&mut self) {
        let dropped = self.segments.len() + usize::from(self.current.is_some());
        self.is_recording = false;
        self.segments.clear();
        self.current = None;
        self.current_track_points.clear();
        self.last_sampled_location = None;
        self.clear_slot(LIVE_SESSION_KEY);
        self.clear_slot(ENDED_SESSION_KEY);
        tracing::info!(dropped, "recording discarded");
    }

    /// Feeds one location sample. Returns `true` if it became a track point.
    ///
    /// Every sample updates the last known location. Only samples taken
    /// while a drive segment is open, and at least the configured distance
    /// from the previous accepted sample, are appended.
    pub fn ingest_location(&mut self, coordinate: Coordinate) -> bool {
        self.last_known_location = Some(coordinate);
        if !self.is_recording {
            return false;
        }
        if self.active_kind != SegmentKind::Drive {
            // keep the location recoverable for the place lookup at close
            self.write_live_checkpoint();
            return false;
        }

        if let Some(previous) = self.last_sampled_location {
            let meters = geo::distance_m(previous, coordinate);
            if meters < self.config.min_sample_distance_m {
                tracing::trace!(meters, "sample below minimum distance");
                return false;
            }
        }

        self.current_track_points
            .push(TrackPoint::new(coordinate, self.clock.now()));
        self.last_sampled_location = Some(coordinate);
        self.write_live_checkpoint();
        true
    }

    /// Writes a resolved place name back into a closed segment.
    ///
    /// Returns `false` without changes when `name` is empty or the segment no
    /// longer exists (saved or discarded while the lookup was in flight).
    pub fn apply_place_name(&mut self, segment_id: SegmentId, name: Option<String>) -> bool {
        let Some(name) = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
            return false;
        };
        let Some(segment) = self.segments.iter_mut().find(|s| s.id == segment_id) else {
            tracing::debug!(%segment_id, "place name for unknown segment ignored");
            return false;
        };
        segment.place_name = name;

        match self.state() {
            SessionState::Recording => self.write_live_checkpoint(),
            SessionState::Stopped => self.write_ended_session(),
            SessionState::Idle => {}
        }
        true
    }

    /// Rebuilds state from the checkpoint slots after a restart.
    ///
    /// A live checkpoint from today resumes recording. Stale or malformed
    /// checkpoints are deleted. Without a live checkpoint, a stored list of
    /// ended segments restores the stopped state.
    pub fn restore_if_checkpointed(&mut self) -> SessionState {
        if self.state() != SessionState::Idle {
            return self.state();
        }

        if let Some(checkpoint) = self.load::<LiveCheckpoint>(LIVE_SESSION_KEY) {
            if let Some(start) = self.resumable_start(&checkpoint) {
                self.resume(checkpoint, start);
                tracing::info!(
                    kind = %self.active_kind,
                    %start,
                    points = self.current_track_points.len(),
                    "recording restored"
                );
                return SessionState::Recording;
            }
            self.clear_slot(LIVE_SESSION_KEY);
        }

        if let Some(ended) = self.load::<EndedSession>(ENDED_SESSION_KEY) {
            if !ended.segments.is_empty() && ended.segments.iter().all(|s| !s.is_open()) {
                self.segments = ended.segments;
                tracing::info!(segments = self.segments.len(), "unsaved segments restored");
                return SessionState::Stopped;
            }
            self.clear_slot(ENDED_SESSION_KEY);
        }

        SessionState::Idle
    }

    // ========== Internals ==========

    fn pending_record(&self) -> Result<Option<WorkDayRecord>, SessionError> {
        if self.is_recording {
            return Err(SessionError::StillRecording);
        }
        if self.segments.is_empty() {
            tracing::debug!("finalize ignored, no segments");
            return Ok(None);
        }
        Ok(Some(WorkDayRecord::from_segments(
            &self.segments,
            self.clock.today(),
            self.clock.now(),
        )))
    }

    fn finish_saved(&mut self, record: WorkDayRecord) -> WorkDayRecord {
        self.segments.clear();
        tracing::info!(
            date = %record.date,
            driving_hours = record.driving_hours,
            working_hours = record.working_hours,
            kilometers = record.kilometers,
            "work day saved"
        );
        record
    }

    fn open_segment_of(&mut self, kind: SegmentKind) {
        let now = self.clock.now();
        self.active_kind = kind;
        self.current = Some(OpenSegment {
            id: SegmentId::new(),
            start: now,
        });
        self.current_track_points.clear();
        self.last_sampled_location = None;

        if kind == SegmentKind::Drive {
            if let Some(location) = self.last_known_location {
                self.current_track_points
                    .push(TrackPoint::new(location, now));
                self.last_sampled_location = Some(location);
            }
        }
    }

    fn close_current(&mut self) -> Option<PlaceLookup> {
        let open = self.current.take()?;
        let now = self.clock.now();
        let mut segment = Segment::open(open.id, self.active_kind, open.start);
        segment.end_time = Some(now);

        let mut lookup = None;
        match self.active_kind {
            SegmentKind::Drive => {
                let mut points = std::mem::take(&mut self.current_track_points);
                if let Some(location) = self.last_known_location {
                    points.push(TrackPoint::new(location, now));
                }
                segment.kilometers = track_length_km(&points);
                segment.track_points = points;
            }
            SegmentKind::Work => {
                self.current_track_points.clear();
                lookup = self.last_known_location.map(|coordinate| PlaceLookup {
                    segment_id: open.id,
                    coordinate,
                });
            }
        }
        self.last_sampled_location = None;

        tracing::debug!(
            id = %segment.id,
            kind = %segment.kind,
            kilometers = segment.kilometers,
            "segment closed"
        );
        self.segments.push(segment);
        lookup
    }

    fn resumable_start(&self, checkpoint: &LiveCheckpoint) -> Option<DateTime<Utc>> {
        if !checkpoint.is_recording {
            return None;
        }
        let Some(start) = checkpoint.segment_start() else {
            tracing::warn!("checkpoint has an invalid start time");
            return None;
        };
        if local_day(start) != self.clock.today() {
            tracing::info!(%start, "discarding checkpoint from a previous day");
            return None;
        }
        if checkpoint.segments.iter().any(Segment::is_open) {
            tracing::warn!("checkpoint holds an open segment in its closed list");
            return None;
        }
        Some(start)
    }

    fn resume(&mut self, checkpoint: LiveCheckpoint, start: DateTime<Utc>) {
        self.is_recording = true;
        self.active_kind = checkpoint.active_kind;
        self.current = Some(OpenSegment {
            id: checkpoint.segment_id.unwrap_or_default(),
            start,
        });
        self.segments = checkpoint.segments;
        self.current_track_points = checkpoint.current_track_points;
        self.last_sampled_location = checkpoint.last_sampled_location;
        self.last_known_location = checkpoint.last_known_location;
    }

    fn live_checkpoint(&self) -> Option<LiveCheckpoint> {
        let open = self.current?;
        Some(LiveCheckpoint {
            is_recording: self.is_recording,
            current_segment_start: open.start.timestamp(),
            active_kind: self.active_kind,
            current_track_points: self.current_track_points.clone(),
            segment_id: Some(open.id),
            segments: self.segments.clone(),
            last_sampled_location: self.last_sampled_location,
            last_known_location: self.last_known_location,
        })
    }

    fn write_live_checkpoint(&mut self) {
        if let Some(checkpoint) = self.live_checkpoint() {
            self.persist(LIVE_SESSION_KEY, &checkpoint);
        }
    }

    fn write_ended_session(&mut self) {
        let ended = EndedSession {
            segments: self.segments.clone(),
        };
        self.persist(ENDED_SESSION_KEY, &ended);
    }

    /// Best-effort overwrite of one slot.
    fn persist<T: Serialize>(&mut self, key: &'static str, value: &T) {
        let result = serde_json::to_vec(value)
            .map_err(|source| StoreError::Encode { key, source })
            .and_then(|bytes| self.store.set(key, &bytes));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "failed to write checkpoint");
        }
    }

    fn clear_slot(&mut self, key: &'static str) {
        if let Err(e) = self.store.delete(key) {
            tracing::warn!(key, error = %e, "failed to clear checkpoint");
        }
    }

    /// Reads one slot; malformed contents are deleted and read as absent.
    fn load<T: for<'de> Deserialize<'de>>(&mut self, key: &'static str) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read checkpoint");
                return None;
            }
        };
        let value = checkpoint::decode(key, &bytes);
        if value.is_none() {
            self.clear_slot(key);
        }
        value
    }
}
