//! Core domain logic for the mechanic's logbook.
//!
//! This crate contains the live recording session engine:
//! - Recorder: the drive/work segment state machine
//! - Checkpointing: crash-safe snapshots of in-progress and unsaved recordings
//! - Aggregation: turning closed segments into one reportable work day

pub mod checkpoint;
pub mod clock;
pub mod geo;
pub mod location;
pub mod record;
pub mod recorder;
pub mod segment;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use location::{LocationError, LocationSample, LocationSource, PumpStats, pump_locations};
pub use record::WorkDayRecord;
pub use recorder::{
    LiveTotals, PlaceLookup, Recorder, RecorderConfig, SessionError, SessionState,
};
pub use segment::{Segment, TrackPoint, round_up_to_half_hour};
pub use store::{ArchivingStore, CheckpointStore, MemorySink, MemoryStore, ReportSink, StoreError};
pub use types::{Coordinate, SegmentId, SegmentKind, ValidationError};
