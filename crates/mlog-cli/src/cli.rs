//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use mlog_core::SegmentKind;

/// Mechanic's logbook.
///
/// Records a working day as alternating drive and work segments, tracks
/// driven distance from GPS samples, and files the result as a work-day
/// record.
#[derive(Debug, Parser)]
#[command(name = "mlog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Segment kind as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Drive,
    Work,
}

impl From<KindArg> for SegmentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Drive => Self::Drive,
            KindArg::Work => Self::Work,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start recording with a drive or work segment.
    Start {
        #[arg(long, value_enum, default_value_t = KindArg::Drive)]
        kind: KindArg,
    },

    /// Close the open segment and open the next one.
    Switch {
        /// Kind of the next segment (defaults to the other kind).
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Stop recording; segments wait for save or discard.
    End,

    /// Save the stopped recording as a work day.
    Save,

    /// Drop the recording without saving.
    Discard,

    /// Feed one location sample.
    Location {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Feed JSON-lines location samples from stdin until EOF or recording ends.
    Track,

    /// Show the current recording.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List saved work days.
    Days {
        /// First day to include (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Day after the last one to include (YYYY-MM-DD).
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
