//! The single serialization point for recorder access.
//!
//! Every command rebuilds the recorder from its checkpoints while holding an
//! exclusive lock on a file next to the database, applies one mutation, and
//! releases the lock. Concurrent invocations (e.g. `mlog track` feeding
//! samples while `mlog switch` runs) therefore never interleave mutations.

use std::fs::{self, File};

use anyhow::{Context, Result};
use fs2::FileExt;
use mlog_core::{PlaceLookup, Recorder, SystemClock};
use mlog_db::Database;

use crate::Config;

/// The recorder type every command works with.
pub type DbRecorder = Recorder<Database, SystemClock>;

/// Opens the database, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

fn acquire_lock(config: &Config) -> Result<File> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let lock_file = File::create(config.lock_path()).context("failed to create lock file")?;
    lock_file
        .lock_exclusive()
        .context("failed to acquire lock")?;
    Ok(lock_file)
}

/// Runs `f` against the restored recorder under the lock.
pub fn with_recorder<T>(config: &Config, f: impl FnOnce(&mut DbRecorder) -> Result<T>) -> Result<T> {
    let _lock = acquire_lock(config)?;
    let db = open_database(config)?;
    let mut recorder = Recorder::restore(db, SystemClock, config.recorder_config());
    f(&mut recorder)
}

/// Resolves place lookups and writes the names back.
///
/// The network round trip happens outside the lock; the write-back takes it
/// again and is a no-op for segments saved or discarded in the meantime.
/// Returns the number of segments renamed.
pub fn resolve_places(config: &Config, lookups: &[PlaceLookup]) -> Result<usize> {
    if lookups.is_empty() {
        return Ok(0);
    }
    if !config.geocoding_enabled {
        tracing::debug!(count = lookups.len(), "geocoding disabled, keeping fallback names");
        return Ok(0);
    }

    let client = match mlog_geo::Client::new(&config.geocoder_url, &config.geocoder_user_agent) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "geocoder unavailable, keeping fallback names");
            return Ok(0);
        }
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let resolved = runtime.block_on(client.resolve_all(lookups));

    with_recorder(config, |recorder| {
        let mut applied = 0;
        for (segment_id, name) in resolved {
            if recorder.apply_place_name(segment_id, name) {
                applied += 1;
            }
        }
        Ok(applied)
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::Config;

    /// Config pointing at a database under `dir`, with geocoding off.
    pub fn offline_config(dir: &Path) -> Config {
        Config {
            database_path: dir.join("mlog.db"),
            geocoding_enabled: false,
            ..Config::default()
        }
    }
}
