//! Session transitions: start, switch, end, save, discard.

use std::io::Write;

use anyhow::Result;
use mlog_core::{PlaceLookup, SegmentKind, SessionState};

use crate::Config;
use crate::session::{resolve_places, with_recorder};

pub fn start<W: Write>(writer: &mut W, config: &Config, kind: SegmentKind) -> Result<()> {
    with_recorder(config, |recorder| {
        recorder.start_recording(kind)?;
        Ok(())
    })?;
    writeln!(writer, "Recording started ({kind}).")?;
    Ok(())
}

/// Switches to `kind`, or to the other kind when `None`.
pub fn switch<W: Write>(writer: &mut W, config: &Config, kind: Option<SegmentKind>) -> Result<()> {
    let switched = with_recorder(config, |recorder| {
        if !recorder.is_recording() {
            return Ok(None);
        }
        let next = kind.unwrap_or_else(|| recorder.active_kind().other());
        let lookup = recorder.switch_segment_type(next);
        Ok(Some((next, lookup)))
    })?;

    let Some((next, lookup)) = switched else {
        writeln!(writer, "Not recording.")?;
        return Ok(());
    };
    writeln!(writer, "Switched to {next}.")?;
    resolve_lookup(config, lookup);
    Ok(())
}

pub fn end<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let outcome = with_recorder(config, |recorder| {
        if !recorder.is_recording() {
            return Ok(None);
        }
        let lookup = recorder.end_recording();
        Ok(Some((lookup, recorder.segments().len())))
    })?;

    let Some((lookup, count)) = outcome else {
        writeln!(writer, "Not recording.")?;
        return Ok(());
    };
    writeln!(writer, "Recording ended with {count} segment(s).")?;
    writeln!(writer, "Run `mlog save` to file the day or `mlog discard` to drop it.")?;
    resolve_lookup(config, lookup);
    Ok(())
}

pub fn save<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let record = with_recorder(config, |recorder| Ok(recorder.finalize_in_store()?))?;

    match record {
        Some(record) => {
            writeln!(
                writer,
                "Saved {}: {:.1} h driving, {:.1} h working, {:.1} km in {}.",
                record.date,
                record.driving_hours,
                record.working_hours,
                record.kilometers,
                record.city
            )?;
        }
        None => writeln!(writer, "Nothing to save.")?,
    }
    Ok(())
}

pub fn discard<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let previous = with_recorder(config, |recorder| {
        let previous = recorder.state();
        recorder.discard();
        Ok(previous)
    })?;

    if previous == SessionState::Idle {
        writeln!(writer, "Nothing to discard.")?;
    } else {
        writeln!(writer, "Recording discarded.")?;
    }
    Ok(())
}

fn resolve_lookup(config: &Config, lookup: Option<PlaceLookup>) {
    let Some(lookup) = lookup else {
        return;
    };
    match resolve_places(config, &[lookup]) {
        Ok(applied) => tracing::debug!(applied, "place names resolved"),
        Err(e) => tracing::warn!(error = %e, "failed to resolve place names"),
    }
}

#[cfg(test)]
mod tests {
    use mlog_core::checkpoint::ENDED_SESSION_KEY;
    use mlog_core::segment::WORK_PLACE_FALLBACK;
    use mlog_db::Database;

    use super::*;
    use crate::session::test_support::offline_config;

    fn output_of(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut output = Vec::new();
        f(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn full_session_is_saved_as_one_work_day() {
        let temp = tempfile::tempdir().unwrap();
        let config = offline_config(temp.path());

        output_of(|w| start(w, &config, SegmentKind::Drive));
        let switched = output_of(|w| switch(w, &config, None));
        assert_eq!(switched, "Switched to work.\n");
        let ended = output_of(|w| end(w, &config));
        assert!(ended.starts_with("Recording ended with 2 segment(s)."));
        let saved = output_of(|w| save(w, &config));
        assert!(saved.starts_with("Saved "));

        let db = Database::open(&config.database_path).unwrap();
        let days = db.list_work_days().unwrap();
        assert_eq!(days.len(), 1);
        assert!(db.get_checkpoint(ENDED_SESSION_KEY).unwrap().is_none());
        assert_eq!(days[0].record.city, WORK_PLACE_FALLBACK);
        assert!((days[0].record.driving_hours - 0.5).abs() < f64::EPSILON);
        assert!((days[0].record.working_hours - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn start_twice_fails() {
        let temp = tempfile::tempdir().unwrap();
        let config = offline_config(temp.path());

        output_of(|w| start(w, &config, SegmentKind::Work));
        let err = start(&mut Vec::new(), &config, SegmentKind::Drive).unwrap_err();
        assert!(err.to_string().contains("already in progress"));
    }

    #[test]
    fn save_while_recording_fails() {
        let temp = tempfile::tempdir().unwrap();
        let config = offline_config(temp.path());

        output_of(|w| start(w, &config, SegmentKind::Drive));
        let err = save(&mut Vec::new(), &config).unwrap_err();
        assert!(err.to_string().contains("must be ended"));
    }

    #[test]
    fn transitions_when_idle_are_reported() {
        let temp = tempfile::tempdir().unwrap();
        let config = offline_config(temp.path());

        assert_eq!(output_of(|w| switch(w, &config, None)), "Not recording.\n");
        assert_eq!(output_of(|w| end(w, &config)), "Not recording.\n");
        assert_eq!(output_of(|w| save(w, &config)), "Nothing to save.\n");
        assert_eq!(output_of(|w| discard(w, &config)), "Nothing to discard.\n");
    }

    #[test]
    fn discard_drops_stopped_session() {
        let temp = tempfile::tempdir().unwrap();
        let config = offline_config(temp.path());

        output_of(|w| start(w, &config, SegmentKind::Drive));
        output_of(|w| end(w, &config));
        assert_eq!(output_of(|w| discard(w, &config)), "Recording discarded.\n");
        assert_eq!(output_of(|w| save(w, &config)), "Nothing to save.\n");

        let db = Database::open(&config.database_path).unwrap();
        assert!(db.list_work_days().unwrap().is_empty());
    }
}
