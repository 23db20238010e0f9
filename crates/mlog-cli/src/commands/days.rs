//! Lists saved work days.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use mlog_core::WorkDayRecord;
use mlog_db::StoredWorkDay;
use serde::Serialize;

use crate::Config;
use crate::session::open_database;

#[derive(Debug, Serialize)]
struct DayEntry<'a> {
    id: i64,
    created_at: &'a str,
    #[serde(flatten)]
    record: &'a WorkDayRecord,
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let db = open_database(config)?;
    let days = match (from, until) {
        (None, None) => db.list_work_days()?,
        (from, until) => {
            // dates are compared as text, so the open end must stay four-digit
            let end = until
                .or_else(|| NaiveDate::from_ymd_opt(9999, 12, 31))
                .unwrap_or(NaiveDate::MAX);
            db.list_work_days_in_range(from.unwrap_or(NaiveDate::MIN), end)?
        }
    };
    render_days(writer, &days, json)
}

/// Writes work days as a table or JSON array.
pub fn render_days<W: Write>(writer: &mut W, days: &[StoredWorkDay], json: bool) -> Result<()> {
    if json {
        let entries: Vec<DayEntry<'_>> = days
            .iter()
            .map(|day| DayEntry {
                id: day.id,
                created_at: &day.created_at,
                record: &day.record,
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
        return Ok(());
    }

    if days.is_empty() {
        writeln!(writer, "No work days recorded.")?;
        return Ok(());
    }

    writeln!(writer, "DATE        DRIVE   WORK     KM  CITY")?;
    for day in days {
        let record = &day.record;
        writeln!(
            writer,
            "{}  {:>5.1}  {:>5.1}  {:>5.1}  {}",
            record.date, record.driving_hours, record.working_hours, record.kilometers, record.city
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use mlog_core::record::{LIVE_RECORDING_NOTE, WORK_DAY_TYPE};

    use super::*;

    fn day(id: i64, date: &str, driving: f64, working: f64, km: f64, city: &str) -> StoredWorkDay {
        StoredWorkDay {
            id,
            created_at: "2025-03-04 17:00:00".to_string(),
            record: WorkDayRecord {
                date: date.parse().unwrap(),
                driving_hours: driving,
                working_hours: working,
                kilometers: km,
                city: city.to_string(),
                track_points: None,
                note: LIVE_RECORDING_NOTE.to_string(),
                completed: false,
                day_type: WORK_DAY_TYPE.to_string(),
            },
        }
    }

    fn render(days: &[StoredWorkDay], json: bool) -> String {
        let mut output = Vec::new();
        render_days(&mut output, days, json).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(render(&[], false), "No work days recorded.\n");
    }

    #[test]
    fn table_lists_each_day() {
        let days = [
            day(1, "2025-03-03", 1.5, 6.0, 84.2, "Plzeň"),
            day(2, "2025-03-04", 0.5, 7.5, 12.0, "Workplace"),
        ];
        assert_snapshot!(render(&days, false), @r"
        DATE        DRIVE   WORK     KM  CITY
        2025-03-03    1.5    6.0   84.2  Plzeň
        2025-03-04    0.5    7.5   12.0  Workplace
        ");
    }

    #[test]
    fn json_flattens_record_fields() {
        let days = [day(7, "2025-03-04", 0.5, 1.0, 3.2, "Rokycany")];
        let value: serde_json::Value = serde_json::from_str(&render(&days, true)).unwrap();
        let entry = &value[0];
        assert_eq!(entry["id"], 7);
        assert_eq!(entry["date"], "2025-03-04");
        assert_eq!(entry["city"], "Rokycany");
        assert_eq!(entry["note"], LIVE_RECORDING_NOTE);
        assert!(entry.get("track_points").is_none());
    }

    #[test]
    fn run_reads_saved_days_in_range() {
        let temp = tempfile::tempdir().unwrap();
        let config = crate::session::test_support::offline_config(temp.path());
        let db = open_database(&config).unwrap();
        db.insert_work_day(&day(0, "2025-03-03", 1.0, 1.0, 1.0, "A").record)
            .unwrap();
        db.insert_work_day(&day(0, "2025-03-05", 1.0, 1.0, 1.0, "B").record)
            .unwrap();

        let mut output = Vec::new();
        let from = "2025-03-04".parse().ok();
        run(&mut output, &config, from, None, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["city"], "B");
    }
}
