//! Landing sensor log parser.
//!
//! Touchdown sensor plugins append one CSV row per landing:
//! `date,time,aircraft,vs_fpm,g,nose_fpm,float_s,q_score,q_max`.
//! Sensor cells may be empty (sensor not fitted or sample lost); an empty
//! cell is *absent*, never zero, since 0.0 is a valid reading.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::aircraft::normalize_aircraft;
use crate::records::{LandingRecord, LandingTime};

/// CSV row as written by the sensor plugin. Sensor cells come in as raw
/// strings so a stray non-numeric cell degrades to "absent" instead of
/// rejecting the whole row.
#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    time: String,
    aircraft: String,
    vs_fpm: Option<String>,
    g: Option<String>,
    nose_fpm: Option<String>,
    float_s: Option<String>,
    q_score: Option<String>,
    q_max: Option<String>,
}

fn sensor_value(cell: &Option<String>) -> Option<f64> {
    cell.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

/// Parse a landing log into landing records.
///
/// A missing file yields an empty list. Rows without a parseable date are
/// skipped with a warning; rows with an unparseable *time* are kept with
/// the raw string as a fallback sort key.
pub fn parse_landing_log(path: &Path) -> Result<Vec<LandingRecord>> {
    if !path.exists() {
        debug!(path = ?path, "Landing log not found, treating as empty");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut landings = Vec::new();
    for (rowno, row) in reader.deserialize::<RawRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = rowno + 1, error = %e, "Skipping malformed landing row");
                continue;
            }
        };

        let Ok(date) = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d") else {
            warn!(row = rowno + 1, date = %row.date, "Skipping landing row with bad date");
            continue;
        };

        let quality = match (sensor_value(&row.q_score), sensor_value(&row.q_max)) {
            (Some(score), Some(max)) => Some((score, max)),
            _ => None,
        };

        landings.push(LandingRecord {
            time: LandingTime::parse(date, &row.time),
            date,
            aircraft_code: normalize_aircraft(&row.aircraft),
            aircraft_label: row.aircraft,
            vertical_speed_fpm: sensor_value(&row.vs_fpm),
            g_force: sensor_value(&row.g),
            nose_rate_fpm: sensor_value(&row.nose_fpm),
            float_time_s: sensor_value(&row.float_s),
            quality,
        });
    }

    debug!(path = ?path, count = landings.len(), "Parsed landing log");
    Ok(landings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,time,aircraft,vs_fpm,g,nose_fpm,float_s,q_score,q_max
2024-05-03,14:32:10,Cessna 172SP,-180.5,1.21,,2.4,87,100
2024-05-03,14:35:00,C172,0.0,,,,,
2024-05-03,garbled,C172,-300,1.8,,,,
not-a-date,10:00:00,C172,-100,,,,,
";

    fn write_sample() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landings.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parses_rows_and_sensor_presence() {
        let (_dir, path) = write_sample();
        let landings = parse_landing_log(&path).unwrap();
        assert_eq!(landings.len(), 3);

        assert_eq!(landings[0].vertical_speed_fpm, Some(-180.5));
        assert_eq!(landings[0].nose_rate_fpm, None);
        assert_eq!(landings[0].quality, Some((87.0, 100.0)));

        // Zero is a reading, absence is absence
        assert_eq!(landings[1].vertical_speed_fpm, Some(0.0));
        assert_eq!(landings[1].g_force, None);
        assert_eq!(landings[1].quality, None);
    }

    #[test]
    fn test_unparseable_time_retained_as_raw() {
        let (_dir, path) = write_sample();
        let landings = parse_landing_log(&path).unwrap();
        assert_eq!(landings[2].time, LandingTime::Raw("garbled".to_string()));
        assert_eq!(landings[2].vertical_speed_fpm, Some(-300.0));
    }

    #[test]
    fn test_bad_date_row_dropped() {
        let (_dir, path) = write_sample();
        let landings = parse_landing_log(&path).unwrap();
        assert!(landings.iter().all(|l| l.date.to_string() == "2024-05-03"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let landings = parse_landing_log(&dir.path().join("none.csv")).unwrap();
        assert!(landings.is_empty());
    }
}
