//! X-Plane pilot logbook parser.
//!
//! X-Plane appends one whitespace-separated line per flight to
//! `X-Plane Pilot.txt`. Flight rows start with a literal `2` and carry at
//! least 11 fields: record type, date (yymmdd), departure, arrival,
//! landing count, hours, then a variable-width middle section, with the
//! tail number and aircraft label as the last two fields.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::records::FlightRecord;

/// Parse a logbook file into flight records.
///
/// A missing file yields an empty list rather than an error: X-Plane only
/// creates the file after the first logged flight. Rows that fail to parse
/// are skipped with a warning, never fatal.
pub fn parse_logbook(path: &Path) -> Result<Vec<FlightRecord>> {
    if !path.exists() {
        debug!(path = ?path, "Logbook file not found, treating as empty");
        return Ok(Vec::new());
    }

    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

    let mut flights = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        match parse_line(line) {
            Some(flight) => flights.push(flight),
            None => {
                let parts: Vec<&str> = line.split_whitespace().collect();
                // Non-flight rows (header, version marker, totals) are expected
                if parts.first() == Some(&"2") {
                    warn!(line = lineno + 1, "Skipping malformed logbook row");
                }
            }
        }
    }

    debug!(path = ?path, count = flights.len(), "Parsed logbook");
    Ok(flights)
}

fn parse_line(line: &str) -> Option<FlightRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 11 || parts[0] != "2" {
        return None;
    }

    let date = NaiveDate::parse_from_str(parts[1], "%y%m%d").ok()?;
    let departure = parts[2].to_string();
    let arrival = parts[3].to_string();
    let declared_landings: u32 = parts[4].parse().ok()?;
    let hours: f64 = parts[5].parse().ok()?;
    let tail = parts[parts.len() - 2].to_string();
    let aircraft_label = parts[parts.len() - 1].to_string();

    Some(FlightRecord::new(
        date,
        departure,
        arrival,
        declared_landings,
        hours,
        tail,
        aircraft_label,
    ))
}
