//! Typed records for the two ingested streams.
//!
//! A `FlightRecord` is one logbook row (a trip summary); a `LandingRecord`
//! is one touchdown sample from the landing sensor log. Neither stream
//! carries a shared identifier. Record identity is positional: the index
//! into the ingested list, valid only for the current snapshot.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::aircraft::normalize_aircraft;

/// One logbook entry covering a whole trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub date: NaiveDate,
    /// Departure airport code (e.g. "KSEA")
    pub departure: String,
    /// Arrival airport code
    pub arrival: String,
    /// Number of landings the logbook row itself claims
    pub declared_landings: u32,
    /// Flight duration in hours
    pub hours: f64,
    /// Tail number (e.g. "N172SP")
    pub tail: String,
    /// Aircraft label exactly as logged
    pub aircraft_label: String,
    /// Canonical aircraft code derived from the label
    pub aircraft_code: String,
}

impl FlightRecord {
    pub fn new(
        date: NaiveDate,
        departure: String,
        arrival: String,
        declared_landings: u32,
        hours: f64,
        tail: String,
        aircraft_label: String,
    ) -> Self {
        let aircraft_code = normalize_aircraft(&aircraft_label);
        Self {
            date,
            departure,
            arrival,
            declared_landings,
            hours,
            tail,
            aircraft_label,
            aircraft_code,
        }
    }
}

/// Best-effort landing timestamp.
///
/// An unparseable time never drops the record; the raw string is kept as a
/// stable fallback sort key so output stays reproducible across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingTime {
    Parsed(NaiveDateTime),
    Raw(String),
}

/// Ordered list of time-of-day and full-timestamp formats tried in turn.
/// First success wins; no parse error escapes this module.
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

impl LandingTime {
    /// Parse a raw time field against `date`. Tries time-of-day formats
    /// first (combined with the record's date), then full timestamps.
    pub fn parse(date: NaiveDate, raw: &str) -> Self {
        let trimmed = raw.trim();

        for fmt in TIME_FORMATS {
            if let Ok(t) = NaiveTime::parse_from_str(trimmed, fmt) {
                return LandingTime::Parsed(date.and_time(t));
            }
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return LandingTime::Parsed(dt);
            }
        }

        LandingTime::Raw(trimmed.to_string())
    }

    pub fn as_parsed(&self) -> Option<NaiveDateTime> {
        match self {
            LandingTime::Parsed(dt) => Some(*dt),
            LandingTime::Raw(_) => None,
        }
    }

    /// Seconds between two timestamps, if both parsed. `None` means the
    /// delta is not comparable (clustering treats that as a boundary).
    /// Full seconds precision: a 10m30s gap must not pass a 10-minute
    /// window check.
    pub fn delta_seconds(&self, other: &LandingTime) -> Option<i64> {
        let a = self.as_parsed()?;
        let b = other.as_parsed()?;
        Some((b - a).num_seconds().abs())
    }
}

// Parsed timestamps order chronologically and sort before raw fallbacks;
// raw fallbacks order by string so reruns on identical input are stable.
impl Ord for LandingTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LandingTime::Parsed(a), LandingTime::Parsed(b)) => a.cmp(b),
            (LandingTime::Parsed(_), LandingTime::Raw(_)) => Ordering::Less,
            (LandingTime::Raw(_), LandingTime::Parsed(_)) => Ordering::Greater,
            (LandingTime::Raw(a), LandingTime::Raw(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for LandingTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One touchdown sample from the landing sensor log.
///
/// Sensor fields are present-or-absent, never defaulted: a vertical speed
/// of 0.0 is a real (very good) reading, not a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingRecord {
    pub time: LandingTime,
    pub date: NaiveDate,
    pub aircraft_label: String,
    pub aircraft_code: String,
    /// Touchdown vertical speed in feet per minute
    pub vertical_speed_fpm: Option<f64>,
    /// Peak G load at touchdown
    pub g_force: Option<f64>,
    /// Nose wheel descent rate in feet per minute
    pub nose_rate_fpm: Option<f64>,
    /// Float time between flare and touchdown, seconds
    pub float_time_s: Option<f64>,
    /// Quality score pair (achieved, maximum) from the sensor plugin
    pub quality: Option<(f64, f64)>,
}
