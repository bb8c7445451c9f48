//! Pure statistical reductions over flights and landings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::records::{FlightRecord, LandingRecord};

/// Logbook summary for dashboard overview
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogbookSummary {
    pub total_hours: f64,
    pub hours_by_aircraft: BTreeMap<String, f64>,
    pub count_by_aircraft: BTreeMap<String, u32>,
    pub flights_by_route: BTreeMap<String, u32>,
    pub hours_by_date: BTreeMap<NaiveDate, f64>,
}

/// Landing summary; vertical-speed means cover only landings where the
/// sensor value is present, since an absent reading is not zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandingSummary {
    pub landing_count: usize,
    pub mean_vertical_speed_fpm: Option<f64>,
    pub mean_vertical_speed_by_aircraft: BTreeMap<String, f64>,
}

pub fn logbook_summary(flights: &[FlightRecord]) -> LogbookSummary {
    let mut summary = LogbookSummary::default();

    for flight in flights {
        summary.total_hours += flight.hours;
        *summary
            .hours_by_aircraft
            .entry(flight.aircraft_code.clone())
            .or_default() += flight.hours;
        *summary
            .count_by_aircraft
            .entry(flight.aircraft_code.clone())
            .or_default() += 1;
        *summary
            .flights_by_route
            .entry(format!("{} → {}", flight.departure, flight.arrival))
            .or_default() += 1;
        *summary.hours_by_date.entry(flight.date).or_default() += flight.hours;
    }

    summary
}

pub fn landing_summary(landings: &[LandingRecord]) -> LandingSummary {
    let mut sum = 0.0;
    let mut present = 0usize;
    let mut by_aircraft: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for l in landings {
        if let Some(vs) = l.vertical_speed_fpm {
            sum += vs;
            present += 1;
            let entry = by_aircraft.entry(l.aircraft_code.clone()).or_default();
            entry.0 += vs;
            entry.1 += 1;
        }
    }

    LandingSummary {
        landing_count: landings.len(),
        mean_vertical_speed_fpm: (present > 0).then(|| sum / present as f64),
        mean_vertical_speed_by_aircraft: by_aircraft
            .into_iter()
            .map(|(code, (total, n))| (code, total / n as f64))
            .collect(),
    }
}
