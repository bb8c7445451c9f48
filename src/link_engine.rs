//! Flight/landing correlation engine.
//!
//! The logbook and the landing sensor log share no identifier, so landings
//! are attributed to flights by a cascade of heuristics over groups keyed
//! by (calendar day, normalized aircraft code). Manual overrides are
//! applied before any heuristic and always win. Within a group the first
//! rule that fires consumes the entire remaining working pool; rules are
//! never mixed inside one group.
//!
//! Known approximation: the positional rules (`SequenceAssumed`,
//! `ClusterSequence`) assume the logbook's encounter order within a group
//! already matches chronological order, and that time-sorting landings
//! recovers the true flight-to-landing chronology. Neither is verified;
//! the confidence tier records which assumption produced a link.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::records::{FlightRecord, LandingRecord};

/// Which rule produced a link, ordered roughly by decreasing certainty.
/// External reporting keys off these names; the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkConfidence {
    /// User-authored override
    Manual,
    /// Only one flight and one landing shared the (day, aircraft) group
    UniqueDateAircraft,
    /// Flight count equaled landing count; paired positionally
    SequenceAssumed,
    /// Time clusters matched the flight count one-to-one
    ClusterSequence,
    /// Clusters distributed by declared landing counts
    ClusterAssigned,
    /// Individual landings distributed by declared landing counts
    CountAssigned,
    /// No rule could attribute the landing
    Ambiguous,
    /// No candidate flight existed for the landing's group
    Unmatched,
}

/// Resolved link for one landing index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingLink {
    pub flight_index: Option<usize>,
    pub confidence: LinkConfidence,
}

/// Output of one full recompute: per-landing links plus the inverse map.
///
/// Every index is valid against the record snapshot the maps were computed
/// from; both maps are rebuilt wholesale on every recompute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkMaps {
    /// One entry per landing, in landing-list order
    pub landing_links: Vec<LandingLink>,
    /// Flight index -> landing indices assigned to it, in assignment order
    pub flight_landings: BTreeMap<usize, Vec<usize>>,
}

impl LinkMaps {
    fn assign(&mut self, landing: usize, flight: usize, confidence: LinkConfidence) {
        self.landing_links[landing] = LandingLink {
            flight_index: Some(flight),
            confidence,
        };
        self.flight_landings.entry(flight).or_default().push(landing);
    }

    fn mark(&mut self, landing: usize, confidence: LinkConfidence) {
        self.landing_links[landing] = LandingLink {
            flight_index: None,
            confidence,
        };
    }
}

type GroupKey = (NaiveDate, String);

/// Recompute both link maps from scratch.
///
/// Pure and synchronous: reads its inputs, performs no I/O, mutates
/// nothing. Identical inputs produce identical maps.
pub fn recompute_links(
    flights: &[FlightRecord],
    landings: &[LandingRecord],
    overrides: &BTreeMap<usize, usize>,
    cluster_window_minutes: u32,
) -> LinkMaps {
    let mut maps = LinkMaps {
        landing_links: vec![
            LandingLink {
                flight_index: None,
                confidence: LinkConfidence::Unmatched,
            };
            landings.len()
        ],
        flight_landings: BTreeMap::new(),
    };

    // Manual overrides first: honored unconditionally, even across group
    // boundaries, so no heuristic can fight a manual decision. An index
    // out of range against the current snapshot is silently ignored.
    let mut overridden_landings: HashSet<usize> = HashSet::new();
    let mut overridden_flights: HashSet<usize> = HashSet::new();
    for (&landing_idx, &flight_idx) in overrides {
        if landing_idx < landings.len() && flight_idx < flights.len() {
            maps.assign(landing_idx, flight_idx, LinkConfidence::Manual);
            overridden_landings.insert(landing_idx);
            overridden_flights.insert(flight_idx);
        }
    }

    // Working pools keyed by (day, aircraft code). Flights enter in
    // encounter order; landings are time-sorted with the raw-string
    // fallback keeping unparseable entries in a stable order.
    let mut flight_groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, flight) in flights.iter().enumerate() {
        if flight.declared_landings >= 1 && !overridden_flights.contains(&i) {
            flight_groups
                .entry((flight.date, flight.aircraft_code.clone()))
                .or_default()
                .push(i);
        }
    }

    let mut landing_groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (i, landing) in landings.iter().enumerate() {
        if !overridden_landings.contains(&i) {
            landing_groups
                .entry((landing.date, landing.aircraft_code.clone()))
                .or_default()
                .push(i);
        }
    }
    for group in landing_groups.values_mut() {
        group.sort_by(|&a, &b| landings[a].time.cmp(&landings[b].time));
    }

    for (key, group_landings) in &landing_groups {
        let group_flights = flight_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
        link_group(
            &mut maps,
            flights,
            landings,
            group_flights,
            group_landings,
            cluster_window_minutes,
        );
    }

    maps
}

/// Run the heuristic cascade over one group's working pool. Strict
/// priority order; the first rule that fires consumes the whole pool.
fn link_group(
    maps: &mut LinkMaps,
    flights: &[FlightRecord],
    landings: &[LandingRecord],
    group_flights: &[usize],
    group_landings: &[usize],
    cluster_window_minutes: u32,
) {
    // Rule 1: no candidate flights at all
    if group_flights.is_empty() {
        for &l in group_landings {
            maps.mark(l, LinkConfidence::Unmatched);
        }
        return;
    }

    // Rule 2: exactly one of each
    if group_flights.len() == 1 && group_landings.len() == 1 {
        maps.assign(
            group_landings[0],
            group_flights[0],
            LinkConfidence::UniqueDateAircraft,
        );
        return;
    }

    let declared_sum: usize = group_flights
        .iter()
        .map(|&f| flights[f].declared_landings as usize)
        .sum();

    // Rule 3: equal counts, pair positionally in time order. Only fires
    // when the declared totals disagree with the landing count; when they
    // agree, the clustering and count rules below produce the same pairing
    // with a more specific confidence.
    if group_flights.len() == group_landings.len() && declared_sum != group_landings.len() {
        for (&l, &f) in group_landings.iter().zip(group_flights) {
            maps.assign(l, f, LinkConfidence::SequenceAssumed);
        }
        return;
    }

    // Rule 4: cluster temporally adjacent landings
    let clusters = cluster_landings(landings, group_landings, cluster_window_minutes);

    // Rule 4a: one cluster per flight
    if clusters.len() == group_flights.len() {
        for (cluster, &f) in clusters.iter().zip(group_flights) {
            for &l in cluster {
                maps.assign(l, f, LinkConfidence::ClusterSequence);
            }
        }
        return;
    }

    // Rule 4b: declared counts distribute whole clusters
    if declared_sum == clusters.len() {
        let mut remaining = clusters.iter();
        for &f in group_flights {
            for _ in 0..flights[f].declared_landings {
                if let Some(cluster) = remaining.next() {
                    for &l in cluster {
                        maps.assign(l, f, LinkConfidence::ClusterAssigned);
                    }
                }
            }
        }
        for cluster in remaining {
            for &l in cluster {
                maps.mark(l, LinkConfidence::Ambiguous);
            }
        }
        return;
    }

    // Rule 5: declared counts distribute raw landings in time order
    if declared_sum == group_landings.len() {
        let mut remaining = group_landings.iter();
        for &f in group_flights {
            for _ in 0..flights[f].declared_landings {
                if let Some(&l) = remaining.next() {
                    maps.assign(l, f, LinkConfidence::CountAssigned);
                }
            }
        }
        for &l in remaining {
            maps.mark(l, LinkConfidence::Ambiguous);
        }
        return;
    }

    // Rule 6: nothing fits
    for &l in group_landings {
        maps.mark(l, LinkConfidence::Ambiguous);
    }
}

/// Partition time-sorted landings into clusters. Consecutive landings with
/// a parseable delta within the window (inclusive) share a cluster; an
/// unparseable delta or one past the window starts a new cluster.
fn cluster_landings(
    landings: &[LandingRecord],
    group_landings: &[usize],
    cluster_window_minutes: u32,
) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for &l in group_landings {
        let joins_previous = clusters.last().and_then(|cluster| {
            let &prev = cluster.last()?;
            let delta = landings[prev].time.delta_seconds(&landings[l].time)?;
            Some(delta <= cluster_window_minutes as i64 * 60)
        });

        match (clusters.last_mut(), joins_previous) {
            (Some(cluster), Some(true)) => cluster.push(l),
            _ => clusters.push(vec![l]),
        }
    }

    clusters
}
