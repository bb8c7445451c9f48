//! Shared application state behind a single lock.
//!
//! Recompute triggers arrive from independent tasks: one-shot CLI calls,
//! the log watcher, and settings mutations. Records, settings, and the
//! current link maps form one shared unit; every mutation method locks
//! once and runs "mutate input -> recompute -> publish result" before
//! releasing, so no consumer ever observes link maps computed against a
//! half-updated record store. The previous maps stay valid until the new
//! ones are published.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::analytics::{LandingSummary, LogbookSummary, landing_summary, logbook_summary};
use crate::link_engine::{LinkMaps, recompute_links};
use crate::records::{FlightRecord, LandingRecord};
use crate::settings::LinkSettings;

struct SharedState {
    flights: Vec<FlightRecord>,
    landings: Vec<LandingRecord>,
    settings: LinkSettings,
    links: LinkMaps,
}

impl SharedState {
    /// Full rebuild of the link maps from the current inputs. Pure and
    /// synchronous; called with the lock held.
    fn recompute(&mut self) {
        self.links = recompute_links(
            &self.flights,
            &self.landings,
            &self.settings.overrides,
            self.settings.cluster_window_minutes,
        );
        debug!(
            flights = self.flights.len(),
            landings = self.landings.len(),
            linked = self
                .links
                .landing_links
                .iter()
                .filter(|l| l.flight_index.is_some())
                .count(),
            "Recomputed link maps"
        );
    }

    /// Persist settings if a path is configured. A failed save is logged
    /// and absorbed; the in-memory state stays authoritative.
    fn persist_settings(&self, path: Option<&PathBuf>) {
        if let Some(path) = path
            && let Err(e) = self.settings.save(path)
        {
            error!(path = ?path, error = %e, "Failed to persist settings");
        }
    }
}

/// Handle to the shared state; cheap to clone across tasks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<SharedState>>,
    settings_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(settings: LinkSettings, settings_path: Option<PathBuf>) -> Self {
        let mut state = SharedState {
            flights: Vec::new(),
            landings: Vec::new(),
            settings,
            links: LinkMaps::default(),
        };
        state.recompute();
        Self {
            inner: Arc::new(Mutex::new(state)),
            settings_path,
        }
    }

    /// Replace both record lists wholesale and rebuild the link maps.
    /// Indices from the previous snapshot are invalid after this returns.
    pub async fn replace_records(
        &self,
        flights: Vec<FlightRecord>,
        landings: Vec<LandingRecord>,
    ) {
        let mut state = self.inner.lock().await;
        state.flights = flights;
        state.landings = landings;
        state.recompute();
    }

    /// Set the cluster window. Out-of-range values are rejected to the
    /// caller without touching state; accepted values trigger a recompute
    /// since cluster boundaries depend on the window.
    pub async fn set_cluster_window(&self, minutes: u32) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.settings.set_cluster_window(minutes)?;
        state.recompute();
        state.persist_settings(self.settings_path.as_ref());
        Ok(())
    }

    pub async fn set_override(&self, landing: usize, flight: usize) {
        let mut state = self.inner.lock().await;
        state.settings.set_override(landing, flight);
        state.recompute();
        state.persist_settings(self.settings_path.as_ref());
    }

    pub async fn clear_override(&self, landing: usize) -> bool {
        let mut state = self.inner.lock().await;
        let existed = state.settings.clear_override(landing);
        state.recompute();
        state.persist_settings(self.settings_path.as_ref());
        existed
    }

    pub async fn clear_overrides(&self) {
        let mut state = self.inner.lock().await;
        state.settings.clear_overrides();
        state.recompute();
        state.persist_settings(self.settings_path.as_ref());
    }

    /// Current link maps, as last published.
    pub async fn links(&self) -> LinkMaps {
        self.inner.lock().await.links.clone()
    }

    pub async fn cluster_window(&self) -> u32 {
        self.inner.lock().await.settings.cluster_window_minutes
    }

    pub async fn logbook_summary(&self) -> LogbookSummary {
        let state = self.inner.lock().await;
        logbook_summary(&state.flights)
    }

    pub async fn landing_summary(&self) -> LandingSummary {
        let state = self.inner.lock().await;
        landing_summary(&state.landings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_engine::LinkConfidence;
    use crate::records::LandingTime;
    use chrono::NaiveDate;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn flight(declared: u32) -> FlightRecord {
        FlightRecord::new(
            day("2024-05-03"),
            "KSEA".into(),
            "KPDX".into(),
            declared,
            1.0,
            "N172SP".into(),
            "C172".into(),
        )
    }

    fn landing(time: &str) -> LandingRecord {
        let d = day("2024-05-03");
        LandingRecord {
            time: LandingTime::parse(d, time),
            date: d,
            aircraft_label: "C172".into(),
            aircraft_code: "C172".into(),
            vertical_speed_fpm: None,
            g_force: None,
            nose_rate_fpm: None,
            float_time_s: None,
            quality: None,
        }
    }

    #[tokio::test]
    async fn test_replace_records_publishes_new_links() {
        let state = AppState::new(LinkSettings::default(), None);
        assert!(state.links().await.landing_links.is_empty());

        state
            .replace_records(vec![flight(1)], vec![landing("10:00:00")])
            .await;

        let links = state.links().await;
        assert_eq!(links.landing_links.len(), 1);
        assert_eq!(
            links.landing_links[0].confidence,
            LinkConfidence::UniqueDateAircraft
        );
    }

    #[tokio::test]
    async fn test_override_mutations_recompute() {
        let state = AppState::new(LinkSettings::default(), None);
        state
            .replace_records(
                vec![flight(1), flight(1)],
                vec![landing("10:00:00"), landing("10:03:00")],
            )
            .await;

        state.set_override(0, 1).await;
        let links = state.links().await;
        assert_eq!(links.landing_links[0].flight_index, Some(1));
        assert_eq!(links.landing_links[0].confidence, LinkConfidence::Manual);

        assert!(state.clear_override(0).await);
        assert!(!state.clear_override(0).await);
        let links = state.links().await;
        assert_ne!(links.landing_links[0].confidence, LinkConfidence::Manual);
    }

    #[tokio::test]
    async fn test_rejected_window_leaves_state_untouched() {
        let state = AppState::new(LinkSettings::default(), None);
        state
            .replace_records(
                vec![flight(1), flight(1)],
                vec![landing("10:00:00"), landing("10:03:00")],
            )
            .await;
        let before = state.links().await;

        assert!(state.set_cluster_window(0).await.is_err());
        assert_eq!(state.cluster_window().await, 10);
        assert_eq!(state.links().await, before);
    }

    #[tokio::test]
    async fn test_window_change_moves_cluster_boundaries() {
        let state = AppState::new(LinkSettings::default(), None);
        state
            .replace_records(
                vec![flight(1), flight(1)],
                vec![landing("10:00:00"), landing("10:03:00")],
            )
            .await;

        // Window 10: one cluster, count-based rule fires
        assert_eq!(
            state.links().await.landing_links[0].confidence,
            LinkConfidence::CountAssigned
        );

        // Window 1: two clusters matching two flights
        state.set_cluster_window(1).await.unwrap();
        assert_eq!(
            state.links().await.landing_links[0].confidence,
            LinkConfidence::ClusterSequence
        );
    }

    #[tokio::test]
    async fn test_settings_persisted_on_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("touchdown.toml");
        let state = AppState::new(LinkSettings::default(), Some(path.clone()));

        state.set_cluster_window(5).await.unwrap();
        state.set_override(2, 0).await;

        let reloaded = LinkSettings::load(&path).unwrap();
        assert_eq!(reloaded.cluster_window_minutes, 5);
        assert_eq!(reloaded.overrides.get(&2), Some(&0));
    }

    #[tokio::test]
    async fn test_concurrent_mutations_stay_consistent() {
        let state = AppState::new(LinkSettings::default(), None);
        state
            .replace_records(
                vec![flight(1), flight(1)],
                vec![landing("10:00:00"), landing("10:03:00")],
            )
            .await;

        let mut handles = Vec::new();
        for i in 0..8usize {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    state.set_override(0, i % 2).await;
                } else {
                    state
                        .replace_records(
                            vec![flight(1), flight(1)],
                            vec![landing("10:00:00"), landing("10:03:00")],
                        )
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whatever interleaving happened, the published maps must be the
        // ones computed from the final inputs
        let links = state.links().await;
        assert_eq!(links.landing_links.len(), 2);
        for link in &links.landing_links {
            assert!(link.flight_index.is_some());
        }
    }
}
