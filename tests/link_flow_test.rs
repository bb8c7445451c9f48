//! End-to-end test of the ingest -> link -> summarize flow.
//!
//! Builds real source files in a temp directory, runs them through the
//! parsers and the shared state, and checks the published link maps the
//! way a consumer of the JSON output would see them.

use touchdown::landing_log::parse_landing_log;
use touchdown::link_engine::LinkConfidence;
use touchdown::log_watcher::{LogWatcher, WatchPaths};
use touchdown::logbook::parse_logbook;
use touchdown::settings::LinkSettings;
use touchdown::state::AppState;

const LOGBOOK: &str = "\
I
1 Version
2 240503 KSEA KPDX 1 0.9 0 0 0 0 N172SP Cessna_172SP
2 240503 KPDX KSEA 1 1.1 0 0 0 0 N172SP C172
2 240504 KSEA KSFO 2 2.3 0 0 0 0 N801DZ 737-800
";

const LANDINGS: &str = "\
date,time,aircraft,vs_fpm,g,nose_fpm,float_s,q_score,q_max
2024-05-03,10:00:00,C172,-180.5,1.21,,2.4,87,100
2024-05-03,14:03:00,Cessna 172SP,-220.0,1.4,,,,
2024-05-04,09:30:00,B738,-350.0,1.6,-120,1.1,70,100
2024-05-04,11:45:00,737-800,-140.0,1.1,,,95,100
2024-05-07,08:00:00,SR22,-500.0,2.0,,,,
";

struct Fixture {
    _dir: tempfile::TempDir,
    paths: WatchPaths,
}

fn write_sources() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let logbook = dir.path().join("X-Plane Pilot.txt");
    let landing_log = dir.path().join("landings.csv");
    std::fs::write(&logbook, LOGBOOK).unwrap();
    std::fs::write(&landing_log, LANDINGS).unwrap();
    Fixture {
        _dir: dir,
        paths: WatchPaths {
            logbook,
            landing_log,
        },
    }
}

async fn state_from(fixture: &Fixture) -> AppState {
    let state = AppState::new(LinkSettings::default(), None);
    state
        .replace_records(
            parse_logbook(&fixture.paths.logbook).unwrap(),
            parse_landing_log(&fixture.paths.landing_log).unwrap(),
        )
        .await;
    state
}

#[tokio::test]
async fn test_full_flow_links_all_groups() {
    let fixture = write_sources();
    let state = state_from(&fixture).await;
    let links = state.links().await;

    assert_eq!(links.landing_links.len(), 5);

    // May 3rd: two C172 flights, two landings four hours apart. The
    // default 10-minute window splits them into two clusters, one per
    // flight, regardless of label spelling.
    assert_eq!(links.landing_links[0].flight_index, Some(0));
    assert_eq!(
        links.landing_links[0].confidence,
        LinkConfidence::ClusterSequence
    );
    assert_eq!(links.landing_links[1].flight_index, Some(1));

    // May 4th: one 737 flight declaring two landings, both touchdowns
    // belong to it whichever rule fires
    assert_eq!(links.landing_links[2].flight_index, Some(2));
    assert_eq!(links.landing_links[3].flight_index, Some(2));
    assert_eq!(links.flight_landings[&2], vec![2, 3]);

    // May 7th: no SR22 flight logged anywhere
    assert_eq!(links.landing_links[4].flight_index, None);
    assert_eq!(links.landing_links[4].confidence, LinkConfidence::Unmatched);
}

#[tokio::test]
async fn test_override_then_recompute_respects_manual_intent() {
    let fixture = write_sources();
    let state = state_from(&fixture).await;

    // Force the SR22 landing onto the May 4th 737 flight
    state.set_override(4, 2).await;
    let links = state.links().await;
    assert_eq!(links.landing_links[4].flight_index, Some(2));
    assert_eq!(links.landing_links[4].confidence, LinkConfidence::Manual);
    assert!(links.flight_landings[&2].contains(&4));

    // Clearing it restores the heuristic result
    state.clear_override(4).await;
    let links = state.links().await;
    assert_eq!(links.landing_links[4].confidence, LinkConfidence::Unmatched);
}

#[tokio::test]
async fn test_link_maps_serialize_to_json() {
    let fixture = write_sources();
    let state = state_from(&fixture).await;

    let json = serde_json::to_value(state.links().await).unwrap();
    assert_eq!(json["landing_links"].as_array().unwrap().len(), 5);
    assert_eq!(json["landing_links"][4]["confidence"], "unmatched");
    assert_eq!(json["flight_landings"]["2"][0], 2);
}

#[tokio::test]
async fn test_summaries_over_ingested_records() {
    let fixture = write_sources();
    let state = state_from(&fixture).await;

    let logbook = state.logbook_summary().await;
    assert!((logbook.total_hours - 4.3).abs() < 1e-9);
    assert_eq!(logbook.count_by_aircraft["C172"], 2);
    assert_eq!(logbook.count_by_aircraft["B738"], 1);
    assert_eq!(logbook.flights_by_route["KSEA → KPDX"], 1);

    let landing = state.landing_summary().await;
    assert_eq!(landing.landing_count, 5);
    // Present-only mean over the B738 touchdowns
    assert_eq!(landing.mean_vertical_speed_by_aircraft["B738"], -245.0);
}

#[tokio::test]
async fn test_watcher_restart_preserves_consistency() {
    let fixture = write_sources();
    let state = AppState::new(LinkSettings::default(), None);
    let mut watcher = LogWatcher::new();

    watcher.start(fixture.paths.clone(), state.clone()).await;
    assert_eq!(state.links().await.landing_links.len(), 5);

    // Restarting on the same sources is idempotent
    watcher.start(fixture.paths.clone(), state.clone()).await;
    assert_eq!(state.links().await.landing_links.len(), 5);

    watcher.stop().await;
}
