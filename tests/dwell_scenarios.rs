//! End-to-end dwell scenarios through the public API.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use linger_watch::{
    HlsConfig, HlsSource, Pipeline, StubBackend, Suspicion, TrackHistory, MAX_TRACK_POSITIONS,
};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn long_lived_track_caps_history_and_turns_suspicious() {
    let mut history = TrackHistory::new();

    // Track 5 observed once per second at t=0..=35 with positions (i, i).
    for i in 0..=35u64 {
        history.record(5, i as f32, i as f32, at(i));
    }

    let entry = history.get(5).expect("track 5 entry");
    assert_eq!(entry.position_count(), MAX_TRACK_POSITIONS);
    let retained: Vec<(f32, f32)> = entry.positions().collect();
    assert_eq!(retained.first().copied(), Some((6.0, 6.0)));
    assert_eq!(retained.last().copied(), Some((35.0, 35.0)));

    let dwell = entry.dwell(at(35));
    assert_eq!(dwell, Duration::from_secs(35));
    assert_eq!(Suspicion::classify(dwell), Suspicion::Suspicious);
}

#[test]
fn short_lived_track_walks_the_label_ladder() {
    let mut history = TrackHistory::new();

    // Track 7 recorded once at t=0: Normal.
    history.record(7, 10.0, 20.0, at(0));
    let entry = history.get(7).expect("track 7 entry");
    assert_eq!(Suspicion::classify(entry.dwell(at(0))), Suspicion::Normal);

    // Recorded again at t=9: dwell is 9s, Anxious.
    history.record(7, 11.0, 21.0, at(9));
    let entry = history.get(7).expect("track 7 entry");
    assert_eq!(entry.dwell(at(9)), Duration::from_secs(9));
    assert_eq!(Suspicion::classify(entry.dwell(at(9))), Suspicion::Anxious);

    // And at t=11 the label becomes Suspicious and stays there.
    assert_eq!(Suspicion::classify(entry.dwell(at(11))), Suspicion::Suspicious);
    assert_eq!(Suspicion::classify(entry.dwell(at(60))), Suspicion::Suspicious);
}

#[test]
fn distinct_tracks_keep_independent_clocks() {
    let mut history = TrackHistory::new();

    history.record(1, 0.0, 0.0, at(0));
    history.record(2, 0.0, 0.0, at(10));

    let first = history.get(1).expect("track 1");
    let second = history.get(2).expect("track 2");
    assert_eq!(Suspicion::classify(first.dwell(at(12))), Suspicion::Suspicious);
    assert_eq!(Suspicion::classify(second.dwell(at(12))), Suspicion::Normal);
}

#[test]
fn stub_pipeline_runs_end_to_end() {
    let config = HlsConfig {
        stream: "stub://integration".to_string(),
        width: 320,
        height: 240,
        ..HlsConfig::default()
    };
    let source = HlsSource::open(config).expect("stub source");
    let backend = Arc::new(Mutex::new(StubBackend::new(320, 240)));
    let mut pipeline = Pipeline::new(source, backend, None, None);
    pipeline.connect().expect("connect");

    for _ in 0..10 {
        let report = pipeline.step().expect("step").expect("frame report");
        assert!(!report.observations.is_empty());
        for obs in &report.observations {
            // Real wall clock: ten fast frames stay well under 8 seconds.
            assert_eq!(obs.level, Suspicion::Normal);
            let entry = pipeline.history().get(obs.track_id);
            assert!(entry.is_some());
        }
    }

    assert!(pipeline.source_healthy());
    assert_eq!(pipeline.source_stats().frames_decoded, 10);
}

#[test]
fn pruning_is_opt_in_per_pipeline() {
    // Without a TTL the mapping only grows; with one, idle entries go.
    let mut history = TrackHistory::new();
    history.record(1, 0.0, 0.0, at(0));
    history.record(1, 1.0, 1.0, at(5));
    history.record(2, 0.0, 0.0, at(600));

    assert_eq!(history.len(), 2);
    let removed = history.prune_stale(at(600), Duration::from_secs(300));
    assert_eq!(removed, 1);
    assert_eq!(history.len(), 1);
    assert!(history.get(2).is_some());
}
