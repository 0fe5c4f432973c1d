use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

/// Maximum retained center points per track. Oldest evicted first.
pub const MAX_TRACK_POSITIONS: usize = 30;

/// Tracker-assigned identifier. IDs are owned by the detector/tracker
/// backend; this store never generates one.
pub type TrackId = u32;

/// Recorded state for a single track.
#[derive(Clone, Debug)]
pub struct TrackEntry {
    first_seen: SystemTime,
    last_seen: SystemTime,
    positions: VecDeque<(f32, f32)>,
}

impl TrackEntry {
    fn new(now: SystemTime) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            positions: VecDeque::with_capacity(MAX_TRACK_POSITIONS),
        }
    }

    pub fn first_seen(&self) -> SystemTime {
        self.first_seen
    }

    pub fn last_seen(&self) -> SystemTime {
        self.last_seen
    }

    /// Retained center points, oldest first.
    pub fn positions(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.positions.iter().copied()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Elapsed time since first observation. Saturates to zero if the
    /// wall clock stepped backwards.
    pub fn dwell(&self, now: SystemTime) -> Duration {
        now.duration_since(self.first_seen).unwrap_or_default()
    }
}

/// Per-track accumulator keyed by external track ID.
///
/// Entries live for the process lifetime by default, matching the source
/// feed's behavior: tracks that leave the frame keep their entry so a
/// re-appearing ID resumes its dwell clock. `prune_stale` is the opt-in
/// escape hatch for long-running deployments.
#[derive(Debug, Default)]
pub struct TrackHistory {
    tracks: HashMap<TrackId, TrackEntry>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `track_id` at center `(x, y)`.
    ///
    /// Creates the entry on first observation (`first_seen := now`),
    /// appends the position, and trims the history to the most recent
    /// `MAX_TRACK_POSITIONS` points.
    pub fn record(&mut self, track_id: TrackId, x: f32, y: f32, now: SystemTime) -> &TrackEntry {
        let entry = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackEntry::new(now));
        entry.last_seen = now;
        entry.positions.push_back((x, y));
        while entry.positions.len() > MAX_TRACK_POSITIONS {
            entry.positions.pop_front();
        }
        entry
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackEntry> {
        self.tracks.get(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop entries not updated within `ttl`. Returns the number removed.
    ///
    /// Disabled by default (no caller unless `history.ttl_secs` is
    /// configured); a removed ID that reappears starts a fresh dwell
    /// clock.
    pub fn prune_stale(&mut self, now: SystemTime, ttl: Duration) -> usize {
        let before = self.tracks.len();
        self.tracks
            .retain(|_, entry| match now.duration_since(entry.last_seen) {
                Ok(idle) => idle <= ttl,
                // Entry is from the future (clock step); keep it.
                Err(_) => true,
            });
        before - self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn first_record_sets_first_seen() {
        let mut history = TrackHistory::new();
        history.record(7, 1.0, 2.0, at(100));
        let entry = history.get(7).unwrap();
        assert_eq!(entry.first_seen(), at(100));
        assert_eq!(entry.position_count(), 1);

        // Later records do not move first_seen.
        history.record(7, 3.0, 4.0, at(109));
        let entry = history.get(7).unwrap();
        assert_eq!(entry.first_seen(), at(100));
        assert_eq!(entry.last_seen(), at(109));
        assert_eq!(entry.dwell(at(109)), Duration::from_secs(9));
    }

    #[test]
    fn positions_cap_keeps_most_recent_in_order() {
        let mut history = TrackHistory::new();
        // One observation per second, t=0..=35, position (i, i).
        for i in 0..=35u64 {
            let entry = history.record(5, i as f32, i as f32, at(i));
            assert!(entry.position_count() <= MAX_TRACK_POSITIONS);
        }
        let entry = history.get(5).unwrap();
        assert_eq!(entry.position_count(), MAX_TRACK_POSITIONS);
        let retained: Vec<(f32, f32)> = entry.positions().collect();
        let expected: Vec<(f32, f32)> = (6..=35).map(|i| (i as f32, i as f32)).collect();
        assert_eq!(retained, expected);
    }

    #[test]
    fn dwell_saturates_on_clock_skew() {
        let mut history = TrackHistory::new();
        history.record(1, 0.0, 0.0, at(100));
        let entry = history.get(1).unwrap();
        assert_eq!(entry.dwell(at(50)), Duration::ZERO);
    }

    #[test]
    fn entries_survive_without_pruning() {
        let mut history = TrackHistory::new();
        history.record(1, 0.0, 0.0, at(0));
        history.record(2, 0.0, 0.0, at(1000));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn prune_stale_drops_idle_entries() {
        let mut history = TrackHistory::new();
        history.record(1, 0.0, 0.0, at(0));
        history.record(2, 0.0, 0.0, at(290));
        let removed = history.prune_stale(at(300), Duration::from_secs(60));
        assert_eq!(removed, 1);
        assert!(history.get(1).is_none());
        assert!(history.get(2).is_some());
    }
}
