use std::fmt;
use std::time::Duration;

use image::Rgb;

/// Dwell below this is Normal.
pub const ANXIOUS_AFTER: Duration = Duration::from_secs(8);
/// Dwell at or above this is Suspicious.
pub const SUSPICIOUS_AFTER: Duration = Duration::from_secs(11);

/// Suspicion level derived from how long a track has lingered in frame.
///
/// Ordered: a track's level never decreases, since dwell time only grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suspicion {
    #[default]
    Normal,
    Anxious,
    Suspicious,
}

impl Suspicion {
    /// Classify elapsed dwell time. Half-open intervals, lower bound
    /// inclusive: Normal < 8s <= Anxious < 11s <= Suspicious.
    pub fn classify(elapsed: Duration) -> Self {
        if elapsed < ANXIOUS_AFTER {
            Suspicion::Normal
        } else if elapsed < SUSPICIOUS_AFTER {
            Suspicion::Anxious
        } else {
            Suspicion::Suspicious
        }
    }

    /// Annotation color. The feed is RGB: green, yellow, red.
    pub fn color(self) -> Rgb<u8> {
        match self {
            Suspicion::Normal => Rgb([0, 255, 0]),
            Suspicion::Anxious => Rgb([255, 255, 0]),
            Suspicion::Suspicious => Rgb([255, 0, 0]),
        }
    }
}

impl fmt::Display for Suspicion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Suspicion::Normal => "Normal",
            Suspicion::Anxious => "Anxious",
            Suspicion::Suspicious => "Suspicious",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_honors_half_open_boundaries() {
        assert_eq!(Suspicion::classify(Duration::ZERO), Suspicion::Normal);
        assert_eq!(
            Suspicion::classify(Duration::from_millis(7_999)),
            Suspicion::Normal
        );
        assert_eq!(
            Suspicion::classify(Duration::from_secs(8)),
            Suspicion::Anxious
        );
        assert_eq!(
            Suspicion::classify(Duration::from_millis(10_999)),
            Suspicion::Anxious
        );
        assert_eq!(
            Suspicion::classify(Duration::from_secs(11)),
            Suspicion::Suspicious
        );
        assert_eq!(
            Suspicion::classify(Duration::from_secs(3600)),
            Suspicion::Suspicious
        );
    }

    #[test]
    fn classification_is_monotonic_in_elapsed_time() {
        let mut last = Suspicion::Normal;
        for ms in (0..15_000).step_by(250) {
            let level = Suspicion::classify(Duration::from_millis(ms));
            assert!(level >= last, "level regressed at {}ms", ms);
            last = level;
        }
    }

    #[test]
    fn labels_match_display() {
        assert_eq!(Suspicion::Normal.to_string(), "Normal");
        assert_eq!(Suspicion::Anxious.to_string(), "Anxious");
        assert_eq!(Suspicion::Suspicious.to_string(), "Suspicious");
    }

    #[test]
    fn colors_are_distinct() {
        assert_ne!(Suspicion::Normal.color(), Suspicion::Anxious.color());
        assert_ne!(Suspicion::Anxious.color(), Suspicion::Suspicious.color());
    }
}
