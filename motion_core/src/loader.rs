// Asset-load progress accounting for the preloader.
// A failed asset counts as settled: progress must always reach 100.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Load is forced complete after this long.
pub const DEFAULT_SAFETY_TIMEOUT_MS: u64 = 5_000;

fn default_safety_timeout_ms() -> u64 {
    DEFAULT_SAFETY_TIMEOUT_MS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSettings {
    pub total: u32,
    /// After this long the load is forced complete.
    #[serde(default = "default_safety_timeout_ms")]
    pub safety_timeout_ms: u64,
}

/// Outcome of one asset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOutcome {
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct LoadTracker {
    settings: LoadSettings,
    started: Timestamp,
    loaded: u32,
    failed: u32,
    forced: bool,
}

impl LoadTracker {
    pub fn new(settings: LoadSettings, started: Timestamp) -> Self {
        LoadTracker {
            settings,
            started,
            loaded: 0,
            failed: 0,
            forced: false,
        }
    }

    /// Record one asset. Reports beyond `total` are ignored.
    pub fn record(&mut self, outcome: AssetOutcome) {
        if self.settled() >= self.settings.total {
            return;
        }
        match outcome {
            AssetOutcome::Loaded => self.loaded += 1,
            AssetOutcome::Failed => {
                log::warn!("asset failed to load; counting it as settled");
                self.failed += 1;
            }
        }
    }

    pub fn settled(&self) -> u32 {
        self.loaded + self.failed
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Check the safety timeout. Returns true if this call forced completion.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        if self.forced || self.is_complete() {
            return false;
        }
        let waited_ms = now.as_micros().saturating_sub(self.started.as_micros()) / 1000;
        if waited_ms >= self.settings.safety_timeout_ms {
            log::warn!(
                "asset loading timed out after {} ms with {}/{} settled; forcing completion",
                waited_ms,
                self.settled(),
                self.settings.total
            );
            self.forced = true;
            return true;
        }
        false
    }

    pub fn is_complete(&self) -> bool {
        self.forced || self.settled() >= self.settings.total
    }

    /// Rounded percentage, 0..=100.
    pub fn progress(&self) -> u8 {
        if self.is_complete() {
            return 100;
        }
        let pct = (self.settled() as f64 / self.settings.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tracker(total: u32) -> LoadTracker {
        LoadTracker::new(
            LoadSettings {
                total,
                safety_timeout_ms: 5_000,
            },
            Timestamp::from_micros(0),
        )
    }

    #[test]
    fn failures_count_towards_completion() {
        let mut t = tracker(5);
        for _ in 0..3 {
            t.record(AssetOutcome::Loaded);
        }
        t.record(AssetOutcome::Failed);
        assert_eq!(t.progress(), 80);
        t.record(AssetOutcome::Failed);
        assert_eq!(t.progress(), 100);
        assert_eq!(t.failed(), 2);
    }

    #[test]
    fn empty_asset_list_is_complete() {
        assert_eq!(tracker(0).progress(), 100);
    }

    #[test]
    fn safety_timeout_forces_completion_once() {
        let mut t = tracker(5);
        t.record(AssetOutcome::Loaded);
        assert!(!t.poll(Timestamp::from_micros(4_999_000)));
        assert!(t.poll(Timestamp::from_micros(5_000_000)));
        assert!(!t.poll(Timestamp::from_micros(6_000_000)));
        assert_eq!(t.progress(), 100);
    }

    proptest! {
        #[test]
        fn progress_is_monotonic(total in 1u32..40, outcomes in prop::collection::vec(any::<bool>(), 0..60)) {
            let mut t = tracker(total);
            let mut last = t.progress();
            for ok in outcomes {
                t.record(if ok { AssetOutcome::Loaded } else { AssetOutcome::Failed });
                let p = t.progress();
                prop_assert!(p >= last);
                prop_assert!(p <= 100);
                last = p;
            }
        }
    }
}
