use std::collections::HashMap;

use crate::fft::PeakRegion;

/// One retained detection timestamp for a frequency bucket.
type Bucket = i64;

/// Temporal confirmation: a frequency bucket is "stable" once it has been
/// observed at least `min_hits` times within a sliding `window_sec`.
pub struct PeakTracker {
    min_hits: usize,
    window_sec: f64,
    history: HashMap<Bucket, Vec<f64>>,
}

impl PeakTracker {
    pub fn new(min_hits: usize, window_sec: f64) -> Self {
        Self {
            min_hits,
            window_sec,
            history: HashMap::new(),
        }
    }

    fn bucket_of(frequency_hz: f64) -> Bucket {
        frequency_hz.round() as Bucket
    }

    /// Feeds the current cycle's detected peaks and returns the ones whose
    /// bucket has reached `min_hits` retained timestamps, in ascending
    /// frequency order.
    pub fn update_and_filter(&mut self, now: f64, peaks: &[PeakRegion]) -> Vec<PeakRegion> {
        // Deduplicate by bucket, keeping the strongest peak per bucket.
        let mut strongest_by_bucket: HashMap<Bucket, PeakRegion> = HashMap::new();
        for &peak in peaks {
            let bucket = Self::bucket_of(peak.frequency_offset_hz);
            strongest_by_bucket
                .entry(bucket)
                .and_modify(|existing| {
                    if peak.power_db > existing.power_db {
                        *existing = peak;
                    }
                })
                .or_insert(peak);
        }

        for &bucket in strongest_by_bucket.keys() {
            self.history.entry(bucket).or_default().push(now);
        }

        // Prune every tracked bucket, including ones not reported this
        // cycle, and drop buckets whose history becomes empty.
        let cutoff = now - self.window_sec;
        self.history.retain(|_, timestamps| {
            timestamps.retain(|&t| t >= cutoff);
            !timestamps.is_empty()
        });

        let mut stable: Vec<PeakRegion> = strongest_by_bucket
            .into_iter()
            .filter(|(bucket, _)| {
                self.history
                    .get(bucket)
                    .map(|timestamps| timestamps.len() >= self.min_hits)
                    .unwrap_or(false)
            })
            .map(|(_, peak)| peak)
            .collect();

        stable.sort_by(|a, b| {
            a.frequency_offset_hz
                .partial_cmp(&b.frequency_offset_hz)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        stable
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(freq: f64, power: f32) -> PeakRegion {
        PeakRegion {
            frequency_offset_hz: freq,
            power_db: power,
            index: 0,
            bandwidth_hz: 3000.0,
        }
    }

    #[test]
    fn single_cycle_peak_not_stable_unless_min_hits_one() {
        let mut tracker = PeakTracker::new(3, 10.0);
        let stable = tracker.update_and_filter(0.0, &[peak(145_500_000.0, -40.0)]);
        assert!(stable.is_empty());
    }

    #[test]
    fn stable_by_min_hits_cycle() {
        let mut tracker = PeakTracker::new(3, 10.0);
        let p = peak(145_500_000.0, -40.0);

        assert!(tracker.update_and_filter(0.0, &[p]).is_empty());
        assert!(tracker.update_and_filter(3.0, &[p]).is_empty());
        let stable = tracker.update_and_filter(6.0, &[p]);
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].frequency_offset_hz, 145_500_000.0);
    }

    #[test]
    fn bucket_pruned_after_window_with_no_new_sightings() {
        let mut tracker = PeakTracker::new(3, 10.0);
        let p = peak(145_500_000.0, -40.0);
        tracker.update_and_filter(0.0, &[p]);
        tracker.update_and_filter(3.0, &[p]);
        tracker.update_and_filter(6.0, &[p]);

        // t = 20, no further sightings: bucket should be absent from state.
        tracker.update_and_filter(20.0, &[]);
        assert!(!tracker.history.contains_key(&145_500_000));
    }

    #[test]
    fn output_is_ascending_frequency_order() {
        let mut tracker = PeakTracker::new(1, 10.0);
        let low = peak(1000.0, -30.0);
        let high = peak(5000.0, -30.0);
        let stable = tracker.update_and_filter(0.0, &[high, low]);
        assert_eq!(stable[0].frequency_offset_hz, 1000.0);
        assert_eq!(stable[1].frequency_offset_hz, 5000.0);
    }

    #[test]
    fn dedups_by_bucket_keeping_strongest() {
        let mut tracker = PeakTracker::new(1, 10.0);
        let weak = peak(2000.4, -50.0);
        let strong = peak(2000.1, -30.0);
        let stable = tracker.update_and_filter(0.0, &[weak, strong]);
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].power_db, -30.0);
    }
}
