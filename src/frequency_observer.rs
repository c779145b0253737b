use std::collections::HashMap;

type Bucket = i64;

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PowerStats {
    sum: f64,
    sum_sq: f64,
    count: u64,
}

impl PowerStats {
    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let raw = (self.sum_sq - self.sum * self.sum / self.count as f64) / (self.count as f64 - 1.0);
        raw.max(0.0) // guards against negative rounding noise for near-constant series
    }
}

struct BucketState {
    segments: Vec<Segment>,
    stats: PowerStats,
    last_update_t: Option<f64>,
}

impl BucketState {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            stats: PowerStats::default(),
            last_update_t: None,
        }
    }
}

/// Per-bucket activity segments and running power statistics; classifies a
/// bucket as "continuous" (reject) vs "bursty" (candidate).
pub struct FrequencyObserver {
    window_sec: f64,
    activity_threshold_db: f32,
    segment_join_gap_sec: f64,
    buckets: HashMap<Bucket, BucketState>,
}

impl FrequencyObserver {
    pub fn new(window_sec: f64, activity_threshold_db: f32) -> Self {
        Self::with_join_gap(window_sec, activity_threshold_db, 1.0)
    }

    pub fn with_join_gap(window_sec: f64, activity_threshold_db: f32, segment_join_gap_sec: f64) -> Self {
        Self {
            window_sec,
            activity_threshold_db,
            segment_join_gap_sec,
            buckets: HashMap::new(),
        }
    }

    fn bucket_of(frequency_hz: f64) -> Bucket {
        frequency_hz.round() as Bucket
    }

    pub fn update(&mut self, frequency_hz: f64, power_db: f32, now: f64) {
        let bucket = Self::bucket_of(frequency_hz);
        let state = self.buckets.entry(bucket).or_insert_with(BucketState::new);

        if state.last_update_t.is_none() {
            // First sighting: the reading itself is discarded, not counted —
            // running stats and activity decisions start from the next update.
            state.last_update_t = Some(now);
            return;
        }

        state.stats.sum += power_db as f64;
        state.stats.sum_sq += (power_db as f64) * (power_db as f64);
        state.stats.count += 1;
        let mean = state.stats.mean();
        let is_active = power_db as f64 > mean - self.activity_threshold_db as f64;

        let last_update_t = state.last_update_t.unwrap();

        if is_active {
            if let Some(last) = state.segments.last_mut() {
                if now - last_update_t < self.segment_join_gap_sec {
                    last.end = now;
                } else {
                    state.segments.push(Segment { start: now, end: now });
                }
            } else {
                state.segments.push(Segment { start: now, end: now });
            }
        }
        // Inactive: an open segment's `end` already sits at `last_update_t`,
        // so there's nothing to close here — it simply stops being extended.

        state.last_update_t = Some(now);

        let cutoff = now - self.window_sec;
        state.segments.retain(|s| s.end >= cutoff);
        if state.segments.is_empty() {
            state.stats = PowerStats::default();
        }
    }

    /// Returns true if the bucket behaves like a continuous emission: high
    /// duty cycle and low relative power variation.
    pub fn is_continuous(
        &mut self,
        frequency_hz: f64,
        now: f64,
        duty_cycle_thresh: f64,
        cv_thresh: f64,
    ) -> bool {
        let bucket = Self::bucket_of(frequency_hz);
        let state = match self.buckets.get_mut(&bucket) {
            Some(s) => s,
            None => return false,
        };

        let cutoff = now - self.window_sec;
        state.segments.retain(|s| s.end >= cutoff);

        if state.segments.is_empty() || state.stats.count < 10 {
            return false;
        }

        let active_time: f64 = state.segments.iter().map(|s| s.end - s.start).sum();
        let first_segment_start = state.segments[0].start;
        let observed_time = self.window_sec.min(now - first_segment_start);
        if observed_time <= 0.0 {
            return false;
        }
        let duty_cycle = active_time / observed_time;

        let mean = state.stats.mean();
        let cv = if mean > 0.0 {
            state.stats.variance().sqrt() / mean
        } else {
            0.0
        };

        duty_cycle > duty_cycle_thresh && cv < cv_thresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_signal_with_stable_power_is_continuous() {
        let mut obs = FrequencyObserver::new(10.0, 6.0);
        let freq = 100_000_000.0;
        // Active at every tick, stable power, spans well beyond window_sec.
        for i in 0..30 {
            obs.update(freq, -40.0, i as f64 * 0.5);
        }
        assert!(obs.is_continuous(freq, 14.5, 0.5, 0.2));
    }

    #[test]
    fn bursty_signal_is_not_continuous() {
        let mut obs = FrequencyObserver::new(10.0, 3.0);
        let freq = 100_000_000.0;
        // Active 10% of the time (one tick in ten), inactive otherwise.
        for i in 0..100 {
            let t = i as f64 * 0.2;
            let power = if i % 10 == 0 { -20.0 } else { -60.0 };
            obs.update(freq, power, t);
        }
        assert!(!obs.is_continuous(freq, 19.8, 0.5, 0.2));
    }

    #[test]
    fn fewer_than_ten_samples_is_never_continuous() {
        let mut obs = FrequencyObserver::new(10.0, 6.0);
        let freq = 50_000_000.0;
        for i in 0..5 {
            obs.update(freq, -40.0, i as f64 * 0.5);
        }
        assert!(!obs.is_continuous(freq, 2.0, 0.5, 0.2));
    }
}
