use crate::error::CoreError;
use crate::sample::IqSample;

/// Fixed-capacity ring of complex samples for one tuned center frequency.
///
/// Supports append-with-wrap and retrospective extraction of the most
/// recent N seconds. Extraction always copies — callers never see the
/// internal storage.
pub struct CircularIqBuffer {
    storage: Vec<IqSample>,
    capacity: usize,
    write_pos: usize,
    available: usize,
    sample_rate_hz: u32,
}

impl CircularIqBuffer {
    pub fn new(sample_rate_hz: u32, duration_sec: f64) -> Self {
        let capacity = (sample_rate_hz as f64 * duration_sec).floor() as usize;
        Self {
            storage: vec![IqSample::new(0.0, 0.0); capacity.max(1)],
            capacity: capacity.max(1),
            write_pos: 0,
            available: 0,
            sample_rate_hz,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.available
    }

    /// Store a block, wrapping at capacity. If the block is longer than
    /// capacity, only the trailing `capacity` samples are kept.
    pub fn append(&mut self, block: &[IqSample]) {
        if block.is_empty() {
            return;
        }

        let block = if block.len() > self.capacity {
            &block[block.len() - self.capacity..]
        } else {
            block
        };

        for &sample in block {
            self.storage[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }

        self.available = (self.available + block.len()).min(self.capacity);
    }

    /// Returns a newly-allocated copy of the last `duration_sec` seconds of
    /// samples. Fails with `InsufficientData` when fewer samples than
    /// requested have been appended so far.
    pub fn extract_recent(&self, duration_sec: f64) -> Result<Vec<IqSample>, CoreError> {
        let n = (self.sample_rate_hz as f64 * duration_sec).floor() as usize;
        if n == 0 {
            return Ok(Vec::new());
        }
        if n > self.available {
            return Err(CoreError::InsufficientData {
                requested: n,
                available: self.available,
            });
        }

        // Oldest live sample sits at `write_pos - available` (mod capacity);
        // the window we want starts `available - n` past that. Routing the
        // subtraction through `available` rather than straight off
        // `write_pos` is what keeps this correct before the buffer has
        // wrapped for the first time, when stale/unwritten slots still
        // occupy the rest of `storage`.
        let oldest = (self.write_pos + self.capacity - self.available) % self.capacity;
        let start = (oldest + (self.available - n)) % self.capacity;

        let mut out = Vec::with_capacity(n);
        let mut idx = start;
        for _ in 0..n {
            out.push(self.storage[idx]);
            idx = (idx + 1) % self.capacity;
        }
        Ok(out)
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.available = 0;
    }
}
