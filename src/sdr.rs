use crate::error::CoreError;
use crate::sample::IqSample;

/// External SDR hardware abstraction. The core never implements this beyond
/// the `ReplaySdrDevice` reference adapter — real hardware bindings are out
/// of scope.
pub trait SdrDevice {
    /// Acquire the device and set sample rate / gain.
    fn initialize(&mut self) -> Result<(), CoreError>;
    /// Set center frequency; blocks until settled.
    fn tune(&mut self, frequency_hz: f64) -> Result<(), CoreError>;
    /// Idempotent.
    fn start_stream(&mut self) -> Result<(), CoreError>;
    /// Idempotent.
    fn stop_stream(&mut self) -> Result<(), CoreError>;
    /// Blocking; returns exactly `n` samples or fails with `CoreError::Io`.
    fn capture_samples(&mut self, n: usize) -> Result<Vec<IqSample>, CoreError>;
    /// Release all resources.
    fn close(&mut self) -> Result<(), CoreError>;

    fn sample_rate_hz(&self) -> u32;
}

/// Serves previously recorded wideband IQ in place of real hardware, so the
/// scan controller can run deterministically without SoapySDR/RTL-SDR
/// bindings. Not a production backend.
pub struct ReplaySdrDevice {
    samples: Vec<IqSample>,
    sample_rate_hz: u32,
    cursor: usize,
    streaming: bool,
    center_frequency_hz: f64,
}

impl ReplaySdrDevice {
    /// Loops over `samples` as if they were a live capture at `sample_rate_hz`.
    pub fn new(samples: Vec<IqSample>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
            cursor: 0,
            streaming: false,
            center_frequency_hz: 0.0,
        }
    }

    pub fn from_wav(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let (samples, metadata) = crate::io::read_iq_wav(path)?;
        Ok(Self::new(samples, metadata.sample_rate))
    }
}

impl SdrDevice for ReplaySdrDevice {
    fn initialize(&mut self) -> Result<(), CoreError> {
        if self.samples.is_empty() {
            return Err(CoreError::Config("replay source has no samples".into()));
        }
        Ok(())
    }

    fn tune(&mut self, frequency_hz: f64) -> Result<(), CoreError> {
        self.center_frequency_hz = frequency_hz;
        Ok(())
    }

    fn start_stream(&mut self) -> Result<(), CoreError> {
        self.streaming = true;
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), CoreError> {
        self.streaming = false;
        Ok(())
    }

    fn capture_samples(&mut self, n: usize) -> Result<Vec<IqSample>, CoreError> {
        if self.samples.is_empty() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "replay source exhausted with no samples to loop",
            )));
        }

        let mut out = Vec::with_capacity(n);
        let len = self.samples.len();
        for _ in 0..n {
            out.push(self.samples[self.cursor]);
            self.cursor = (self.cursor + 1) % len;
        }
        Ok(out)
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.streaming = false;
        Ok(())
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<IqSample> {
        (0..n).map(|i| IqSample::new(i as f32, -(i as f32))).collect()
    }

    #[test]
    fn capture_samples_loops_over_the_source() {
        let mut device = ReplaySdrDevice::new(samples(3), 48_000);
        device.initialize().unwrap();
        let block = device.capture_samples(7).unwrap();
        assert_eq!(block.len(), 7);
        assert_eq!(block[0].i, 0.0);
        assert_eq!(block[3].i, 0.0); // wrapped
        assert_eq!(block[6].i, 0.0); // wrapped twice
    }

    #[test]
    fn initialize_fails_on_empty_source() {
        let mut device = ReplaySdrDevice::new(Vec::new(), 48_000);
        assert!(device.initialize().is_err());
    }

    #[test]
    fn tune_and_stream_lifecycle_is_idempotent() {
        let mut device = ReplaySdrDevice::new(samples(5), 48_000);
        device.initialize().unwrap();
        device.tune(100_000_000.0).unwrap();
        device.start_stream().unwrap();
        device.start_stream().unwrap(); // idempotent
        device.stop_stream().unwrap();
        device.stop_stream().unwrap(); // idempotent
        device.close().unwrap();
    }
}
