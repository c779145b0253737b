use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::buffer::CircularIqBuffer;
use crate::capture::Capture;
use crate::config::Settings;
use crate::downconverter::VirtualReceiver;
use crate::envelope::EnvelopeClassifier;
use crate::error::CoreError;
use crate::fft::FftProcessor;
use crate::frequency_observer::FrequencyObserver;
use crate::peak_detector::PeakDetector;
use crate::peak_tracker::PeakTracker;
use crate::queue::CaptureQueue;
use crate::sdr::SdrDevice;

/// Observer/tracker tuning not carried in `Settings` directly but fixed by
/// the reference implementation this crate follows.
const OBSERVER_WINDOW_SEC: f64 = 30.0;
const OBSERVER_ACTIVITY_THRESHOLD_DB: f32 = 6.0;
const OBSERVER_DUTY_CYCLE_THRESH: f64 = 0.7;
const OBSERVER_CV_THRESH: f64 = 0.2;
/// Consecutive per-center I/O failures before the controller gives up and
/// stops the scan loop entirely — the device is presumed unusable.
const MAX_CONSECUTIVE_IO_FAILURES: u32 = 5;

/// Cycles through the configured center frequencies, driving capture ->
/// detect -> track -> downconvert -> classify -> enqueue on a fixed period.
/// Exclusively owns every pipeline component; the SDR and capture queue are
/// injected external collaborators.
pub struct ScanController<S: SdrDevice, Q: CaptureQueue> {
    sdr: S,
    queue: Q,
    settings: Settings,
    running: Arc<AtomicBool>,

    center_buffers: HashMap<u64, CircularIqBuffer>,
    fft: FftProcessor,
    peak_tracker: PeakTracker,
    freq_observer: FrequencyObserver,
    envelope: EnvelopeClassifier,

    clock_origin: Instant,
}

fn freq_key(freq_hz: f64) -> u64 {
    freq_hz.to_bits()
}

impl<S: SdrDevice, Q: CaptureQueue> ScanController<S, Q> {
    pub fn new(sdr: S, queue: Q, settings: Settings, running: Arc<AtomicBool>) -> Self {
        let detector = PeakDetector::new(settings.fft.threshold_db, settings.fft.min_distance_hz as f64);
        let fft = FftProcessor::new(settings.iq_sample_rate_hz, detector);
        let peak_tracker = PeakTracker::new(
            settings.peak_tracker.min_hits,
            settings.peak_tracker.window_sec as f64,
        );
        let freq_observer = FrequencyObserver::new(OBSERVER_WINDOW_SEC, OBSERVER_ACTIVITY_THRESHOLD_DB);

        Self {
            sdr,
            queue,
            settings,
            running,
            center_buffers: HashMap::new(),
            fft,
            peak_tracker,
            freq_observer,
            envelope: EnvelopeClassifier::default(),
            clock_origin: Instant::now(),
        }
    }

    fn now(&self) -> f64 {
        self.clock_origin.elapsed().as_secs_f64()
    }

    /// Access to the capture sink, e.g. to drain it after shutdown.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Runs the scan loop until `running` is cleared or the device proves
    /// unusable. Guarantees `sdr.close()` on every exit path.
    pub fn run(&mut self) -> Result<(), CoreError> {
        self.sdr.initialize()?;
        let result = self.run_loop();
        // Guaranteed close regardless of how run_loop exited.
        let close_result = self.sdr.close();
        self.center_buffers.clear();
        self.peak_tracker.clear();
        self.running.store(false, Ordering::Relaxed);
        result.and(close_result)
    }

    fn run_loop(&mut self) -> Result<(), CoreError> {
        let centers: Vec<f64> = self.settings.band_centers()?.to_vec();
        let mut consecutive_io_failures = 0u32;

        while self.running.load(Ordering::Relaxed) {
            for &center_freq in &centers {
                if !self.running.load(Ordering::Relaxed) {
                    break;
                }

                if !self.center_buffers.contains_key(&freq_key(center_freq)) {
                    self.init_center_frequency(center_freq);
                }

                debug!(center_freq, "scanning center frequency");
                self.sdr.tune(center_freq)?;
                self.sdr.start_stream()?;

                let num_samples =
                    (self.settings.iq_sample_rate_hz as f64 * self.settings.scan_duration_sec) as usize;
                let t0 = Instant::now();

                match self.sdr.capture_samples(num_samples) {
                    Ok(block) => {
                        consecutive_io_failures = 0;
                        self.handle_center_iq_block(center_freq, &block);
                    }
                    Err(CoreError::Io(e)) => {
                        consecutive_io_failures += 1;
                        warn!(center_freq, error = %e, "SDR read failed; aborting this center's block");
                        if consecutive_io_failures >= MAX_CONSECUTIVE_IO_FAILURES {
                            return Err(CoreError::Io(std::io::Error::new(
                                e.kind(),
                                "too many consecutive SDR read failures; device presumed unusable",
                            )));
                        }
                    }
                    Err(other) => return Err(other),
                }

                let elapsed = t0.elapsed();
                let period = Duration::from_secs_f64(self.settings.scan_duration_sec);
                if let Some(remaining) = period.checked_sub(elapsed) {
                    std::thread::sleep(remaining);
                }

                self.sdr.stop_stream()?;
            }
        }

        Ok(())
    }

    fn init_center_frequency(&mut self, center_freq: f64) {
        let duration = (self.settings.narrowband_capture_duration_sec as f64 * 2.0).max(30.0);
        let buffer = CircularIqBuffer::new(self.settings.iq_sample_rate_hz, duration);
        self.center_buffers.insert(freq_key(center_freq), buffer);
        debug!(center_freq, "initialized buffer for center frequency");
    }

    fn handle_center_iq_block(&mut self, center_freq: f64, block: &[crate::sample::IqSample]) {
        if let Some(buffer) = self.center_buffers.get_mut(&freq_key(center_freq)) {
            buffer.append(block);
        }

        let regions = self.fft.extract_peak_regions(block);
        let filtered: Vec<_> = regions
            .into_iter()
            .filter(|r| r.bandwidth_hz >= self.settings.min_voice_bandwidth_hz as f64)
            .collect();

        let now = self.now();
        let stable = self.peak_tracker.update_and_filter(now, &filtered);

        if stable.is_empty() {
            debug!("no stable peaks detected");
            return;
        }

        info!(count = stable.len(), "detected stable peak(s)");
        for region in stable {
            let signal_freq = center_freq + region.frequency_offset_hz;
            self.freq_observer.update(signal_freq, region.power_db, now);
            debug!(
                signal_freq,
                power_db = region.power_db,
                bandwidth_hz = region.bandwidth_hz,
                "stable peak"
            );
            self.process_detected_peak(center_freq, signal_freq, region.power_db, region.bandwidth_hz, now);
        }
    }

    fn process_detected_peak(
        &mut self,
        center_freq: f64,
        signal_freq: f64,
        power_db: f32,
        bandwidth_hz: f64,
        now: f64,
    ) {
        if self.freq_observer.is_continuous(
            signal_freq,
            now,
            OBSERVER_DUTY_CYCLE_THRESH,
            OBSERVER_CV_THRESH,
        ) {
            debug!(signal_freq, "rejected: continuous signal");
            return;
        }

        let wide_iq = match self
            .center_buffers
            .get(&freq_key(center_freq))
            .map(|b| b.extract_recent(self.settings.narrowband_capture_duration_sec as f64))
        {
            Some(Ok(samples)) => samples,
            Some(Err(e)) => {
                warn!(signal_freq, error = %e, "buffer error, skipping capture");
                return;
            }
            None => {
                warn!(signal_freq, "no buffer for this center, skipping capture");
                return;
            }
        };

        let receiver = match VirtualReceiver::new(
            center_freq,
            signal_freq,
            self.settings.iq_sample_rate_hz,
            self.settings.narrowband_sample_rate_hz,
        ) {
            Ok(r) => r,
            Err(e) => {
                warn!(signal_freq, error = %e, "downconversion setup failed, skipping capture");
                return;
            }
        };

        let narrow_iq = receiver.extract_subband_zero_phase(&wide_iq);

        if !self
            .envelope
            .is_speech_like(&narrow_iq, self.settings.narrowband_sample_rate_hz)
        {
            debug!(signal_freq, "rejected: non-speech-like envelope");
            return;
        }

        let capture = Capture {
            center_frequency_hz: center_freq,
            signal_frequency_hz: signal_freq,
            power_db,
            bandwidth_hz: bandwidth_hz as f32,
            timestamp: Utc::now(),
            sample_rate_hz: self.settings.narrowband_sample_rate_hz,
            iq_data: narrow_iq,
        };
        self.queue.put(capture);
        info!(signal_freq, "captured signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryCaptureQueue;
    use crate::sample::IqSample;
    use crate::sdr::ReplaySdrDevice;
    use std::f32::consts::PI;

    fn am_tone_block(n: usize, sample_rate: f32, tone_offset_hz: f32) -> Vec<IqSample> {
        (0..n)
            .map(|k| {
                let t = k as f32 / sample_rate;
                let envelope = 0.6 + 0.4 * (2.0 * PI * 5.0 * t).sin();
                let phase = 2.0 * PI * tone_offset_hz * t;
                IqSample::new(envelope * phase.cos(), envelope * phase.sin())
            })
            .collect()
    }

    fn test_settings() -> Settings {
        let toml = r#"
            driver = "replay"
            band = "test"
            iq_sample_rate_hz = 48000
            rf_gain_db = 20
            scan_duration_sec = 1.0
            min_voice_bandwidth_hz = 500
            narrowband_sample_rate_hz = 8000
            narrowband_capture_duration_sec = 1

            [band_frequencies]
            test = [100000000.0]

            [fft]
            threshold_db = 10.0
            min_distance_hz = 2000

            [peak_tracker]
            min_hits = 3
            window_sec = 10
        "#;
        Settings::from_toml_str(toml).unwrap()
    }

    #[test]
    fn end_to_end_am_tone_is_captured_after_three_cycles() {
        let settings = test_settings();
        let sample_rate = settings.iq_sample_rate_hz;

        // 60s of AM-modulated tone, +20dB above the noise within voice bandwidth.
        let mut long_block = Vec::new();
        for _ in 0..60 {
            long_block.extend(am_tone_block(sample_rate as usize, sample_rate as f32, 25_000.0));
        }

        let sdr = ReplaySdrDevice::new(long_block, sample_rate);
        let queue = InMemoryCaptureQueue::new();
        let running = Arc::new(AtomicBool::new(true));

        let mut controller = ScanController::new(sdr, queue, settings, running.clone());
        controller.sdr.initialize().unwrap();

        let centers = controller.settings.band_centers().unwrap().to_vec();
        let center = centers[0];
        controller.init_center_frequency(center);

        for cycle in 0..3 {
            controller.sdr.tune(center).unwrap();
            controller.sdr.start_stream().unwrap();
            let block = controller.sdr.capture_samples(sample_rate as usize).unwrap();
            controller.handle_center_iq_block(center, &block);
            controller.sdr.stop_stream().unwrap();
            let _ = cycle;
        }

        assert!(!controller.queue.empty());
        let capture = controller.queue.get().expect("a capture should be queued");
        assert_eq!(capture.sample_rate_hz, settings_narrowband_rate());
    }

    fn settings_narrowband_rate() -> u32 {
        8000
    }

    fn test_settings_two_centers() -> Settings {
        let toml = r#"
            driver = "replay"
            band = "test"
            iq_sample_rate_hz = 48000
            rf_gain_db = 20
            scan_duration_sec = 1.0
            min_voice_bandwidth_hz = 500
            narrowband_sample_rate_hz = 8000
            narrowband_capture_duration_sec = 1

            [band_frequencies]
            test = [100000000.0, 200000000.0]

            [fft]
            threshold_db = 10.0
            min_distance_hz = 2000

            [peak_tracker]
            min_hits = 3
            window_sec = 10
        "#;
        Settings::from_toml_str(toml).unwrap()
    }

    #[test]
    fn revisiting_a_center_does_not_discard_its_accumulated_buffer() {
        let settings = test_settings_two_centers();
        let sample_rate = settings.iq_sample_rate_hz;
        let block: Vec<IqSample> = (0..sample_rate).map(|i| IqSample::new(i as f32, 0.0)).collect();

        let sdr = ReplaySdrDevice::new(block.clone(), sample_rate);
        let queue = InMemoryCaptureQueue::new();
        let running = Arc::new(AtomicBool::new(true));
        let mut controller = ScanController::new(sdr, queue, settings, running);
        controller.sdr.initialize().unwrap();

        let centers = controller.settings.band_centers().unwrap().to_vec();

        // Round 1: round-robin across both centers, same gating `run_loop` uses.
        for &center in &centers {
            if !controller.center_buffers.contains_key(&freq_key(center)) {
                controller.init_center_frequency(center);
            }
            controller.handle_center_iq_block(center, &block);
        }

        let available_after_round_one = controller
            .center_buffers
            .get(&freq_key(centers[0]))
            .unwrap()
            .available();
        assert!(available_after_round_one > 0);

        // Round 2: revisit the first center. Its buffer must already be
        // present (not reallocated from scratch) so the accumulated samples
        // survive the return visit.
        let first_center = centers[0];
        assert!(controller.center_buffers.contains_key(&freq_key(first_center)));
        let available_before_round_two = controller
            .center_buffers
            .get(&freq_key(first_center))
            .unwrap()
            .available();
        assert_eq!(available_before_round_two, available_after_round_one);
    }
}
