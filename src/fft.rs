use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

use crate::peak_detector::{Peak, PeakDetector};
use crate::sample::IqSample;

const EPSILON: f32 = 1e-10;

/// A spectral peak with an estimated occupied bandwidth, relative to the
/// center frequency the block was captured around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRegion {
    pub frequency_offset_hz: f64,
    pub power_db: f32,
    pub index: usize,
    pub bandwidth_hz: f64,
}

/// Generate Hann window coefficients of the given length.
fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / (size - 1) as f32).cos())
        .collect()
}

/// Windowed FFT -> centered power spectrum in dB, plus the peak detector and
/// bandwidth estimation that ride on top of it.
pub struct FftProcessor {
    pub sample_rate_hz: u32,
    pub detector: PeakDetector,
}

impl FftProcessor {
    pub fn new(sample_rate_hz: u32, detector: PeakDetector) -> Self {
        Self {
            sample_rate_hz,
            detector,
        }
    }

    /// Applies a Hann window, computes a full-length forward FFT, shifts so
    /// DC is centered, and returns `(freqs, spectrum_db)` with
    /// `freqs[k]` the shifted bin frequency in Hz relative to Fc.
    pub fn compute_spectrum(&self, block: &[IqSample]) -> (Vec<f64>, Vec<f32>) {
        let n = block.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }

        let window = hann_window(n);
        let mut buffer: Vec<Complex<f32>> = block
            .iter()
            .zip(window.iter())
            .map(|(s, w)| Complex::new(s.i * w, s.q * w))
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let bin_width = self.sample_rate_hz as f64 / n as f64;
        let half = n / 2;

        // fftshift: bins [half..n) (negative frequencies) first, then [0..half).
        let mut spectrum_db = Vec::with_capacity(n);
        let mut freqs = Vec::with_capacity(n);
        for k in 0..n {
            let shifted_idx = (k + half) % n;
            let mag = buffer[shifted_idx].norm();
            spectrum_db.push(20.0 * (mag + EPSILON).log10());
            let signed_k = k as i64 - half as i64;
            freqs.push(signed_k as f64 * bin_width);
        }

        (freqs, spectrum_db)
    }

    /// Computes the spectrum, detects peaks, then estimates each peak's
    /// 3-dB-down bandwidth by walking outward from the peak bin.
    pub fn extract_peak_regions(&self, block: &[IqSample]) -> Vec<PeakRegion> {
        let (freqs, spectrum_db) = self.compute_spectrum(block);
        if spectrum_db.is_empty() {
            return Vec::new();
        }

        let n = spectrum_db.len();
        let bin_width = self.sample_rate_hz as f64 / n as f64;
        let peaks = self.detector.detect(&freqs, &spectrum_db);

        peaks
            .into_iter()
            .map(|peak| {
                let bandwidth_hz = self.estimate_bandwidth(&spectrum_db, &peak, bin_width);
                PeakRegion {
                    frequency_offset_hz: peak.frequency_offset_hz,
                    power_db: peak.power_db,
                    index: peak.index,
                    bandwidth_hz,
                }
            })
            .collect()
    }

    fn estimate_bandwidth(&self, spectrum_db: &[f32], peak: &Peak, bin_width: f64) -> f64 {
        let min_distance_hz = self.detector.min_distance_hz;
        let search_window = ((0.5 * min_distance_hz / bin_width).floor() as usize).max(1);
        let n = spectrum_db.len();
        let threshold = peak.power_db - 3.0;

        let mut left = peak.index;
        let left_limit = peak.index.saturating_sub(search_window);
        loop {
            if left == left_limit {
                break;
            }
            if spectrum_db[left] < threshold {
                break;
            }
            left -= 1;
        }

        let right_limit = (peak.index + search_window).min(n - 1);
        let mut right = peak.index;
        loop {
            if right == right_limit {
                break;
            }
            if spectrum_db[right] < threshold {
                break;
            }
            right += 1;
        }

        let floor_hz = min_distance_hz.max(10.0 * bin_width);
        let measured = (right - left) as f64 * bin_width;
        measured.max(floor_hz)
    }
}
