use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use std::f32::consts::PI;

use crate::sample::IqSample;

/// Per-section Q for a 4th-order Butterworth built from two cascaded
/// 2nd-order sections: `Q_k = 1 / (2 cos(theta_k))`,
/// `theta_k = pi(2k+1) / (2*order)`, for `k = 0, 1`.
fn butterworth_section_qs(order: usize) -> [f32; 2] {
    debug_assert_eq!(order, 4);
    std::array::from_fn(|k| {
        let theta = PI * (2 * k + 1) as f32 / (2.0 * order as f32);
        1.0 / (2.0 * theta.cos())
    })
}

/// 4th-order zero-phase Butterworth low-pass, realized as two cascaded
/// 2nd-order sections applied forward then backward.
struct ZeroPhaseButterworth {
    sections: [Coefficients<f32>; 2],
}

impl ZeroPhaseButterworth {
    fn new(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        let qs = butterworth_section_qs(4);
        let sections = qs.map(|q| {
            Coefficients::<f32>::from_params(
                Type::LowPass,
                sample_rate_hz.hz(),
                cutoff_hz.hz(),
                q,
            )
            .expect("low-pass coefficients should be valid for a positive cutoff below Nyquist")
        });
        Self { sections }
    }

    fn filter_one_pass(&self, input: &[f32]) -> Vec<f32> {
        let mut filters = self
            .sections
            .map(|coeffs| DirectForm2Transposed::<f32>::new(coeffs));
        input
            .iter()
            .map(|&x| {
                let mut y = x;
                for filter in filters.iter_mut() {
                    y = filter.run(y);
                }
                y
            })
            .collect()
    }

    /// Forward-backward (zero-phase) filtering of a whole buffer.
    fn filter_zero_phase(&self, input: &[f32]) -> Vec<f32> {
        let forward = self.filter_one_pass(input);
        let mut reversed: Vec<f32> = forward.into_iter().rev().collect();
        reversed = self.filter_one_pass(&reversed);
        reversed.reverse();
        reversed
    }
}

/// Confirms speech-like amplitude modulation on a narrowband capture:
/// voice bursts at 2-20 Hz produce high coefficient of variation and
/// peak-to-average ratio; constant carriers do not.
pub struct EnvelopeClassifier {
    pub cv_threshold: f32,
    pub lp_cutoff_hz: f32,
}

impl Default for EnvelopeClassifier {
    fn default() -> Self {
        Self {
            cv_threshold: 0.3,
            lp_cutoff_hz: 20.0,
        }
    }
}

impl EnvelopeClassifier {
    pub fn new(cv_threshold: f32, lp_cutoff_hz: f32) -> Self {
        Self {
            cv_threshold,
            lp_cutoff_hz,
        }
    }

    pub fn is_speech_like(&self, narrow_iq: &[IqSample], sample_rate_hz: u32) -> bool {
        if narrow_iq.is_empty() {
            return false;
        }

        let envelope0: Vec<f32> = narrow_iq.iter().map(|s| s.magnitude()).collect();
        let filter = ZeroPhaseButterworth::new(self.lp_cutoff_hz, sample_rate_hz as f32);
        let envelope = filter.filter_zero_phase(&envelope0);

        let n = envelope.len() as f32;
        let mean_env = envelope.iter().sum::<f32>() / n;
        if mean_env < 1e-8 {
            return false;
        }

        let variance = envelope.iter().map(|&e| (e - mean_env).powi(2)).sum::<f32>() / n;
        let cv = variance.sqrt() / mean_env;
        let par = envelope.iter().cloned().fold(f32::MIN, f32::max) / mean_env;

        cv > self.cv_threshold && par > 1.5
    }
}
