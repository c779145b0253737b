use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::error::CoreError;
use crate::sample::IqSample;

const FIR_TAPS: usize = 101;
const KAISER_BETA: f64 = 5.0;

/// Digital-only tuner: mixes a target frequency to baseband, low-pass
/// filters to suppress images, and decimates to the output rate without
/// retuning the hardware.
pub struct VirtualReceiver {
    freq_offset_hz: f64,
    input_sample_rate: u32,
    decimation: usize,
    taps: Vec<f64>,
}

impl VirtualReceiver {
    /// `output_sample_rate` must be strictly less than `input_sample_rate`.
    pub fn new(
        center_freq_hz: f64,
        target_freq_hz: f64,
        input_sample_rate: u32,
        output_sample_rate: u32,
    ) -> Result<Self, CoreError> {
        if output_sample_rate >= input_sample_rate {
            return Err(CoreError::InvalidRate {
                input: input_sample_rate,
                output: output_sample_rate,
            });
        }

        let freq_offset_hz = target_freq_hz - center_freq_hz;
        let decimation = input_sample_rate as usize / output_sample_rate as usize;
        let cutoff_hz = 0.9 * (output_sample_rate as f64 / 2.0);
        let taps = design_lowpass_fir(FIR_TAPS, cutoff_hz, input_sample_rate as f64, KAISER_BETA);

        Ok(Self {
            freq_offset_hz,
            input_sample_rate,
            decimation,
            taps,
        })
    }

    /// Mix to baseband, FIR low-pass (forward only), decimate.
    pub fn extract_subband(&self, block: &[IqSample]) -> Vec<IqSample> {
        let mixed = self.mix(block);
        let filtered = apply_fir(&self.taps, &mixed);
        decimate(&filtered, self.decimation)
    }

    /// Same as `extract_subband`, but filters forward then backward for
    /// zero phase — acceptable when the block is already buffered
    /// retrospectively (no causality requirement for a batch capture).
    pub fn extract_subband_zero_phase(&self, block: &[IqSample]) -> Vec<IqSample> {
        let mixed = self.mix(block);
        let forward = apply_fir(&self.taps, &mixed);
        let mut reversed: Vec<Complex<f64>> = forward.into_iter().rev().collect();
        reversed = apply_fir(&self.taps, &reversed);
        reversed.reverse();
        decimate(&reversed, self.decimation)
    }

    fn mix(&self, block: &[IqSample]) -> Vec<Complex<f64>> {
        let angular_step = -2.0 * PI * self.freq_offset_hz / self.input_sample_rate as f64;
        block
            .iter()
            .enumerate()
            .map(|(k, s)| {
                let phase = angular_step * k as f64;
                let rotor = Complex::new(phase.cos(), phase.sin());
                Complex::new(s.i as f64, s.q as f64) * rotor
            })
            .collect()
    }
}

fn bessel_i0(x: f64) -> f64 {
    // Series expansion, accurate enough for filter-design windows.
    let mut sum = 1.0;
    let mut term = 1.0;
    let half_x_sq = (x / 2.0) * (x / 2.0);
    for k in 1..=25 {
        term *= half_x_sq / (k as f64 * k as f64);
        sum += term;
    }
    sum
}

fn kaiser_window(size: usize, beta: f64) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let n = (size - 1) as f64;
    let denom = bessel_i0(beta);
    (0..size)
        .map(|i| {
            let x = 2.0 * i as f64 / n - 1.0;
            bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) / denom
        })
        .collect()
}

/// Designs a linear-phase low-pass FIR via the windowed-sinc method.
fn design_lowpass_fir(num_taps: usize, cutoff_hz: f64, sample_rate: f64, beta: f64) -> Vec<f64> {
    let window = kaiser_window(num_taps, beta);
    let fc = cutoff_hz / sample_rate; // normalized cutoff, cycles/sample
    let mid = (num_taps - 1) as f64 / 2.0;

    let mut taps: Vec<f64> = (0..num_taps)
        .map(|n| {
            let m = n as f64 - mid;
            let sinc = if m.abs() < 1e-9 {
                2.0 * fc
            } else {
                (2.0 * PI * fc * m).sin() / (PI * m)
            };
            sinc * window[n]
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    if sum.abs() > 1e-12 {
        for tap in taps.iter_mut() {
            *tap /= sum;
        }
    }
    taps
}

fn apply_fir(taps: &[f64], signal: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let num_taps = taps.len();
    let n = signal.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut acc = Complex::new(0.0, 0.0);
        for (t, &tap) in taps.iter().enumerate() {
            let j = i as i64 - (num_taps as i64 - 1) + t as i64;
            if j >= 0 && (j as usize) < n {
                acc += signal[j as usize] * tap;
            }
        }
        out.push(acc);
    }
    out
}

fn decimate(signal: &[Complex<f64>], factor: usize) -> Vec<IqSample> {
    if factor <= 1 {
        return signal
            .iter()
            .map(|c| IqSample::new(c.re as f32, c.im as f32))
            .collect();
    }
    signal
        .iter()
        .step_by(factor)
        .map(|c| IqSample::new(c.re as f32, c.im as f32))
        .collect()
}
