use rustfft::num_complex::Complex;

/// IQ sample pair (In-phase, Quadrature)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqSample {
    pub i: f32,
    pub q: f32,
}

impl IqSample {
    pub fn new(i: f32, q: f32) -> Self {
        Self { i, q }
    }

    pub fn magnitude(&self) -> f32 {
        (self.i * self.i + self.q * self.q).sqrt()
    }
}

impl From<IqSample> for Complex<f32> {
    fn from(s: IqSample) -> Self {
        Complex::new(s.i, s.q)
    }
}

impl From<Complex<f32>> for IqSample {
    fn from(c: Complex<f32>) -> Self {
        IqSample::new(c.re, c.im)
    }
}

/// Metadata about an IQ source: sample rate and, for finite sources, total length.
#[derive(Debug, Clone, Copy)]
pub struct IqMetadata {
    pub sample_rate: u32,
    pub total_samples: Option<usize>,
}
