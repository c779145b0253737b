/// A detected spectral peak, relative to the center frequency the spectrum
/// was computed around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub frequency_offset_hz: f64,
    pub power_db: f32,
    pub index: usize,
}

/// Median-noise-floor threshold detector with power-sorted non-maximum
/// suppression by minimum frequency spacing.
pub struct PeakDetector {
    pub offset_db: f32,
    pub min_distance_hz: f64,
}

impl PeakDetector {
    pub fn new(offset_db: f32, min_distance_hz: f64) -> Self {
        Self {
            offset_db,
            min_distance_hz,
        }
    }

    /// Deterministic single pass: median threshold, local-maxima candidates,
    /// then non-maximum suppression ordered by descending power.
    pub fn detect(&self, freqs: &[f64], spectrum_db: &[f32]) -> Vec<Peak> {
        if spectrum_db.is_empty() {
            return Vec::new();
        }

        let noise_floor = median(spectrum_db);
        let threshold = noise_floor + self.offset_db;

        let mut candidates: Vec<Peak> = Vec::new();
        for i in 0..spectrum_db.len() {
            let power = spectrum_db[i];
            if power <= threshold {
                continue;
            }
            let is_local_max = match (i.checked_sub(1), spectrum_db.get(i + 1)) {
                (Some(prev), Some(&next)) => power > spectrum_db[prev] && power > next,
                (None, Some(&next)) => power > next,
                (Some(prev), None) => power > spectrum_db[prev],
                (None, None) => true,
            };
            if is_local_max {
                candidates.push(Peak {
                    frequency_offset_hz: freqs[i],
                    power_db: power,
                    index: i,
                });
            }
        }

        // Strongest first; tie-break on lower bin index so suppression is
        // deterministic.
        candidates.sort_by(|a, b| {
            b.power_db
                .partial_cmp(&a.power_db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });

        let mut accepted: Vec<Peak> = Vec::new();
        for candidate in candidates {
            let too_close = accepted.iter().any(|p| {
                (p.frequency_offset_hz - candidate.frequency_offset_hz).abs() < self.min_distance_hz
            });
            if !too_close {
                accepted.push(candidate);
            }
        }

        accepted.sort_by(|a, b| {
            a.frequency_offset_hz
                .partial_cmp(&b.frequency_offset_hz)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        accepted
    }
}

fn median(values: &[f32]) -> f32 {
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
