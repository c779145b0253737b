use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::CoreError;

#[derive(Debug, Clone, Deserialize)]
pub struct FftSettings {
    pub threshold_db: f32,
    pub min_distance_hz: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeakTrackerSettings {
    pub min_hits: usize,
    pub window_sec: u32,
}

/// Typed configuration, loaded from TOML. Field set matches the options
/// the scan controller and its pipeline stages recognize.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub driver: String,
    pub band: String,
    pub band_frequencies: HashMap<String, Vec<f64>>,
    pub iq_sample_rate_hz: u32,
    pub rf_gain_db: i32,
    pub scan_duration_sec: f64,
    pub min_voice_bandwidth_hz: u32,
    pub narrowband_sample_rate_hz: u32,
    pub narrowband_capture_duration_sec: u32,
    pub fft: FftSettings,
    pub peak_tracker: PeakTrackerSettings,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(CoreError::Io)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CoreError> {
        toml::from_str(raw).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// The configured center frequencies for the selected band.
    pub fn band_centers(&self) -> Result<&[f64], CoreError> {
        self.band_frequencies
            .get(&self.band)
            .map(|v| v.as_slice())
            .ok_or_else(|| CoreError::Config(format!("unknown band `{}`", self.band)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        driver = "rtlsdr"
        band = "vhf"
        iq_sample_rate_hz = 2400000
        rf_gain_db = 20
        scan_duration_sec = 1.0
        min_voice_bandwidth_hz = 3000
        narrowband_sample_rate_hz = 48000
        narrowband_capture_duration_sec = 4

        [band_frequencies]
        vhf = [145500000.0, 146520000.0]

        [fft]
        threshold_db = 10.0
        min_distance_hz = 5000

        [peak_tracker]
        min_hits = 3
        window_sec = 10
    "#;

    #[test]
    fn parses_a_well_formed_config() {
        let settings = Settings::from_toml_str(VALID).unwrap();
        assert_eq!(settings.driver, "rtlsdr");
        assert_eq!(settings.band_centers().unwrap(), &[145_500_000.0, 146_520_000.0]);
        assert_eq!(settings.fft.min_distance_hz, 5000);
        assert_eq!(settings.peak_tracker.min_hits, 3);
    }

    #[test]
    fn missing_required_key_fails_with_config_error() {
        let missing_driver = VALID.replacen("driver = \"rtlsdr\"", "", 1);
        let err = Settings::from_toml_str(&missing_driver).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn wrong_type_fails_with_config_error() {
        let bad_type = VALID.replacen("rf_gain_db = 20", "rf_gain_db = \"loud\"", 1);
        let err = Settings::from_toml_str(&bad_type).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn unknown_band_fails_at_lookup() {
        let settings = Settings::from_toml_str(VALID).unwrap();
        let mut settings = settings;
        settings.band = "uhf".to_string();
        assert!(settings.band_centers().is_err());
    }
}
