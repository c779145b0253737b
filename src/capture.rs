use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::IqSample;

/// A validated narrowband capture, ready to hand off to a `CaptureQueue`.
///
/// Field names are renamed on the wire to match the schema fixed by the
/// external capture-queue contract, not this crate's own naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    #[serde(rename = "center_frequency")]
    pub center_frequency_hz: f64,
    #[serde(rename = "signal_frequency")]
    pub signal_frequency_hz: f64,
    pub power_db: f32,
    #[serde(rename = "bandwidth")]
    pub bandwidth_hz: f32,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sample_rate")]
    pub sample_rate_hz: u32,
    #[serde(with = "iq_data_serde")]
    pub iq_data: Vec<IqSample>,
}

mod iq_data_serde {
    use super::IqSample;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Pair(f32, f32);

    pub fn serialize<S: Serializer>(samples: &[IqSample], serializer: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<Pair> = samples.iter().map(|s| Pair(s.i, s.q)).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<IqSample>, D::Error> {
        let pairs = Vec::<Pair>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(|Pair(i, q)| IqSample::new(i, q)).collect())
    }
}
