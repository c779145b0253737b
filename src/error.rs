use thiserror::Error;

/// Errors shared by every stage of the scanning pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("requested {requested} samples but only {available} available")]
    InsufficientData { requested: usize, available: usize },

    #[error("output sample rate {output} must be less than input sample rate {input}")]
    InvalidRate { input: u32, output: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_contains_both_counts() {
        let err = CoreError::InsufficientData {
            requested: 100,
            available: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn invalid_rate_message_contains_both_rates() {
        let err = CoreError::InvalidRate {
            input: 48_000,
            output: 96_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("48000"));
        assert!(msg.contains("96000"));
    }

    #[test]
    fn config_error_carries_message() {
        let err = CoreError::Config("missing key `band`".to_string());
        assert!(err.to_string().contains("missing key"));
    }
}
