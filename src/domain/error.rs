//! Domain error types.

/// Top-level error type for arascan.
#[derive(Debug, thiserror::Error)]
pub enum ArascanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data provider error: {reason}")]
    Provider { reason: String },

    #[error("no data available for {scope}")]
    DataUnavailable { scope: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArascanError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ArascanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        ArascanError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&ArascanError> for std::process::ExitCode {
    fn from(err: &ArascanError) -> Self {
        let code: u8 = match err {
            ArascanError::Io(_) => 1,
            ArascanError::ConfigParse { .. }
            | ArascanError::ConfigMissing { .. }
            | ArascanError::ConfigInvalid { .. } => 2,
            ArascanError::Provider { .. } => 3,
            ArascanError::DataUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_helper_formats_message() {
        let err = ArascanError::invalid("profile.default", "min_price", "must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid config value [profile.default] min_price: must be non-negative"
        );
    }

    #[test]
    fn missing_helper_formats_message() {
        let err = ArascanError::missing("screen", "reference_date");
        assert_eq!(err.to_string(), "missing config key [screen] reference_date");
    }

    #[test]
    fn data_unavailable_message() {
        let err = ArascanError::DataUnavailable {
            scope: "batch of 3 symbols".into(),
        };
        assert_eq!(err.to_string(), "no data available for batch of 3 symbols");
    }
}
