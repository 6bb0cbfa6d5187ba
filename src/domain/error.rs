//! Domain error types.

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("bar {index} is missing field {field}")]
    MissingField { index: usize, field: String },

    #[error("bar {index} is not strictly after the previous bar")]
    UnorderedBars { index: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub(crate) fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        SigtraderError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Fatal errors abort a run; `InsufficientData` is reported alongside a result.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SigtraderError::InsufficientData { .. })
    }
}

impl From<csv::Error> for SigtraderError {
    fn from(err: csv::Error) -> Self {
        SigtraderError::Data {
            reason: format!("CSV error: {err}"),
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::InvalidParameter { .. } => 2,
            SigtraderError::Data { .. }
            | SigtraderError::MissingField { .. }
            | SigtraderError::UnorderedBars { .. } => 3,
            SigtraderError::NoData { .. } | SigtraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_the_key() {
        let err = SigtraderError::invalid("macd_fast", "must be less than macd_slow");
        assert_eq!(
            err.to_string(),
            "invalid parameter macd_fast: must be less than macd_slow"
        );
    }

    #[test]
    fn missing_field_names_the_bar() {
        let err = SigtraderError::MissingField {
            index: 7,
            field: "close".into(),
        };
        assert_eq!(err.to_string(), "bar 7 is missing field close");
    }

    #[test]
    fn only_insufficient_data_is_non_fatal() {
        assert!(!SigtraderError::InsufficientData { bars: 3, minimum: 36 }.is_fatal());
        assert!(SigtraderError::UnorderedBars { index: 2 }.is_fatal());
        assert!(SigtraderError::invalid("bb_period", "too small").is_fatal());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SigtraderError = io.into();
        assert!(matches!(
            err,
            SigtraderError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound
        ));
        assert_eq!(err.to_string(), "gone");
    }
}
