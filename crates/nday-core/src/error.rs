use thiserror::Error;

/// Top-level error type for the nday system.
///
/// Storage failures are split into transient (`Storage`) and unrecoverable
/// (`StorageCorruption`) so the host can decide whether to offer rebuilding
/// the store. Subsystem crates convert their backend errors into one of these
/// variants at the crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NdayError {
    #[error("Invalid bury duration: {0}")]
    InvalidSpec(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage corrupted: {0}")]
    StorageCorruption(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NdayError {
    /// Whether the durable store is unusable for the rest of the session.
    pub fn is_corruption(&self) -> bool {
        matches!(self, NdayError::StorageCorruption(_))
    }

    /// Message suitable for a dialog or terminal, without internal prefixes.
    pub fn user_message(&self) -> String {
        match self {
            NdayError::InvalidSpec(reason) => format!(
                "Invalid input ({}). Please enter a number or range like '1-100'.",
                reason
            ),
            NdayError::Storage(reason) => format!(
                "Could not save bury state ({}). Nothing was changed; try again.",
                reason
            ),
            NdayError::StorageCorruption(reason) => format!(
                "The bury database is damaged ({}). It can be reset, which forgets all current buries.",
                reason
            ),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for NdayError {
    fn from(err: toml::de::Error) -> Self {
        NdayError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NdayError {
    fn from(err: toml::ser::Error) -> Self {
        NdayError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NdayError {
    fn from(err: serde_json::Error) -> Self {
        NdayError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for nday operations.
pub type Result<T> = std::result::Result<T, NdayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NdayError::InvalidSpec("empty input".to_string());
        assert_eq!(err.to_string(), "Invalid bury duration: empty input");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(NdayError, &str)> = vec![
            (
                NdayError::InvalidSpec("50-10".to_string()),
                "Invalid bury duration: 50-10",
            ),
            (
                NdayError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                NdayError::StorageCorruption("file is not a database".to_string()),
                "Storage corrupted: file is not a database",
            ),
            (
                NdayError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                NdayError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let nday_err: NdayError = io_err.into();
        assert!(matches!(nday_err, NdayError::Io(_)));
        assert!(nday_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let nday_err: NdayError = err.unwrap_err().into();
        assert!(matches!(nday_err, NdayError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let nday_err: NdayError = err.unwrap_err().into();
        assert!(matches!(nday_err, NdayError::Serialization(_)));
    }

    #[test]
    fn test_is_corruption() {
        assert!(NdayError::StorageCorruption("x".into()).is_corruption());
        assert!(!NdayError::Storage("x".into()).is_corruption());
        assert!(!NdayError::InvalidSpec("x".into()).is_corruption());
    }

    #[test]
    fn test_user_message_hides_variant_prefix() {
        let msg = NdayError::InvalidSpec("LOW is greater than HIGH".into()).user_message();
        assert!(msg.starts_with("Invalid input"));
        assert!(msg.contains("'1-100'"));
        assert!(!msg.contains("Invalid bury duration"));

        let msg = NdayError::StorageCorruption("bad row".into()).user_message();
        assert!(msg.contains("reset"));
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let err = NdayError::Config("missing field".into());
        assert_eq!(err.user_message(), "Configuration error: missing field");
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
