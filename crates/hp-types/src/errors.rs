use thiserror::Error;

/// Main error type for the Hopaas client
#[derive(Error, Debug)]
pub enum HopaasError {
    #[error("Server error (status {status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Property not found: {key}")]
    KeyNotFound { key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HopaasError {
    /// Server answered with an unexpected status code.
    pub fn status(status: u16) -> Self {
        Self::Server {
            status,
            detail: "unexpected status".to_string(),
        }
    }

    /// Server answered 200 but the body breaks the protocol.
    pub fn bad_body(status: u16, detail: impl Into<String>) -> Self {
        Self::Server {
            status,
            detail: detail.into(),
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}

/// Result type alias for Hopaas operations
pub type HopaasResult<T> = Result<T, HopaasError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::HopaasError::Validation(format!($($arg)*))
    };
}

/// Macro for creating consistency errors
#[macro_export]
macro_rules! consistency_error {
    ($($arg:tt)*) => {
        $crate::HopaasError::Consistency(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HopaasError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HopaasError::status(503);
        assert!(error.to_string().contains("Server error"));
        assert!(error.to_string().contains("503"));

        let error = HopaasError::KeyNotFound {
            key: "learning_rate".to_string(),
        };
        assert!(error.to_string().contains("learning_rate"));
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HopaasError = io.into();
        assert!(matches!(err, HopaasError::Io(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: HopaasError = json_err.into();
        assert!(matches!(err, HopaasError::Serialization(_)));
    }

    #[test]
    fn test_macros() {
        let err = validation_error!("Invalid bound: {}", 42);
        assert!(matches!(err, HopaasError::Validation(ref m) if m.contains("42")));
        assert!(consistency_error!("duplicate trial {}", 3).is_consistency());
        assert!(matches!(config_error!("missing {}", "port"), HopaasError::Config(_)));
    }
}
