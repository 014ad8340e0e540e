use thiserror::Error;

/// Errors raised by the risk & route-scoring engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request or dataset field is absent, mis-typed or out of range.
    #[error("schema error on field `{field}`: {reason}")]
    Schema { field: String, reason: String },

    /// Invalid route table, projection constants or model artifact.
    #[error("configuration error: {0}")]
    Config(String),

    /// Numeric failure (zero variance, empty data, non-finite values).
    #[error("computation error: {0}")]
    Computation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }

    pub fn computation(message: impl Into<String>) -> Self {
        EngineError::Computation(message.into())
    }

    /// Field name for schema errors, used by the REST adapter.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Schema { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_field() {
        let err = EngineError::schema("weather_severity", "expected a number");
        assert_eq!(err.field(), Some("weather_severity"));
        assert!(err.to_string().contains("weather_severity"));
    }

    #[test]
    fn test_config_error_has_no_field() {
        let err = EngineError::config("missing route profile `Safer`");
        assert_eq!(err.field(), None);
        assert!(err.to_string().starts_with("configuration error"));
    }
}
