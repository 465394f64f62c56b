//! Error types for the recommendation engine

use thiserror::Error;

/// A transaction record failed validation and cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("record {transaction_id:?} is missing required field '{field}'")]
    MissingField {
        transaction_id: String,
        field: &'static str,
    },

    #[error("record {transaction_id:?} has invalid amount {amount}")]
    InvalidAmount { transaction_id: String, amount: f64 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Statistics cannot be built because there are no usable records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient data: {reason}")]
pub struct InsufficientDataError {
    pub reason: String,
}

impl InsufficientDataError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure loading or saving a model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact version error: format version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },

    #[error("artifact corrupt: {0}")]
    Corrupt(String),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization error: {0}")]
    Serialize(String),
}

impl ArtifactError {
    /// Short name of the failure kind, used in user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactError::Version { .. } => "version",
            ArtifactError::Corrupt(_) => "corrupt",
            ArtifactError::Io(_) => "io",
            ArtifactError::Serialize(_) => "serialize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failure() {
        let err = ArtifactError::Version {
            found: 3,
            supported: 1,
        };
        assert!(err.to_string().contains("version"));
        assert_eq!(err.kind(), "version");

        let err = ArtifactError::Corrupt("missing field `statistics`".into());
        assert!(err.to_string().starts_with("artifact corrupt"));
        assert_eq!(err.kind(), "corrupt");

        let err = InsufficientDataError::new("empty batch");
        assert_eq!(err.to_string(), "insufficient data: empty batch");
    }
}
