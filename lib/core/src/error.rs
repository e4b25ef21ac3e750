use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an [`Error`], so callers can tell a bad configuration from
/// a misuse of the API or from bad data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete construction-time configuration
    Configuration,
    /// Precondition violation, e.g. querying an unfitted model
    Usage,
    /// Input data the fitted model cannot handle
    Data,
    /// Case base provider failures
    Storage,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Attribute '{attribute}' requires parameter '{parameter}'")]
    MissingParameter { attribute: String, parameter: String },

    #[error("Inconsistent attribute weights: either every attribute carries a weight or none does")]
    InconsistentWeights,

    #[error("Invalid neighbour count: requested {k}, index holds {available} rows")]
    InvalidK { k: usize, available: usize },

    #[error("Retrieval model has not been fitted")]
    NotFitted,

    #[error("No aggregator configured")]
    NoAggregator,

    #[error("Unseen category {value} for attribute '{attribute}'")]
    UnseenCategory { attribute: String, value: String },

    #[error("Type mismatch for attribute '{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Attribute '{0}' has no comparable values to fit on")]
    EmptyColumn(String),

    #[error("Nothing to aggregate: {0}")]
    EmptyAggregation(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_)
            | Error::MissingParameter { .. }
            | Error::InconsistentWeights
            | Error::InvalidK { .. }
            | Error::Serialization(_) => ErrorKind::Configuration,
            Error::NotFitted | Error::NoAggregator => ErrorKind::Usage,
            Error::UnseenCategory { .. }
            | Error::TypeMismatch { .. }
            | Error::EmptyColumn(_)
            | Error::EmptyAggregation(_) => ErrorKind::Data,
            Error::CaseNotFound(_) | Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
