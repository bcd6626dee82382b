//! Error types for the stat catalog

use thiserror::Error;

/// Main error type for the stat catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed statistic expression or report name
    #[error("Parse error: {0}")]
    Parse(String),

    /// Aggregator type is not registered
    #[error("Unknown aggregator: {0}")]
    UnknownAggregator(String),

    /// Merge failed or produced an empty tuple
    #[error("Merge error: {0}")]
    Merge(String),

    /// Encoded tuple could not be decoded
    #[error("Format error: {0}")]
    Format(String),

    /// Coordination store rejected the catalog write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Scope tokens do not form a valid scope
    #[error("Scope build error: {0}")]
    ScopeBuild(String),

    /// Caller violated an input precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Coordination store transport error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coordination store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection to the store backend failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A command against the store failed
    #[error("Command error: {0}")]
    CommandError(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Errors raised by individual aggregators
///
/// The registry folds every variant into [`Error::Merge`] so that callers see
/// a single failure kind per key update.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// Aggregator argument missing or out of range
    #[error("Invalid argument for {aggregator}: {message}")]
    InvalidArgument {
        /// Aggregator type name
        aggregator: String,
        /// Description of the problem
        message: String,
    },

    /// Value and timestamp tuples disagree in length
    #[error("Tuple length mismatch: {values} values, {timestamps} timestamps")]
    LengthMismatch {
        /// Number of values
        values: usize,
        /// Number of timestamps
        timestamps: usize,
    },

    /// A tuple element is not numeric
    #[error("Non-numeric sample: {0}")]
    NonNumeric(String),

    /// Merged value left the finite range and could not be stored
    #[error("{aggregator} overflowed: {value} is not finite")]
    Overflow {
        /// Aggregator type name
        aggregator: String,
        /// The non-finite result
        value: f64,
    },
}

impl From<AggregationError> for Error {
    fn from(e: AggregationError) -> Self {
        Error::Merge(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
