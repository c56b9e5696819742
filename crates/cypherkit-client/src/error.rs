//! Error types for query execution
//!
//! Executors and chains propagate failures unchanged. The transaction
//! executor is the only component that intercepts a failure, to roll back,
//! and it always surfaces the original cause as the primary error.

use crate::transaction::TransactionState;
use cypherkit_query::ConstructionError;
use thiserror::Error;

/// Failure reported by the transport collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not reach or use the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected or failed a query
    #[error("Query error: {0}")]
    Query(String),

    /// Begin, commit, or rollback was rejected by the driver
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Any other driver failure
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Errors surfaced by executors, chains, and repositories
#[derive(Error, Debug)]
pub enum Error {
    /// A fragment could not be built
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The transport failed to execute a query
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A nested transaction failed
    #[error(transparent)]
    Transaction(Box<TransactionError>),

    /// A row did not carry an expected column
    #[error("Missing field in result row: {0}")]
    MissingField(String),

    /// `run_chain` was called without any steps
    #[error("Cannot run an empty operation chain")]
    EmptyChain,

    /// A chain result could not be converted to the requested type
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// A user callback failed
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(Box::new(err))
    }
}

/// Result type for execution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of `execute_transaction`
///
/// `rollback` carries the outcome of the compensating rollback when it also
/// failed. It never replaces the original cause.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// The transaction could not be started
    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] TransportError),

    /// The transaction body failed
    #[error("Transaction body failed: {source}")]
    Query {
        #[source]
        source: Error,
        rollback: Option<TransportError>,
        /// State the transaction settled in
        state: TransactionState,
    },

    /// The driver rejected the commit
    #[error("Commit failed: {source}")]
    Commit {
        #[source]
        source: TransportError,
        rollback: Option<TransportError>,
        state: TransactionState,
    },
}

impl TransactionError {
    /// Rollback failure recorded alongside the original cause, if any
    pub fn rollback_error(&self) -> Option<&TransportError> {
        match self {
            TransactionError::Begin(_) => None,
            TransactionError::Query { rollback, .. } | TransactionError::Commit { rollback, .. } => {
                rollback.as_ref()
            }
        }
    }

    /// The body failure, when the body was what failed
    pub fn query_error(&self) -> Option<&Error> {
        match self {
            TransactionError::Query { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Final transaction state; `None` when no transaction was begun
    pub fn state(&self) -> Option<TransactionState> {
        match self {
            TransactionError::Begin(_) => None,
            TransactionError::Query { state, .. } | TransactionError::Commit { state, .. } => {
                Some(*state)
            }
        }
    }

    /// Record the outcome of the compensating rollback
    pub(crate) fn settle(mut self, failure: Option<TransportError>, settled: TransactionState) -> Self {
        match &mut self {
            TransactionError::Query { rollback, state, .. }
            | TransactionError::Commit { rollback, state, .. } => {
                *rollback = failure;
                *state = settled;
            }
            TransactionError::Begin(_) => {}
        }
        self
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Query("syntax error near MATCH".to_string());
        assert_eq!(err.to_string(), "Query error: syntax error near MATCH");
    }

    #[test]
    fn test_rollback_error_is_auxiliary() {
        let err = TransactionError::Commit {
            source: TransportError::Transaction("deadlock".to_string()),
            rollback: None,
            state: TransactionState::Pending,
        }
        .settle(
            Some(TransportError::Connection("gone".to_string())),
            TransactionState::Failed,
        );

        assert_eq!(err.to_string(), "Commit failed: Transaction error: deadlock");
        assert!(matches!(
            err.rollback_error(),
            Some(TransportError::Connection(_))
        ));
        assert_eq!(err.state(), Some(TransactionState::Failed));
    }

    #[test]
    fn test_begin_failure_has_no_state() {
        let err = TransactionError::Begin(TransportError::Connection("refused".into()));
        assert_eq!(err.state(), None);
    }

    #[test]
    fn test_transaction_error_into_error() {
        let err: Error = TransactionError::Begin(TransportError::Connection("refused".into())).into();
        assert!(matches!(err, Error::Transaction(_)));
    }
}
