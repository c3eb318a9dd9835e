//! Error types and result types for driver operations.
//!
//! Every fallible operation in the driver surface returns [`DriverResult<T>`].
//! The variants follow the taxonomy the adapter reports to its caller: session
//! establishment failures, write failures, query execution failures and
//! malformed input, plus the raw backend failures the adapter re-tags at its
//! boundary.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to the document service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The underlying service session could not be established.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A database handle was requested before the client was connected.
    #[error("Client is not connected; call connect() first")]
    NotConnected,
    /// An insert, update or delete was rejected by the service.
    #[error("Write error: {0}")]
    Write(String),
    /// A find or count could not be executed by the service.
    #[error("Query execution error: {0}")]
    QueryExecution(String),
    /// The document or update has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying service client.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DriverError {
    /// Re-tags a backend failure as a write failure, leaving other variants untouched.
    pub fn into_write(self) -> Self {
        match self {
            DriverError::Backend(message) => DriverError::Write(message),
            other => other,
        }
    }

    /// Re-tags a backend failure as a query execution failure, leaving other variants untouched.
    pub fn into_query_execution(self) -> Self {
        match self {
            DriverError::Backend(message) => DriverError::QueryExecution(message),
            other => other,
        }
    }
}

/// A specialized `Result` type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

impl From<BsonError> for DriverError {
    fn from(err: BsonError) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DriverError {
    fn from(err: SerdeJsonError) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_retagged_at_the_boundary() {
        assert_eq!(
            DriverError::Backend("boom".into()).into_write(),
            DriverError::Write("boom".into())
        );
        assert_eq!(
            DriverError::Backend("boom".into()).into_query_execution(),
            DriverError::QueryExecution("boom".into())
        );
    }

    #[test]
    fn other_errors_keep_their_kind() {
        assert_eq!(
            DriverError::InvalidDocument("no id".into()).into_write(),
            DriverError::InvalidDocument("no id".into())
        );
        assert_eq!(DriverError::NotConnected.into_query_execution(), DriverError::NotConnected);
    }
}
