//! Error types for pgnamed

use std::collections::BTreeSet;
use thiserror::Error;

/// Result type alias for pgnamed operations
pub type NamedResult<T> = Result<T, NamedError>;

/// Error types for named-parameter operations.
///
/// Only [`NamedError::MissingRequiredArgument`] and [`NamedError::UnusedArguments`] are produced
/// by argument binding itself. Driver failures are carried in [`NamedError::Query`] exactly as
/// `tokio-postgres` reported them.
#[derive(Debug, Error)]
pub enum NamedError {
    /// A placeholder has no matching key in the supplied arguments
    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),

    /// The supplied arguments contain keys that no placeholder references
    #[error("Unused arguments: {}", join_names(.0))]
    UnusedArguments(BTreeSet<String>),

    /// Query execution error, passed through from the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The client does not provide a requested capability
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

fn join_names(names: &BTreeSet<String>) -> String {
    names
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl NamedError {
    /// Create a missing argument error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingRequiredArgument(name.into())
    }

    /// Create an unused arguments error
    pub fn unused<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnusedArguments(names.into_iter().map(Into::into).collect())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this error comes from argument binding.
    ///
    /// These errors mean the query and the arguments do not match. Retrying cannot succeed.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredArgument(_) | Self::UnusedArguments(_)
        )
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The underlying driver error, if any.
    pub fn as_db_error(&self) -> Option<&tokio_postgres::error::DbError> {
        match self {
            Self::Query(e) => e.as_db_error(),
            _ => None,
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for NamedError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
