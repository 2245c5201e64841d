//! Error types for FORCEBRIDGE operations

use thiserror::Error;

/// Query construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid query arguments: expected 2 or 3, got {count}")]
    InvalidArguments { count: usize },

    #[error("Unsupported operator: {operator}")]
    UnsupportedOperator { operator: String },
}

/// Cache backend and codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Failed to decode cached value for {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Remote record API errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote API answered with an error status. Messages are carried
    /// verbatim; retry policy belongs to the transport collaborator.
    #[error("Remote service error (status {status}): {}", messages.join("; "))]
    Service { status: u16, messages: Vec<String> },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Invalid response from remote service: {reason}")]
    InvalidResponse { reason: String },
}

/// Repository façade errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("No target object specified")]
    ObjectNotSpecified,

    #[error("Record not found in {object}")]
    RecordNotFound { object: String },
}

/// Master error type for all FORCEBRIDGE errors.
#[derive(Debug, Clone, Error)]
pub enum ForceBridgeError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result type alias for FORCEBRIDGE operations.
pub type ForceBridgeResult<T> = Result<T, ForceBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display_invalid_arguments() {
        let err = QueryError::InvalidArguments { count: 5 };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid query arguments"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_query_error_display_unsupported_operator() {
        let err = QueryError::UnsupportedOperator {
            operator: "<>".to_string(),
        };
        assert!(format!("{}", err).contains("<>"));
    }

    #[test]
    fn test_remote_error_display_service() {
        let err = RemoteError::Service {
            status: 400,
            messages: vec!["MALFORMED_QUERY".to_string(), "unexpected token".to_string()],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("400"));
        assert!(msg.contains("MALFORMED_QUERY; unexpected token"));
    }

    #[test]
    fn test_repository_error_display_record_not_found() {
        let err = RepositoryError::RecordNotFound {
            object: "Account".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Record not found"));
        assert!(msg.contains("Account"));
    }

    #[test]
    fn test_master_error_from_variants() {
        let query = ForceBridgeError::from(QueryError::InvalidArguments { count: 1 });
        assert!(matches!(query, ForceBridgeError::Query(_)));

        let cache = ForceBridgeError::from(CacheError::Backend {
            reason: "down".to_string(),
        });
        assert!(matches!(cache, ForceBridgeError::Cache(_)));

        let remote = ForceBridgeError::from(RemoteError::Transport {
            reason: "timeout".to_string(),
        });
        assert!(matches!(remote, ForceBridgeError::Remote(_)));

        let repository = ForceBridgeError::from(RepositoryError::ObjectNotSpecified);
        assert!(matches!(repository, ForceBridgeError::Repository(_)));
    }
}
