//! Error taxonomy for Gasp sync operations.

use thiserror::Error;

use crate::types::EntityId;

/// Failure while retrieving records from the remote service.
///
/// Callers treat every variant the same way: the retrieval failed and
/// nothing was decoded.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (unreachable host, timeout, connection reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status code.
    #[error("Unexpected status {status} from {uri}")]
    Status { uri: String, status: u16 },

    /// The response body could not be decoded into records.
    #[error("Malformed response from {uri}: {reason}")]
    Decode { uri: String, reason: String },
}

/// Failure reported by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation attempted while no handle is open.
    #[error("Store is not open")]
    NotOpen,

    /// The underlying storage could not be opened.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A record with this id is already stored.
    #[error("Duplicate key: {0}")]
    DuplicateKey(EntityId),

    /// Stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error only signals that the record was already present.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

/// What made a sync pass or a targeted update fail.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// Remote retrieval failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A non-duplicate store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Targeted update for a record that is already stored.
    #[error("Record {0} already exists")]
    AlreadyExists(EntityId),
}

/// Top-level error type for sync and update invocations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input, rejected before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The local store could not be opened for this invocation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bulk sync pass failed.
    #[error("Sync failed: {cause}")]
    SyncFailed {
        #[source]
        cause: FailureCause,
    },

    /// A targeted single-record update failed.
    #[error("Update failed: {cause}")]
    UpdateFailed {
        #[source]
        cause: FailureCause,
    },

    /// The sync scheduler stopped before the request completed.
    #[error("Sync scheduler is not running")]
    SchedulerStopped,
}

impl Error {
    pub fn sync_failed(cause: impl Into<FailureCause>) -> Self {
        Error::SyncFailed {
            cause: cause.into(),
        }
    }

    pub fn update_failed(cause: impl Into<FailureCause>) -> Self {
        Error::UpdateFailed {
            cause: cause.into(),
        }
    }

    /// The failure cause, if this error wraps one.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Error::SyncFailed { cause } | Error::UpdateFailed { cause } => Some(cause),
            _ => None,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a record store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of a remote fetch.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detection() {
        assert!(StoreError::DuplicateKey(EntityId::new(4)).is_duplicate());
        assert!(!StoreError::NotOpen.is_duplicate());
        assert!(!StoreError::Backend("disk full".to_string()).is_duplicate());
    }

    #[test]
    fn test_failure_messages() {
        let err = Error::update_failed(FailureCause::AlreadyExists(EntityId::new(7)));
        assert_eq!(err.to_string(), "Update failed: Record 7 already exists");

        let err = Error::sync_failed(FetchError::Status {
            uri: "http://localhost/reviews".to_string(),
            status: 503,
        });
        assert_eq!(
            err.to_string(),
            "Sync failed: Unexpected status 503 from http://localhost/reviews"
        );
        assert!(matches!(err.cause(), Some(FailureCause::Fetch(_))));
    }

    #[test]
    fn test_invalid_argument_has_no_cause() {
        let err = Error::InvalidArgument("missing id".to_string());
        assert!(err.cause().is_none());
    }
}
