//! Remote collection fetcher trait definition.

use async_trait::async_trait;

use gasp_common::{Entity, EntityId, FetchError, FetchResult, ResourceUri};

/// Retrieves records of any entity type from a remote collection.
///
/// No ordering is promised for collections: callers must not assume the
/// records arrive sorted by id.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Retrieve every record of the collection at `uri`.
    ///
    /// # Errors
    /// - `FetchError::Network` if the service cannot be reached
    /// - `FetchError::Status` on a non-success response
    /// - `FetchError::Decode` if the body is not a list of `E`
    async fn fetch_all<E: Entity>(&self, uri: &ResourceUri) -> FetchResult<Vec<E>>;

    /// Retrieve the single record `id` of the collection at `uri`.
    ///
    /// # Errors
    /// Same as [`RemoteFetcher::fetch_all`]; additionally a body describing a
    /// different record is reported as `FetchError::Decode`.
    async fn fetch_one<E: Entity>(&self, uri: &ResourceUri, id: EntityId) -> FetchResult<E>;
}

/// Reject a single-record response that names another record.
pub(crate) fn expect_id<E: Entity>(uri: &ResourceUri, requested: EntityId, record: E) -> FetchResult<E> {
    if record.id() != requested {
        return Err(FetchError::Decode {
            uri: uri.to_string(),
            reason: format!("expected {} {}, got {}", E::KIND.label(), requested, record.id()),
        });
    }
    Ok(record)
}
