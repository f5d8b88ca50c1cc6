//! In-memory fetcher serving canned responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use gasp_common::{Entity, EntityId, FetchError, FetchResult, ResourceUri};

use crate::fetcher::{expect_id, RemoteFetcher};

#[derive(Debug, Clone)]
enum Canned {
    Body(Value),
    Status(u16),
    Unreachable,
}

/// Fetcher answering from a table of canned JSON bodies.
///
/// Useful for testing and offline development. Unknown locations answer
/// with status 404. A single-record request for `<uri>/<id>` with no canned
/// body of its own is served from the collection canned at `<uri>`.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    calls: AtomicUsize,
}

impl MemoryFetcher {
    /// Create a new fetcher with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `uri`.
    pub fn respond(&self, uri: &ResourceUri, body: Value) {
        self.set(uri, Canned::Body(body));
    }

    /// Serve `records` as a JSON array at `uri`.
    pub fn respond_with<E: Entity>(&self, uri: &ResourceUri, records: &[E]) {
        let body = serde_json::to_value(records).unwrap_or(Value::Null);
        self.respond(uri, body);
    }

    /// Answer requests for `uri` with a non-success status.
    pub fn fail_with_status(&self, uri: &ResourceUri, status: u16) {
        self.set(uri, Canned::Status(status));
    }

    /// Answer requests for `uri` as if the host could not be reached.
    pub fn fail_unreachable(&self, uri: &ResourceUri) {
        self.set(uri, Canned::Unreachable);
    }

    /// Number of fetches attempted so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set(&self, uri: &ResourceUri, canned: Canned) {
        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses.insert(uri.as_str().to_string(), canned);
    }

    fn lookup(&self, uri: &ResourceUri) -> Option<Canned> {
        let responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses.get(uri.as_str()).cloned()
    }

    fn body(uri: &ResourceUri, canned: Canned) -> FetchResult<Value> {
        match canned {
            Canned::Body(body) => Ok(body),
            Canned::Status(status) => Err(FetchError::Status {
                uri: uri.to_string(),
                status,
            }),
            Canned::Unreachable => Err(FetchError::Network(format!("{} is unreachable", uri))),
        }
    }

    fn not_found(uri: &ResourceUri) -> FetchError {
        FetchError::Status {
            uri: uri.to_string(),
            status: 404,
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(uri: &ResourceUri, body: Value) -> FetchResult<T> {
        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteFetcher for MemoryFetcher {
    async fn fetch_all<E: Entity>(&self, uri: &ResourceUri) -> FetchResult<Vec<E>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let canned = self.lookup(uri).ok_or_else(|| Self::not_found(uri))?;
        Self::decode(uri, Self::body(uri, canned)?)
    }

    async fn fetch_one<E: Entity>(&self, uri: &ResourceUri, id: EntityId) -> FetchResult<E> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let record_uri = uri.record(id);

        if let Some(canned) = self.lookup(&record_uri) {
            let record: E = Self::decode(&record_uri, Self::body(&record_uri, canned)?)?;
            return expect_id(&record_uri, id, record);
        }

        let canned = self.lookup(uri).ok_or_else(|| Self::not_found(&record_uri))?;
        let records: Vec<E> = Self::decode(uri, Self::body(uri, canned)?)?;
        records
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(|| Self::not_found(&record_uri))
    }
}
