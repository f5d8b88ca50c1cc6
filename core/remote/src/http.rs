//! HTTP fetcher for the Gasp REST service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use gasp_common::{Entity, EntityId, FetchError, FetchResult, ResourceUri};

use crate::fetcher::{expect_id, RemoteFetcher};

/// Transport settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Gasp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches JSON collections over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a new fetcher.
    ///
    /// # Errors
    /// - `FetchError::Network` if the TLS backend cannot be initialised
    pub fn new(config: HttpConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    async fn get_json<T: DeserializeOwned>(&self, uri: &ResourceUri) -> FetchResult<T> {
        debug!("GET {}", uri);

        let response = self
            .http
            .get(uri.as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("GET {} failed: {}", uri, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Reading {} failed: {}", uri, e)))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_all<E: Entity>(&self, uri: &ResourceUri) -> FetchResult<Vec<E>> {
        let records: Vec<E> = self.get_json(uri).await?;
        debug!("Fetched {} {} records from {}", records.len(), E::KIND.label(), uri);
        Ok(records)
    }

    async fn fetch_one<E: Entity>(&self, uri: &ResourceUri, id: EntityId) -> FetchResult<E> {
        let record_uri = uri.record(id);
        let record: E = self.get_json(&record_uri).await?;
        expect_id(&record_uri, id, record)
    }
}
