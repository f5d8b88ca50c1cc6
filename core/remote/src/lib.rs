//! Remote collection fetchers for the Gasp REST service.
//!
//! A fetcher retrieves a whole collection (`GET <uri>`) or a single record
//! (`GET <uri>/<id>`) and decodes it into entities. Fetchers never touch
//! local state.

pub mod fetcher;
pub mod http;
pub mod memory;

pub use fetcher::RemoteFetcher;
pub use http::{HttpConfig, HttpFetcher};
pub use memory::MemoryFetcher;
