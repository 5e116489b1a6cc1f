//! Offline resource cache for the application's static assets.
//!
//! [`OfflineCache`] precaches the app shell on install, purges stale cache
//! versions on activate, and answers GET requests cache-first, storing
//! successful network responses for later offline use. It shares no state
//! with the ledger.
//!
//! Cache stores live behind the [`CacheStorage`] trait ([`MemoryCacheStorage`]
//! and [`FileCacheStorage`]); the network is reached through a [`Fetcher`]
//! ([`HttpFetcher`] with the `async` feature).

mod fetcher;
mod file;
mod http;
mod store;
mod worker;

#[cfg(feature = "async")]
pub use fetcher::HttpFetcher;
pub use fetcher::Fetcher;
pub use file::FileCacheStorage;
pub use http::{CacheKey, Method, ParseMethodError, Request, Response, ResponseKind};
pub use store::{CacheStorage, MemoryCacheStorage};
pub use worker::{
    APP_SHELL_FILES, CACHE_NAME, CacheConfig, DEFAULT_ORIGIN, FetchOutcome, OfflineCache,
};
