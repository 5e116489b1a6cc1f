//! Cache lifecycle: install, activate, and cache-first fetch handling.

use core::sync::atomic::{AtomicBool, Ordering};

use url::Url;

use super::fetcher::Fetcher;
use super::http::{Request, Response, ResponseKind};
use super::store::CacheStorage;
use crate::error::{ForexError, Result};

/// Name of the current cache version.
pub const CACHE_NAME: &str = "currency-tracker-cache-v1";

/// Paths precached on install, resolved against the app origin.
pub const APP_SHELL_FILES: [&str; 6] = [
    "/",
    "/index.html",
    "/index.css",
    "/index.tsx",
    "/manifest.json",
    "/icon.svg",
];

/// Origin used when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Offline cache settings.
///
/// # Examples
///
/// ```
/// use forex_ledger::cache::CacheConfig;
///
/// let config = CacheConfig::parse("https://forex.example")
///     .unwrap()
///     .cache_name("currency-tracker-cache-v2")
///     .manifest(["/", "/index.html"])
///     .cache_opaque(false);
/// assert_eq!(config.manifest_urls().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Current cache version; every other store is purged on activate.
    cache_name: String,
    /// Origin the app is served from.
    origin: Url,
    /// Paths precached on install.
    manifest: Vec<String>,
    /// Whether opaque responses are stored.
    cache_opaque: bool,
}

impl CacheConfig {
    /// Creates the default configuration for an app served from `origin`.
    #[inline]
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            cache_name: CACHE_NAME.to_owned(),
            origin,
            manifest: APP_SHELL_FILES.iter().map(|&path| path.to_owned()).collect(),
            cache_opaque: true,
        }
    }

    /// Parses `origin` and creates the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ForexError::InvalidUrl`] if `origin` is not an absolute URL.
    #[inline]
    pub fn parse(origin: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(origin)?))
    }

    /// Overrides the cache version name.
    #[inline]
    #[must_use]
    pub fn cache_name<T: Into<String>>(mut self, name: T) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Overrides the precache manifest.
    #[inline]
    #[must_use]
    pub fn manifest<I, T>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.manifest = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables storing opaque responses.
    #[inline]
    #[must_use]
    pub const fn cache_opaque(mut self, enabled: bool) -> Self {
        self.cache_opaque = enabled;
        self
    }

    /// Current cache version name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.cache_name
    }

    /// App origin.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether opaque responses are stored.
    #[inline]
    #[must_use]
    pub const fn caches_opaque(&self) -> bool {
        self.cache_opaque
    }

    /// Manifest paths resolved against the origin.
    ///
    /// # Errors
    ///
    /// Returns [`ForexError::InvalidUrl`] if a path cannot be resolved.
    #[inline]
    pub fn manifest_urls(&self) -> Result<Vec<Url>> {
        self.manifest
            .iter()
            .map(|path| self.origin.join(path).map_err(ForexError::from))
            .collect()
    }
}

/// How a fetch was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled by the cache; the caller goes to the network itself.
    PassThrough,
    /// Served from the cache without touching the network.
    Hit(Response),
    /// Served from the network.
    Miss {
        /// Network response, returned unchanged.
        response: Response,
        /// Whether a copy was stored.
        cached: bool,
    },
}

impl FetchOutcome {
    /// The response to hand back, if the cache produced one.
    #[inline]
    #[must_use]
    #[allow(
        clippy::pattern_type_mismatch,
        reason = "binding through `*self` needs `ref`, which is denied"
    )]
    pub const fn response(&self) -> Option<&Response> {
        match self {
            Self::PassThrough => None,
            Self::Hit(response) | Self::Miss { response, .. } => Some(response),
        }
    }
}

/// Cache-first handler for the app's static resources.
#[derive(Debug)]
pub struct OfflineCache<S, F> {
    /// Settings.
    config: CacheConfig,
    /// Named cache stores.
    storage: S,
    /// Network access.
    fetcher: F,
    /// Set once activation has claimed open clients.
    claimed: AtomicBool,
}

impl<S: CacheStorage, F: Fetcher> OfflineCache<S, F> {
    /// Creates a cache that has not been installed or activated yet.
    #[inline]
    #[must_use]
    pub const fn new(config: CacheConfig, storage: S, fetcher: F) -> Self {
        Self {
            config,
            storage,
            fetcher,
            claimed: AtomicBool::new(false),
        }
    }

    /// Precaches every manifest resource into the current store.
    ///
    /// All resources are fetched before anything is written, so a failure
    /// leaves the store untouched. Returns the number of cached resources.
    ///
    /// # Errors
    ///
    /// Returns [`ForexError::Network`] if a fetch fails,
    /// [`ForexError::Install`] if a resource answers with a non-ok status,
    /// or a storage error if writing fails.
    #[tracing::instrument(skip_all, fields(cache = %self.config.cache_name))]
    pub async fn install(&self) -> Result<usize> {
        let urls = self.config.manifest_urls()?;
        _ = self.storage.open(&self.config.cache_name).await?;

        let mut entries = Vec::with_capacity(urls.len());
        for url in urls {
            let request = Request::get(url);
            let response = self.fetcher.fetch(&request).await.inspect_err(|err| {
                tracing::error!(error = %err, "failed to cache app shell");
            })?;
            if !response.is_ok() {
                tracing::error!(
                    url = %request.url(),
                    status = response.status,
                    "failed to cache app shell"
                );
                return Err(ForexError::Install {
                    url: request.url().to_string(),
                    status: response.status,
                });
            }
            entries.push((request.key(), response));
        }

        let count = entries.len();
        self.storage
            .put_all(&self.config.cache_name, entries)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to store app shell"))?;
        tracing::info!(count, "cached app shell");
        Ok(count)
    }

    /// Deletes every store except the current one and claims open clients.
    ///
    /// Returns the names of the deleted stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    #[tracing::instrument(skip_all, fields(cache = %self.config.cache_name))]
    pub async fn activate(&self) -> Result<Vec<String>> {
        _ = self.storage.open(&self.config.cache_name).await?;
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name == self.config.cache_name {
                continue;
            }
            if self.storage.delete(&name).await? {
                tracing::info!(old = %name, "deleted old cache");
                deleted.push(name);
            }
        }
        self.claimed.store(true, Ordering::Release);
        tracing::info!(purged = deleted.len(), "activated and old caches cleaned");
        Ok(deleted)
    }

    /// Answers `request` cache-first.
    ///
    /// Non-GET requests are passed through untouched. A cached copy is
    /// returned without a network call. Otherwise the network response is
    /// returned, and a copy is stored when it is a 200 basic/CORS response
    /// or an opaque response with opaque caching enabled. A failed store or
    /// cache lookup is logged and does not fail the fetch.
    ///
    /// # Errors
    ///
    /// Returns [`ForexError::Network`] if the network request fails.
    #[tracing::instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
        if !request.method().is_get() {
            tracing::trace!("not a GET request, passing through");
            return Ok(FetchOutcome::PassThrough);
        }

        let key = request.key();
        match self.storage.match_request(&self.config.cache_name, &key).await {
            Ok(Some(cached)) => {
                tracing::debug!("serving from cache");
                return Ok(FetchOutcome::Hit(cached));
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "cache lookup failed, using network"),
        }

        let response = self.fetcher.fetch(request).await.inspect_err(|err| {
            tracing::error!(error = %err, "fetching failed");
        })?;

        if !self.is_cacheable(&response) {
            if response.kind != ResponseKind::Opaque {
                tracing::warn!(status = response.status, "network response not cacheable");
            }
            return Ok(FetchOutcome::Miss {
                response,
                cached: false,
            });
        }

        let cached = match self
            .storage
            .put(&self.config.cache_name, key, response.clone())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to store network response");
                false
            }
        };
        Ok(FetchOutcome::Miss { response, cached })
    }

    /// Returns `true` once activation has claimed open clients.
    #[inline]
    #[must_use]
    pub fn controls_clients(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Cache settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Underlying cache storage.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying fetcher.
    #[inline]
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Whether a network response may be stored.
    const fn is_cacheable(&self, response: &Response) -> bool {
        match response.kind {
            ResponseKind::Basic | ResponseKind::Cors => response.status == 200,
            ResponseKind::Opaque => self.config.cache_opaque,
        }
    }
}
