//! Cache-aside layer for assembled reports.
//!
//! Live windows keep moving, so their entries carry a short fixed TTL;
//! historical windows are immutable and cache forever. The decorator in
//! [`CacheGateway::cached_or_compute`] keeps report assembly cache-agnostic.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Currency, TimeWindow};
use crate::error::EngineError;

/// Live entries expire after four minutes.
const LIVE_TTL: Duration = Duration::from_secs(240);

/// Cache-tier failure, kept distinct from upstream data errors so a cache
/// outage is diagnosable separately from a data outage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache read failed: {0}")]
    Read(String),
    #[error("cache write failed: {0}")]
    Write(String),
}

/// Report type prefix baked into every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ExchangeRates,
    TopMarkets,
    NetworkValue,
}

impl ReportKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ExchangeRates => "ER",
            Self::TopMarkets => "TM",
            Self::NetworkValue => "TNV",
        }
    }
}

/// Expiry class for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// The window ends now; data is still moving.
    Live,
    /// The window is fully in the past; the payload never changes.
    Historical,
}

impl TtlClass {
    pub fn for_window(window: &TimeWindow) -> Self {
        if window.is_live() {
            Self::Live
        } else {
            Self::Historical
        }
    }

    pub const fn ttl(self) -> Option<Duration> {
        match self {
            Self::Live => Some(LIVE_TTL),
            Self::Historical => None,
        }
    }
}

/// Deterministic cache key.
///
/// Format: `<PREFIX>:<CCY>[.<ISSUER>]:live:<SECONDS>` for live windows,
/// `<PREFIX>:<CCY>[.<ISSUER>]:hist:<STARTUNIX>:<ENDUNIX>` for historical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn build(kind: ReportKind, exchange: &Currency, window: &TimeWindow) -> Self {
        let mut key = format!("{}:{}", kind.prefix(), exchange.code());
        if let Some(issuer) = exchange.issuer() {
            key.push('.');
            key.push_str(issuer);
        }
        if window.is_live() {
            key.push_str(&format!(":live:{}", window.duration_seconds()));
        } else {
            key.push_str(&format!(
                ":hist:{}:{}",
                window.start().unix_timestamp(),
                window.end().unix_timestamp()
            ));
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boxed future returned by the object-safe cache backend.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Backing store contract: atomic get and set-with-TTL, nothing more.
/// Concurrent writers racing on the same key is acceptable; both compute
/// the same payload for the same window.
pub trait CacheBackend: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;
    fn put<'a>(
        &'a self,
        key: String,
        payload: String,
        ttl: Option<Duration>,
    ) -> CacheFuture<'a, ()>;
    fn exists<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    payload: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() <= expires_at,
            None => true,
        }
    }
}

/// In-process cache backend over a `tokio` read-write lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<tokio::sync::RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl CacheBackend for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(async move {
            let store = self.inner.read().await;
            Ok(store
                .get(key)
                .filter(|entry| entry.fresh())
                .map(|entry| entry.payload.clone()))
        })
    }

    fn put<'a>(
        &'a self,
        key: String,
        payload: String,
        ttl: Option<Duration>,
    ) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            let mut store = self.inner.write().await;
            store.insert(
                key,
                MemoryEntry {
                    payload,
                    expires_at: ttl.map(|ttl| Instant::now() + ttl),
                },
            );
            Ok(())
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move {
            let store = self.inner.read().await;
            Ok(store.get(key).is_some_and(MemoryEntry::fresh))
        })
    }
}

/// Cache-aside wrapper around a backend, or a no-op when disabled.
#[derive(Clone, Default)]
pub struct CacheGateway {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl CacheGateway {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// No-op gateway: every read is a miss, every write is dropped.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// History probe: reports only whether an entry exists for the key,
    /// without deserializing or computing the payload.
    pub async fn probe(&self, key: &CacheKey) -> Result<bool, CacheError> {
        match &self.backend {
            Some(backend) => backend.exists(key.as_str()).await,
            None => Ok(false),
        }
    }

    /// Serves `key` from the cache when possible, computing and writing
    /// back otherwise.
    ///
    /// A failed read is treated as a miss so the report still computes; a
    /// failed write is logged and does not invalidate the computed report.
    pub async fn cached_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: TtlClass,
        compute: F,
    ) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        if let Some(backend) = &self.backend {
            match backend.get(key.as_str()).await {
                Ok(Some(payload)) => match serde_json::from_str(&payload) {
                    Ok(value) => {
                        debug!(%key, "cache hit");
                        return Ok(value);
                    }
                    Err(error) => {
                        warn!(%key, %error, "discarding undecodable cache entry");
                    }
                },
                Ok(None) => {}
                Err(error) => {
                    warn!(%key, %error, "cache read failed, treating as a miss");
                }
            }
        }

        let value = compute().await?;

        if let Some(backend) = &self.backend {
            let payload = serde_json::to_string(&value)?;
            match backend.put(key.as_str().to_owned(), payload, ttl.ttl()).await {
                Ok(()) => debug!(%key, "cached"),
                Err(error) => warn!(%key, %error, "cache write failed"),
            }
        }

        Ok(value)
    }
}
