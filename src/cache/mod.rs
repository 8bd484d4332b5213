//! Time-bound document cache keyed by request identity.
//!
//! This module provides the [`DocumentCache`] struct which stores previously
//! fetched raw documents so repeated extraction of the same chapter within the
//! TTL does not hit the network again.
//!
//! # Overview
//!
//! Entries are keyed by a [`CacheKey`] derived from the URL plus the two
//! identity-affecting request parameters (auth cookie value and User-Agent),
//! because the site renders different content per session. Expiry is checked
//! lazily at lookup time; there is no background sweeper and no capacity bound.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chapter_core::cache::{CacheKey, DocumentCache};
//!
//! # async fn example() -> Result<(), std::convert::Infallible> {
//! let cache = DocumentCache::new(Duration::from_secs(180));
//! let key = CacheKey::new("https://example.com/series/foo/chapter-1", None, None);
//!
//! let (body, from_cache) = cache
//!     .get_or_fetch(&key, || async { Ok::<_, std::convert::Infallible>("<html></html>".to_string()) })
//!     .await?;
//! assert!(!from_cache);
//! assert_eq!(&*body, "<html></html>");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

/// Default time-to-live for cached documents (3 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(180);

/// Monotonic time source for TTL checks.
///
/// Injectable so tests can advance time without sleeping.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced [`Clock`] for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward by `delta`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&self, delta: Duration) {
        self.offset_ms
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Composite cache identity: URL + auth cookie + User-Agent.
///
/// Stored as a hex SHA-256 digest so keys can be logged without exposing the
/// cookie value. `None` and `Some("")` produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key deterministically from the identity-affecting fields.
    #[must_use]
    pub fn new(url: &str, auth_cookie: Option<&str>, user_agent: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        absorb_field(&mut hasher, Some(url));
        absorb_field(&mut hasher, auth_cookie);
        absorb_field(&mut hasher, user_agent);
        let digest = hasher.finalize();
        let hex = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(hex)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Length-prefixed with a presence tag so field boundaries cannot be forged.
fn absorb_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        None => hasher.update([0u8]),
        Some(value) => {
            hasher.update([1u8]);
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
    }
}

/// A raw document held by the cache.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    /// Identity the document was fetched under.
    pub cache_key: CacheKey,
    /// Raw response body.
    pub raw_body: Arc<str>,
    /// When the body was stored.
    pub fetched_at: Instant,
}

type Slot = Arc<Mutex<Option<CachedDocument>>>;

/// Concurrent, TTL-bound store of fetched documents.
///
/// Designed to be wrapped in `Arc` and shared across extraction calls. Each key
/// owns a slot guarded by a `tokio::sync::Mutex`; the lookup-fetch-store
/// sequence runs inside that critical section, so concurrent misses on the
/// same key collapse into one fetch while different keys proceed in parallel.
pub struct DocumentCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    /// Uses Arc so the `DashMap` shard lock is released before awaiting the slot.
    slots: DashMap<CacheKey, Slot>,
}

impl DocumentCache {
    /// Creates a cache using the system clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock.
    #[must_use]
    #[instrument(skip(clock), fields(ttl_secs = ttl.as_secs()))]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        debug!("creating document cache");
        Self {
            ttl,
            clock,
            slots: DashMap::new(),
        }
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of slots currently held, including stale ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the cached body for `key`, or runs `fetch` and stores its result.
    ///
    /// The second tuple element is `true` when the body came from the cache.
    /// Failed fetches are not stored.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`.
    #[instrument(skip(self, fetch), fields(key = %key))]
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<(Arc<str>, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let slot = Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        );

        let mut guard = slot.lock().await;
        if let Some(doc) = guard.as_ref()
            && self.is_fresh(doc)
        {
            trace!("cache hit");
            return Ok((Arc::clone(&doc.raw_body), true));
        }

        debug!(stale = guard.is_some(), "cache miss; fetching");
        let body: Arc<str> = Arc::from(fetch().await?);
        *guard = Some(CachedDocument {
            cache_key: key.clone(),
            raw_body: Arc::clone(&body),
            fetched_at: self.clock.now(),
        });
        Ok((body, false))
    }

    fn is_fresh(&self, doc: &CachedDocument) -> bool {
        self.clock.now().saturating_duration_since(doc.fetched_at) < self.ttl
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("ttl", &self.ttl)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
