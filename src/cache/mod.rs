//! Per-owner listing cache.
//!
//! Read-through cache for serialized file listings: an in-process moka tier
//! plus an optional shared Redis tier. The cache holds a disposable
//! projection of the metadata store and has no authority; every failure here
//! is logged and swallowed so a cache outage can never fail a request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::Expiry;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

/// Ceiling on in-process entry lifetime. Kept short so cross-instance
/// invalidation through Redis converges quickly; an entry cached with a
/// shorter requested TTL expires at that TTL instead.
const LOCAL_TTL_SECS: u64 = 60;

/// Maximum in-process entries (one per recently active owner).
const LOCAL_MAX_CAPACITY: u64 = 10_000;

/// Maximum attempts for the startup Redis connection check.
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Initial delay between connection attempts; doubles per attempt.
const CONNECT_BACKOFF_START: Duration = Duration::from_millis(500);

/// Listing cache keyed by owner id.
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<CacheLayerInner>,
}

#[derive(Clone)]
struct CachedListing {
    payload: String,
    ttl: Duration,
}

/// Per-entry expiry: the smaller of the requested TTL and the local ceiling.
struct ListingExpiry;

impl Expiry<String, CachedListing> for ListingExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedListing,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl.min(Duration::from_secs(LOCAL_TTL_SECS)))
    }
}

struct CacheLayerInner {
    local: Cache<String, CachedListing>,
    redis: Option<RedisClient>,
}

fn listing_key(owner_id: i64) -> String {
    format!("files:{owner_id}")
}

/// Connect to Redis at startup, retrying with bounded exponential backoff.
///
/// Returns the client once a PING round-trips. After the final failed
/// attempt the caller degrades to the in-process tier only; a cache outage
/// is never fatal.
pub async fn connect_redis(url: &str) -> Option<RedisClient> {
    connect_redis_with(url, MAX_CONNECT_ATTEMPTS, CONNECT_BACKOFF_START).await
}

async fn connect_redis_with(
    url: &str,
    max_attempts: u32,
    start_delay: Duration,
) -> Option<RedisClient> {
    let client = match RedisClient::open(url) {
        Ok(client) => client,
        Err(e) => {
            warn!("invalid redis url: {e}; using in-process cache only");
            return None;
        }
    };

    let mut delay = start_delay;
    for attempt in 1..=max_attempts {
        match ping(&client).await {
            Ok(()) => {
                debug!("redis listing cache reachable");
                return Some(client);
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    "redis connection attempt {attempt}/{max_attempts} failed: {e}; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(
                    "redis unreachable after {max_attempts} attempts: {e}; using in-process cache only"
                );
            }
        }
    }
    None
}

async fn ping(client: &RedisClient) -> redis::RedisResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(())
}

impl CacheLayer {
    /// Create a new cache layer. Without a Redis client only the in-process
    /// tier is used.
    pub fn new(redis: Option<RedisClient>) -> Self {
        let local = Cache::builder()
            .max_capacity(LOCAL_MAX_CAPACITY)
            .expire_after(ListingExpiry)
            .build();

        Self {
            inner: Arc::new(CacheLayerInner { local, redis }),
        }
    }

    /// Get the cached listing for an owner. A miss is not an error; the
    /// caller falls back to the metadata store.
    pub async fn get_listing(&self, owner_id: i64) -> Option<String> {
        let key = listing_key(owner_id);

        if let Some(entry) = self.inner.local.get(&key).await {
            debug!(key = %key, "listing cache local hit");
            return Some(entry.payload);
        }

        let client = self.inner.redis.as_ref()?;
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "redis unavailable for cache get");
                return None;
            }
        };

        let val: Option<String> = conn.get(&key).await.ok()?;
        if let Some(ref v) = val {
            debug!(key = %key, "listing cache redis hit");
            // The remaining Redis TTL is unknown here; the local ceiling
            // bounds how long the repopulated entry can outlive it.
            self.inner
                .local
                .insert(
                    key,
                    CachedListing {
                        payload: v.clone(),
                        ttl: Duration::from_secs(LOCAL_TTL_SECS),
                    },
                )
                .await;
        }
        val
    }

    /// Cache a serialized listing. Best-effort: never fails the caller.
    pub async fn set_listing(&self, owner_id: i64, payload: &str, ttl: Duration) {
        let key = listing_key(owner_id);

        self.inner
            .local
            .insert(
                key.clone(),
                CachedListing {
                    payload: payload.to_string(),
                    ttl,
                },
            )
            .await;

        let Some(client) = self.inner.redis.as_ref() else {
            return;
        };
        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            warn!("redis unavailable for cache set");
            return;
        };
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, payload, ttl.as_secs().max(1))
            .await
        {
            warn!(error = %e, key = %key, "failed to set listing in redis");
        }
    }

    /// Drop the cached listing for an owner.
    ///
    /// Callers invoke this synchronously before a mutating operation returns,
    /// which gives that owner read-your-writes on their next listing fetch.
    /// The entry is deleted, never patched.
    pub async fn invalidate(&self, owner_id: i64) {
        let key = listing_key(owner_id);

        self.inner.local.invalidate(&key).await;

        let Some(client) = self.inner.redis.as_ref() else {
            debug!(key = %key, "listing cache invalidated");
            return;
        };
        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            warn!("redis unavailable for cache invalidate");
            return;
        };
        if let Err(e) = conn.del::<_, ()>(&key).await {
            warn!(error = %e, key = %key, "failed to delete listing from redis");
        }
        debug!(key = %key, "listing cache invalidated");
    }
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("redis", &self.inner.redis.is_some())
            .finish()
    }
}
