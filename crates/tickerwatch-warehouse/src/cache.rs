use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tickerwatch_util::{Clock, Storage, SystemClock};
use tracing::{debug, trace, warn};

/// How long a cached response stays valid. Shared by every key.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cache keys, one per logical request. Each kind has its own prefix, so two
/// different requests can never produce the same key.
pub struct CacheKey;

impl CacheKey {
    pub const TOP_GAINERS_LOSERS: &'static str = "top-gainers-losers";

    pub fn overview(symbol: &str) -> String {
        format!("overview:{symbol}")
    }

    pub fn time_series(symbol: &str) -> String {
        format!("timeseries:{symbol}")
    }

    pub fn demo_time_series(symbol: &str) -> String {
        format!("timeseries-demo:{symbol}")
    }

    pub fn search(keywords: &str) -> String {
        format!("search:{keywords}")
    }
}

/// On-disk layout of one cache key.
#[derive(Serialize)]
struct EntryRef<'a, T: ?Sized> {
    timestamp: i64,
    data: &'a T,
}

#[derive(Deserialize)]
struct Entry {
    timestamp: i64,
    data: Value,
}

/// Expiring key/value cache over durable [`Storage`].
///
/// The cache is fail-open: neither [`set`](TimedCache::set) nor
/// [`get`](TimedCache::get) ever returns an error. A failed write is logged and
/// simply shows up as a miss later; a failed or undecodable read is logged and
/// reported as a miss. Expiry is lazy, an expired entry is deleted by the read
/// that finds it.
#[derive(Clone)]
pub struct TimedCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl TimedCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Current time, in milliseconds, as seen by this cache.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Store `payload` under `key`, stamped with the current time.
    pub async fn set<T>(&self, key: &str, payload: &T)
    where
        T: Serialize + ?Sized + Sync,
    {
        let entry = EntryRef {
            timestamp: self.clock.now_millis(),
            data: payload,
        };
        let text = match serde_json::to_string(&entry) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to serialize cache entry for key \"{key}\": {e}");
                return;
            }
        };
        match self.storage.set_item(key, &text).await {
            Ok(()) => trace!("cached \"{key}\""),
            Err(e) => warn!("failed to cache data for key \"{key}\": {e:#}"),
        }
    }

    /// Fetch the payload under `key` if present and younger than [`CACHE_TTL`].
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.storage.get_item(key).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                trace!("cache miss for \"{key}\"");
                return None;
            }
            Err(e) => {
                warn!("failed to retrieve cache for key \"{key}\": {e:#}");
                return None;
            }
        };

        let entry: Entry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("unreadable cache entry for key \"{key}\": {e}");
                return None;
            }
        };

        if !is_fresh(entry.timestamp, self.clock.now_millis()) {
            debug!("cache entry for \"{key}\" expired");
            if let Err(e) = self.storage.remove_item(key).await {
                warn!("failed to purge expired cache entry \"{key}\": {e:#}");
            }
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(payload) => {
                debug!("cache hit for \"{key}\"");
                Some(payload)
            }
            Err(e) => {
                warn!("cached payload for key \"{key}\" has an unexpected shape: {e}");
                None
            }
        }
    }
}

fn is_fresh(timestamp: i64, now: i64) -> bool {
    now.saturating_sub(timestamp) <= CACHE_TTL.as_millis() as i64
}
