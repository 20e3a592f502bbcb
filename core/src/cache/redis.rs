//! Redis `ListCache` backed by a `deadpool-redis` connection pool.
//!
//! # Key Design
//!
//! - List page: `tasks:list:limit={n}:offset={n}:completed={bool|any}:assignee={"json"|any}`
//!   -> JSON array of tasks, written with `SET .. EX`.
//! - Invalidation walks the namespace with `SCAN MATCH tasks:list:* COUNT 100`
//!   and deletes each batch. The walk is not atomic.

use std::time::Duration;

use ::redis::AsyncCommands;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};

use crate::cache::{CacheError, ListCache};

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

#[derive(Clone)]
pub struct RedisListCache {
    pool: Pool,
}

impl std::fmt::Debug for RedisListCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedisListCache")
            .field("pool", &self.pool.status())
            .finish()
    }
}

/// Accept both `host:port` and `redis://host:port`.
pub fn normalize_redis_url(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    }
}

impl RedisListCache {
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `address`. No connection is opened until first use;
    /// call [`RedisListCache::ping`] to check reachability.
    pub fn from_address(address: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(normalize_redis_url(address))
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|error| CacheError::Connection(error.to_string()))?;
        Ok(Self { pool })
    }

    /// Round trip a `PING`, failing after `timeout`.
    pub async fn ping(&self, timeout: Duration) -> Result<(), CacheError> {
        let ping = async {
            let mut connection = self.pool.get().await?;
            let _: String = ::redis::cmd("PING").query_async(&mut *connection).await?;
            Ok::<(), CacheError>(())
        };
        tokio::time::timeout(timeout, ping)
            .await
            .map_err(|_| CacheError::Connection(format!("PING timed out after {timeout:?}")))?
    }
}

#[async_trait]
impl ListCache for RedisListCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.pool.get().await?;
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.pool.get().await?;
        let seconds = ttl.as_secs().max(1);
        let _: () = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut *connection)
            .await?;
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut connection = self.pool.get().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *connection)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = ::redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut *connection)
                    .await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
