use anyhow::Result;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub type Redis = Client;

pub fn get_redis_client(redis_url: &str) -> Result<Redis> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Small key/value cache with expiry: Redis when configured, otherwise
/// process memory.
pub enum Cache {
    Redis(Redis),
    Memory(Mutex<HashMap<String, (String, Instant)>>),
}

impl Cache {
    pub fn memory() -> Self {
        Cache::Memory(Mutex::new(HashMap::new()))
    }

    pub fn from_url(redis_url: Option<&str>) -> Result<Self> {
        match redis_url {
            Some(url) => {
                tracing::info!("Using Redis cache at {}", url);
                Ok(Cache::Redis(get_redis_client(url)?))
            }
            None => Ok(Cache::memory()),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Cache::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let value: Option<String> = conn.get(key).await?;
                Ok(value)
            }
            Cache::Memory(map) => {
                let mut map = map.lock().map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;
                let now = Instant::now();
                map.retain(|_, (_, expires)| *expires > now);
                Ok(map.get(key).map(|(v, _)| v.clone()))
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        match self {
            Cache::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
                Ok(())
            }
            Cache::Memory(map) => {
                let mut map = map.lock().map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;
                map.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
                Ok(())
            }
        }
    }

    /// Increments a counter that lives for `window`, returning the new value.
    pub async fn incr_window(&self, key: &str, window: Duration) -> Result<u64> {
        match self {
            Cache::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let count: u64 = conn.incr(key, 1u64).await?;
                if count == 1 {
                    let _: () = conn.expire(key, window.as_secs().max(1) as i64).await?;
                }
                Ok(count)
            }
            Cache::Memory(map) => {
                let mut map = map.lock().map_err(|_| anyhow::anyhow!("cache lock poisoned"))?;
                let now = Instant::now();
                map.retain(|_, (_, expires)| *expires > now);
                let entry = map
                    .entry(key.to_string())
                    .or_insert_with(|| ("0".to_string(), now + window));
                if entry.1 <= now {
                    *entry = ("0".to_string(), now + window);
                }
                let count = entry.0.parse::<u64>().unwrap_or(0) + 1;
                entry.0 = count.to_string();
                Ok(count)
            }
        }
    }
}
