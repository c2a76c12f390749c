//! Session storage backends.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::server::Error;

/// The data kept for one session.
pub type SessionData = serde_json::Map<String, serde_json::Value>;

/// Lifetime used when a store is asked to keep data for zero seconds.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A place to keep session data between requests.
///
/// Implementations must be shareable between connections; the server runs
/// handlers on many tasks at once.
pub trait Store: Send + Sync {
    /// Store `data` under `key` for `ttl`, replacing what was there.
    fn save<'a>(&'a self, key: &'a str, data: SessionData, ttl: Duration) -> BoxFuture<'a, Result<(), Error>>;

    /// Load the data stored under `key`, or `None` if it is missing or expired.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SessionData>, Error>>;

    /// Drop the session stored under `key`.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), Error>>;

    /// Drop every session.
    fn reset(&self) -> BoxFuture<'_, Result<(), Error>>;
}

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

/// An in-process store. Sessions are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Store for MemoryStore {
    fn save<'a>(&'a self, key: &'a str, data: SessionData, ttl: Duration) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
            let now = Instant::now();
            let mut entries = self.entries.write().await;
            entries.retain(|_, e| e.expires_at > now);
            entries.insert(key.to_string(), Entry { data, expires_at: now + ttl });
            Ok(())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<SessionData>, Error>> {
        Box::pin(async move {
            let entries = self.entries.read().await;
            Ok(entries
                .get(key)
                .filter(|e| e.expires_at > Instant::now())
                .map(|e| e.data.clone()))
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            self.entries.write().await.remove(key);
            Ok(())
        })
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            self.entries.write().await.clear();
            Ok(())
        })
    }
}
