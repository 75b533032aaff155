//! Time-boxed memoization of query results.
//!
//! Entries are keyed by query name plus the serialized parameters and expire
//! after a fixed TTL. Writes to the database never invalidate entries.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: &'static str,
    params: String,
}

pub struct QueryCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: HashMap<CacheKey, (Instant, Value)>,
}

impl QueryCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> QueryCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        QueryCache {
            clock,
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached value if fresh, otherwise `load` runs and a success is stored.
    /// Failures are returned as is and never cached.
    pub fn get_or_load<T, P, E, F>(&mut self, query: &'static str, params: &P, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + ?Sized,
        F: FnOnce() -> Result<T, E>,
    {
        let key = CacheKey {
            query,
            params: serde_json::to_string(params).unwrap_or_default(),
        };
        let now = self.clock.now();

        if let Some((stored_at, value)) = self.entries.get(&key)
            && now.saturating_duration_since(*stored_at) < self.ttl
            && let Ok(hit) = serde_json::from_value::<T>(value.clone())
        {
            return Ok(hit);
        }

        let fresh = load()?;
        match serde_json::to_value(&fresh) {
            Ok(value) => {
                self.entries.insert(key, (now, value));
            }
            Err(_) => {
                self.entries.remove(&key);
            }
        }
        Ok(fresh)
    }

    /// Drop expired entries.
    pub fn purge_expired(&mut self) {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored_at, _)| now.saturating_duration_since(*stored_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
