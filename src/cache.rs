use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::rpc::DEFAULT_METHOD;

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub fn cacheable(method: &str) -> bool {
    method == DEFAULT_METHOD
}

pub fn cache_key(method: &str, params: &Value) -> String {
    // serde_json maps serialize with sorted keys, so equal params give equal keys
    format!("{method}:{params}")
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let (value, expires_at) = self
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.expires_at))?;

        if Instant::now() > expires_at {
            self.entries.remove(key);
            return None;
        }

        Some(value)
    }

    pub fn put(&self, key: String, value: Value) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        if self.entries.len() < self.capacity {
            return;
        }

        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}
