//! Bounded result cache for merged indicator sets
//!
//! Fixed-capacity key-value store keyed by subject. Eviction is
//! first-in-first-out by original insertion order: a hit does not
//! refresh an entry's position and an overwrite keeps the original
//! insertion priority. This mirrors the observed behavior of the
//! system this client talks to and is deliberately not LRU.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use stockdash_models::{IndicatorSet, Subject};

/// Maximum number of cached subjects, fixed for the process lifetime.
pub const CACHE_CAPACITY: usize = 10;

/// FIFO-evicting store of merged indicator sets
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<Subject, Arc<IndicatorSet>>,
    order: VecDeque<Subject>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a subject. Does not affect eviction order.
    pub fn get(&self, key: &Subject) -> Option<Arc<IndicatorSet>> {
        self.entries.get(key).map(Arc::clone)
    }

    /// Insert or overwrite. A fresh insert takes the newest position
    /// in the eviction order; an overwrite keeps the original one.
    pub fn insert(&mut self, key: Subject, value: Arc<IndicatorSet>) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
            self.evict_over_capacity();
        }
    }

    fn evict_over_capacity(&mut self) {
        while self.entries.len() > CACHE_CAPACITY {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn contains(&self, key: &Subject) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
