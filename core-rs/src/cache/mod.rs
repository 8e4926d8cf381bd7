//! Memoization caches for query synthesis
//!
//! Capacity-bounded LRU maps owned by the engine. Entries are never
//! invalidated: profile definitions are immutable for the life of the process.
//! Concurrent misses on the same key may both compute; the last write wins.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use oxigraph::model::NamedNode;

use crate::model::{ItemDescriptor, ItemPredicates, ListingPredicates};
use crate::query::identity::{IdentityRequest, IdentityResolution};
use crate::query::SparqlQuery;

pub const DEFAULT_ITEM_QUERY_CAPACITY: usize = 128;
pub const DEFAULT_PREDICATE_CAPACITY: usize = 128;
pub const DEFAULT_IDENTITY_CAPACITY: usize = 50;

/// LRU cache of pure function results
pub struct MemoCache<K, V> {
    name: &'static str,
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> MemoCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached values are pure, so a panic in another holder leaves nothing
    /// inconsistent and the poisoned guard is used as is.
    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    /// Cached value for `key`, computing and storing it on a miss. The lock
    /// is not held while `compute` runs.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// As [`get_or_insert_with`](Self::get_or_insert_with); failures are not cached
    pub fn get_or_try_insert_with<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            tracing::trace!(cache = self.name, "hit");
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.inner.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("MemoCache")
            .field("name", &self.name)
            .field("len", &len)
            .finish()
    }
}

pub type PredicateKey = (NamedNode, NamedNode);

/// The caches the engine owns, built from configured capacities
#[derive(Debug)]
pub struct SynthesisCaches {
    pub item_queries: MemoCache<(ItemDescriptor, NamedNode), SparqlQuery>,
    pub listing_predicates: MemoCache<PredicateKey, ListingPredicates>,
    pub item_predicates: MemoCache<PredicateKey, ItemPredicates>,
    pub identities: MemoCache<IdentityRequest, IdentityResolution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCapacities {
    pub item_queries: usize,
    pub listing_predicates: usize,
    pub item_predicates: usize,
    pub identities: usize,
}

impl Default for CacheCapacities {
    fn default() -> Self {
        Self {
            item_queries: DEFAULT_ITEM_QUERY_CAPACITY,
            listing_predicates: DEFAULT_PREDICATE_CAPACITY,
            item_predicates: DEFAULT_PREDICATE_CAPACITY,
            identities: DEFAULT_IDENTITY_CAPACITY,
        }
    }
}

impl SynthesisCaches {
    pub fn new(capacities: CacheCapacities) -> Self {
        Self {
            item_queries: MemoCache::new("item_queries", capacities.item_queries),
            listing_predicates: MemoCache::new("listing_predicates", capacities.listing_predicates),
            item_predicates: MemoCache::new("item_predicates", capacities.item_predicates),
            identities: MemoCache::new("identities", capacities.identities),
        }
    }
}

impl Default for SynthesisCaches {
    fn default() -> Self {
        Self::new(CacheCapacities::default())
    }
}
