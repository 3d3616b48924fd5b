//! Host side resolution caches

use super::types::ResolvedIdentity;
use crate::gap::BdAddr;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Private addresses already resolved on the host, least recently used evicted first
///
/// Both caches hold nothing when built with a zero capacity.
pub struct ResolutionCache {
    resolved: Option<LruCache<BdAddr, ResolvedIdentity>>,
    unresolved: Option<LruCache<BdAddr, ()>>,
}

impl ResolutionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity);
        Self {
            resolved: capacity.map(LruCache::new),
            unresolved: capacity.map(LruCache::new),
        }
    }

    /// Look up a positive result, moving it to the front
    pub fn get(&mut self, address: &BdAddr) -> Option<ResolvedIdentity> {
        self.resolved.as_mut()?.get(address).copied()
    }

    /// Whether `address` already failed to resolve against the current list
    pub fn is_unresolvable(&mut self, address: &BdAddr) -> bool {
        self.unresolved
            .as_mut()
            .is_some_and(|cache| cache.get(address).is_some())
    }

    pub fn insert_resolved(&mut self, address: BdAddr, identity: ResolvedIdentity) {
        if let Some(cache) = self.unresolved.as_mut() {
            cache.pop(&address);
        }
        if let Some(cache) = self.resolved.as_mut() {
            cache.put(address, identity);
        }
    }

    pub fn insert_unresolved(&mut self, address: BdAddr) {
        if let Some(cache) = self.unresolved.as_mut() {
            cache.put(address, ());
        }
    }

    /// Forget every address resolved to `identity`
    pub fn remove_identity(&mut self, identity: &ResolvedIdentity) {
        if let Some(cache) = self.resolved.as_mut() {
            let stale: Vec<BdAddr> = cache
                .iter()
                .filter(|(_, cached)| *cached == identity)
                .map(|(address, _)| *address)
                .collect();
            for address in stale {
                cache.pop(&address);
            }
        }
    }

    /// Negative results are only valid for the list they were computed against
    pub fn clear_unresolved(&mut self) {
        if let Some(cache) = self.unresolved.as_mut() {
            cache.clear();
        }
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.resolved.as_mut() {
            cache.clear();
        }
        self.clear_unresolved();
    }

    pub fn len(&self) -> usize {
        self.resolved.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
