//! Role-keyed permission cache.
//!
//! Caps staleness in dynamic evaluation: an entry answers reads for at most
//! the configured TTL, and grant mutations invalidate eagerly so in-process
//! changes are visible immediately.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use stockflow_models::RoleId;

struct CacheEntry {
    inserted_at: Instant,
    permissions: HashSet<String>,
}

/// An in-process TTL cache of resolved role permission sets.
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<RoleId, CacheEntry>>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached set if present and not expired.
    pub fn get(&self, role_id: RoleId) -> Option<HashSet<String>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&role_id)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.permissions.clone())
    }

    pub fn insert(&self, role_id: RoleId, permissions: HashSet<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                role_id,
                CacheEntry {
                    inserted_at: Instant::now(),
                    permissions,
                },
            );
        }
    }

    /// Drops the entry for one role. The next read goes back to the store.
    pub fn invalidate(&self, role_id: RoleId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&role_id);
        }
    }

    /// Drops every expired entry. Optional housekeeping; `get` already
    /// refuses stale entries.
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hit_within_ttl() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let role = RoleId::new();
        cache.insert(role, set(&["product.view"]));
        assert_eq!(cache.get(role), Some(set(&["product.view"])));
    }

    #[test]
    fn expires_after_ttl() {
        let cache = PermissionCache::new(Duration::from_millis(10));
        let role = RoleId::new();
        cache.insert(role, set(&["product.view"]));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(role), None);
    }

    #[test]
    fn invalidate_forces_miss() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let role = RoleId::new();
        cache.insert(role, set(&["product.view"]));
        cache.invalidate(role);
        assert_eq!(cache.get(role), None);
    }

    #[test]
    fn purge_removes_only_expired() {
        let cache = PermissionCache::new(Duration::from_millis(30));
        let old = RoleId::new();
        cache.insert(old, set(&["a.b"]));
        std::thread::sleep(Duration::from_millis(40));
        let fresh = RoleId::new();
        cache.insert(fresh, set(&["c.d"]));

        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(fresh).is_some());
    }
}
