//! Host-keyed crumb cache with a bounded TTL.
//!
//! The cache is shared by every caller of a `RemoteClient`. Expired entries
//! are ignored on read and removed by [`CrumbCache::evict_expired`], which an
//! owner may run periodically via [`CrumbCache::spawn_sweeper`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{Crumb, HostKey};

/// Default lifetime of a cached crumb.
pub const DEFAULT_CRUMB_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CachedCrumb {
    crumb: Crumb,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct CrumbCache {
    entries: RwLock<HashMap<HostKey, CachedCrumb>>,
    ttl: Duration,
}

impl Default for CrumbCache {
    fn default() -> Self {
        Self::new(DEFAULT_CRUMB_TTL)
    }
}

impl CrumbCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached crumb for `host`, if present and not expired.
    pub fn get(&self, host: &HostKey) -> Option<Crumb> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(host)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.crumb.clone())
    }

    /// Store `crumb` for `host` when `enabled`; always hands the crumb back.
    pub fn put(&self, host: HostKey, crumb: Crumb, enabled: bool) -> Crumb {
        if enabled {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(
                host,
                CachedCrumb {
                    crumb: crumb.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        crumb
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "evicted expired crumbs");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a background thread that evicts expired entries every `period`.
    /// The thread exits on its first tick after the last `Arc` is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> std::io::Result<JoinHandle<()>> {
        let weak = Arc::downgrade(self);
        std::thread::Builder::new()
            .name("rtrig-crumb-sweeper".to_string())
            .spawn(move || loop {
                std::thread::sleep(period);
                match weak.upgrade() {
                    Some(cache) => {
                        cache.evict_expired();
                    }
                    None => break,
                }
            })
    }
}
