//! Snapshot cache: per-source market snapshots with TTL, explicit
//! invalidation, and serve-stale-while-revalidate. At most one build per
//! key runs at a time; concurrent readers either get the previous snapshot
//! or wait on the first build when nothing has been built yet.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapters::ListingSource;
use crate::error::{AppError, Result};
use crate::stats::build_snapshot;
use crate::types::{CacheKey, Snapshot, Source};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Injectable time source so cache expiry is testable with a fixed "now".
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

// ---------------------------------------------------------------------------
// Entries and status
// ---------------------------------------------------------------------------

struct CacheEntry {
    snapshot: Arc<Snapshot>,
    created_at_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Empty,
    Fresh,
    Stale,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyStatus {
    pub key: String,
    pub state: EntryState,
    pub created_at_secs: Option<u64>,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
}

// ---------------------------------------------------------------------------
// SnapshotCache
// ---------------------------------------------------------------------------

pub struct SnapshotCache {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Per-key single-flight build guards. Unrelated keys never serialize.
    build_locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    adapters: Vec<Arc<dyn ListingSource>>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl SnapshotCache {
    pub fn new(
        adapters: Vec<Arc<dyn ListingSource>>,
        clock: Arc<dyn Clock>,
        ttl_secs: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            build_locks: DashMap::new(),
            adapters,
            clock,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Fresh-or-stale snapshot read.
    ///
    /// Fresh entries are returned directly. A stale entry is still served
    /// without blocking while a single background rebuild revalidates it.
    /// An empty key builds synchronously under the key's build lock; the
    /// double-check after acquiring the lock means N concurrent callers
    /// trigger exactly one build.
    pub async fn get(self: &Arc<Self>, key: CacheKey) -> Result<Arc<Snapshot>> {
        if let Some((snapshot, created_at)) = self.peek(key) {
            let age = self.clock.now_secs().saturating_sub(created_at);
            if age < self.ttl_secs {
                return Ok(snapshot);
            }
            self.spawn_revalidation(key);
            return Ok(snapshot);
        }

        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        // Another caller may have completed the first build while we waited.
        if let Some((snapshot, _)) = self.peek(key) {
            return Ok(snapshot);
        }
        self.build_and_store(key).await
    }

    /// Rebuild one key now, contending for the same per-key build lock as
    /// the background refresher. A failed build leaves any previous entry
    /// untouched and propagates the error.
    pub async fn refresh(self: &Arc<Self>, key: CacheKey) -> Result<()> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        self.build_and_store(key).await?;
        Ok(())
    }

    /// Rebuild every known key: all sources first, then the combined view
    /// so it merges the snapshots just built. Per-key failures are logged
    /// and do not stop the pass.
    pub async fn refresh_all(self: &Arc<Self>) {
        let source_refreshes = Source::ALL
            .iter()
            .map(|&s| self.refresh(CacheKey::Source(s)));
        for (source, result) in Source::ALL.iter().zip(join_all(source_refreshes).await) {
            if let Err(e) = result {
                warn!(source = %source, error = %e, "source refresh failed");
            }
        }
        if let Err(e) = self.refresh(CacheKey::Combined).await {
            warn!(error = %e, "combined refresh failed");
        }
    }

    /// Discard one entry. Other keys keep serving; the next read of this
    /// key triggers a synchronous build.
    pub fn invalidate(&self, key: CacheKey) {
        let removed = self.entries.remove(&key).is_some();
        info!(key = %key, removed, "cache key invalidated");
    }

    /// Discard all entries. The next read per key triggers a synchronous
    /// build.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        info!(entries_removed = count, "cache cleared");
    }

    pub fn status(&self) -> Vec<KeyStatus> {
        let now = self.clock.now_secs();
        Source::ALL
            .iter()
            .map(|&s| CacheKey::Source(s))
            .chain(std::iter::once(CacheKey::Combined))
            .map(|key| match self.entries.get(&key) {
                Some(entry) => {
                    let age = now.saturating_sub(entry.created_at_secs);
                    KeyStatus {
                        key: key.to_string(),
                        state: if age < self.ttl_secs {
                            EntryState::Fresh
                        } else {
                            EntryState::Stale
                        },
                        created_at_secs: Some(entry.created_at_secs),
                        age_secs: Some(age),
                        ttl_secs: self.ttl_secs,
                    }
                }
                None => KeyStatus {
                    key: key.to_string(),
                    state: EntryState::Empty,
                    created_at_secs: None,
                    age_secs: None,
                    ttl_secs: self.ttl_secs,
                },
            })
            .collect()
    }

    // -- internals ----------------------------------------------------------

    fn peek(&self, key: CacheKey) -> Option<(Arc<Snapshot>, u64)> {
        self.entries
            .get(&key)
            .map(|e| (Arc::clone(&e.snapshot), e.created_at_secs))
    }

    fn lock_for(&self, key: CacheKey) -> Arc<Mutex<()>> {
        self.build_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Kick one background rebuild for a stale key. If a build is already
    /// in flight the try_lock fails and the stale entry keeps serving.
    fn spawn_revalidation(self: &Arc<Self>, key: CacheKey) {
        let lock = self.lock_for(key);
        if let Ok(guard) = lock.try_lock_owned() {
            let cache = Arc::clone(self);
            tokio::spawn(async move {
                let _guard = guard;
                if let Err(e) = cache.build_and_store(key).await {
                    warn!(key = %key, error = %e, "background revalidation failed");
                }
            });
        }
    }

    /// Build a snapshot for `key` and swap it in as a single visible
    /// assignment. Caller must hold the key's build lock.
    async fn build_and_store(self: &Arc<Self>, key: CacheKey) -> Result<Arc<Snapshot>> {
        let snapshot = match key {
            CacheKey::Source(source) => self.build_source(source).await?,
            CacheKey::Combined => self.build_combined().await?,
        };
        info!(
            key = %key,
            listings = snapshot.stats.total_listings,
            "snapshot built"
        );
        self.entries.insert(
            key,
            CacheEntry {
                snapshot: Arc::clone(&snapshot),
                created_at_secs: self.clock.now_secs(),
            },
        );
        Ok(snapshot)
    }

    async fn build_source(&self, source: Source) -> Result<Arc<Snapshot>> {
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.source() == source)
            .ok_or_else(|| AppError::Adapter(format!("no adapter registered for {source}")))?;
        let listings = adapter
            .fetch_listings()
            .await
            .map_err(|e| AppError::Adapter(format!("{source}: {e}")))?;
        Ok(Arc::new(build_snapshot(&source.to_string(), listings)))
    }

    /// Merge the per-source snapshots into one combined snapshot, building
    /// any source that has never been built. At least one source must be
    /// available.
    async fn build_combined(self: &Arc<Self>) -> Result<Arc<Snapshot>> {
        let mut all_listings = Vec::new();
        let mut available = 0usize;
        let mut last_err: Option<AppError> = None;

        for source in Source::ALL {
            match self.get_or_build_source(source).await {
                Ok(snapshot) => {
                    all_listings.extend(snapshot.listings.iter().cloned());
                    available += 1;
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "source unavailable for combined view");
                    last_err = Some(e);
                }
            }
        }

        if available == 0 {
            return Err(last_err
                .unwrap_or_else(|| AppError::Adapter("no sources available".to_string())));
        }
        Ok(Arc::new(build_snapshot("combined", all_listings)))
    }

    /// Current snapshot for a source regardless of freshness, building it
    /// under the source's own lock only if it has never been built. Called
    /// while holding the Combined lock; key ordering is always
    /// combined → source, so this cannot deadlock.
    async fn get_or_build_source(self: &Arc<Self>, source: Source) -> Result<Arc<Snapshot>> {
        let key = CacheKey::Source(source);
        if let Some((snapshot, _)) = self.peek(key) {
            return Ok(snapshot);
        }
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        if let Some((snapshot, _)) = self.peek(key) {
            return Ok(snapshot);
        }
        Box::pin(self.build_and_store(key)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
