//! Per-entity exclusion for mutations.
//!
//! Keys hash onto a fixed number of shards. Each shard maps a key to a weak
//! handle of an async mutex; the mutex lives only while some caller holds or
//! awaits it, and the entry is dropped from its shard once the last guard goes.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for the shard maps because:
//! 1. Operations are O(1) map lookups and removals
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::{Arc, Weak};

use emotebase_core::{ObjectId, ObjectKind, RequestContext, Result};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Identity of a lockable entity; orders by id, then kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    /// Entity id
    pub id: ObjectId,
    /// Entity kind
    pub kind: ObjectKind,
}

impl EntityKey {
    /// Key for any entity
    pub fn new(kind: ObjectKind, id: ObjectId) -> Self {
        Self { id, kind }
    }

    /// Key for an emote
    pub fn emote(id: ObjectId) -> Self {
        Self::new(ObjectKind::Emote, id)
    }
}

type Shard = Mutex<HashMap<EntityKey, Weak<AsyncMutex<()>>>>;

#[derive(Debug)]
struct Shards {
    shards: Box<[Shard]>,
}

impl Shards {
    fn shard(&self, key: &EntityKey) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    fn handle(&self, key: EntityKey) -> Arc<AsyncMutex<()>> {
        let mut map = self.shard(&key).lock();
        if let Some(existing) = map.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        map.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    fn evict_if_idle(&self, key: &EntityKey) {
        let mut map = self.shard(key).lock();
        if map.get(key).is_some_and(|weak| weak.strong_count() == 0) {
            map.remove(key);
        }
    }
}

/// Sharded lock table keyed by entity identity
#[derive(Debug, Clone)]
pub struct LockTable {
    inner: Arc<Shards>,
}

impl LockTable {
    /// Table with `shards` shards (at least one)
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            inner: Arc::new(Shards { shards }),
        }
    }

    /// Wait for exclusive access to `key`
    ///
    /// Dropping the returned future before it resolves releases the waiter's
    /// handle and evicts the entry if nobody else uses it.
    pub async fn acquire(&self, key: EntityKey) -> EntityGuard {
        let handle = self.inner.handle(key);
        tracing::debug!(entity_id = %key.id, kind = %key.kind, "acquiring entity lock");
        let mut pending = PendingLock {
            key,
            wait: Some(Box::pin(handle.lock_owned())),
            table: Arc::clone(&self.inner),
        };
        let guard = pending.finish().await;
        EntityGuard {
            key,
            guard,
            table: Arc::clone(&self.inner),
        }
    }

    /// Lock several keys in global order, deduplicating repeats
    pub async fn acquire_many(&self, keys: impl IntoIterator<Item = EntityKey>) -> MultiGuard {
        let mut keys: Vec<EntityKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        MultiGuard { guards }
    }

    /// Like `acquire_many`, giving up if `ctx` is cancelled while waiting
    pub async fn acquire_within(
        &self,
        ctx: &RequestContext,
        keys: impl IntoIterator<Item = EntityKey>,
    ) -> Result<MultiGuard> {
        ctx.run(self.acquire_many(keys)).await
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.inner.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Whether no key is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type LockWait = Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>;

/// A waiter queued on one entity's mutex
struct PendingLock {
    key: EntityKey,
    wait: Option<LockWait>,
    table: Arc<Shards>,
}

impl PendingLock {
    async fn finish(&mut self) -> Option<OwnedMutexGuard<()>> {
        let guard = match self.wait.as_mut() {
            Some(wait) => wait.await,
            None => return None,
        };
        self.wait = None;
        Some(guard)
    }
}

impl Drop for PendingLock {
    fn drop(&mut self) {
        // Only a waiter that never got the mutex still holds its future here.
        if let Some(wait) = self.wait.take() {
            drop(wait);
            self.table.evict_if_idle(&self.key);
        }
    }
}

/// Exclusive hold on one entity; released on drop
#[derive(Debug)]
pub struct EntityGuard {
    key: EntityKey,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Shards>,
}

impl EntityGuard {
    /// The locked key
    pub fn key(&self) -> EntityKey {
        self.key
    }
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // The mutex handle must be released before the entry can look idle.
        drop(self.guard.take());
        self.table.evict_if_idle(&self.key);
    }
}

/// Holds on several entities, acquired in key order
#[derive(Debug)]
pub struct MultiGuard {
    guards: Vec<EntityGuard>,
}

impl MultiGuard {
    /// Keys held, in acquisition order
    pub fn keys(&self) -> Vec<EntityKey> {
        self.guards.iter().map(EntityGuard::key).collect()
    }
}
