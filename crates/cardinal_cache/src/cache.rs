//! Entity cache implementation.

use crate::Entity;
use cardinal_error::{CardinalError, CardinalResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// One cache entry. Uninitialized while a fetch for the key is in flight.
type Slot<E> = Arc<OnceCell<Arc<E>>>;

struct CacheInner<E: Entity> {
    slots: Mutex<HashMap<<E as Entity>::Id, Slot<E>>>,
}

/// Why a fetch did not produce an entity.
enum Miss {
    Absent,
    Failed(CardinalError),
}

/// Cache mapping identifiers to shared entity instances.
///
/// The cache is the single authority for deduplication: while an entry
/// exists, every lookup of its identifier yields the same `Arc`. Entities
/// that need to evict themselves (on `delete`) hold a
/// [`WeakEntityCache`] obtained from [`EntityCache::downgrade`], which
/// does not keep the cache alive.
///
/// # Example
///
/// ```
/// use cardinal_cache::{Entity, EntityCache};
/// use std::sync::Arc;
///
/// struct Tag(String);
///
/// impl Entity for Tag {
///     type Id = String;
///     const KIND: &'static str = "tag";
///     fn id(&self) -> String {
///         self.0.clone()
///     }
/// }
///
/// let cache = EntityCache::<Tag>::new();
/// let first = cache.upsert("a".to_string(), || Tag("a".into()), |_| {});
/// let second = cache.upsert("a".to_string(), || Tag("a".into()), |_| {});
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct EntityCache<E: Entity> {
    inner: Arc<CacheInner<E>>,
}

impl<E: Entity> EntityCache<E> {
    /// Create an empty cache.
    pub fn new() -> Self {
        debug!(kind = E::KIND, "Creating new EntityCache");
        Self {
            inner: Arc::new(CacheInner {
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Non-owning handle to this cache.
    pub fn downgrade(&self) -> WeakEntityCache<E> {
        WeakEntityCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Cached entity for `id`, without fetching.
    pub fn get(&self, id: &E::Id) -> Option<Arc<E>> {
        self.inner
            .slots
            .lock()
            .get(id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Whether an entity for `id` is cached.
    pub fn contains(&self, id: &E::Id) -> bool {
        self.get(id).is_some()
    }

    /// Number of cached entities. In-flight fetches are not counted.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Whether no entity is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every cached entity, in no particular order.
    pub fn values(&self) -> Vec<Arc<E>> {
        self.inner
            .slots
            .lock()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    /// Return the cached entity for `id`, or run `fetch` to load it.
    ///
    /// Concurrent calls for the same `id` share one in-flight fetch. A
    /// fetch yielding `Ok(None)` leaves nothing cached and returns
    /// `Ok(None)`; a failed fetch leaves nothing cached and returns the
    /// error. The loaded entity is cached under its own identifier.
    #[tracing::instrument(skip_all, fields(kind = E::KIND, id = %id))]
    pub async fn get_or_fetch<F, Fut>(&self, id: &E::Id, fetch: F) -> CardinalResult<Option<Arc<E>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CardinalResult<Option<E>>>,
    {
        let slot = {
            let mut slots = self.inner.slots.lock();
            slots
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(entity) = slot.get() {
            debug!("Cache hit");
            return Ok(Some(entity.clone()));
        }

        let outcome = slot
            .get_or_try_init(move || async move {
                debug!("Cache miss, fetching");
                match fetch().await {
                    Ok(Some(entity)) => Ok(Arc::new(entity)),
                    Ok(None) => Err(Miss::Absent),
                    Err(err) => Err(Miss::Failed(err)),
                }
            })
            .await;

        match outcome {
            Ok(entity) => {
                let entity = entity.clone();
                Ok(Some(self.settle(id, &slot, entity)))
            }
            Err(miss) => {
                self.discard_pending(id, &slot);
                match miss {
                    Miss::Absent => Ok(None),
                    Miss::Failed(err) => Err(err),
                }
            }
        }
    }

    /// Insert a new entity, or update the cached one in place.
    ///
    /// If `id` is cached, `update` runs against the existing instance and
    /// that instance is returned; otherwise `create` builds the entity
    /// that gets cached. Either way exactly one instance exists for `id`.
    pub fn upsert<N, U>(&self, id: E::Id, create: N, update: U) -> Arc<E>
    where
        N: FnOnce() -> E,
        U: FnOnce(&E),
    {
        let mut slots = self.inner.slots.lock();
        if let Some(existing) = slots.get(&id).and_then(|slot| slot.get().cloned()) {
            debug!(kind = E::KIND, id = %id, "Updating cached entity in place");
            update(&existing);
            return existing;
        }

        debug!(kind = E::KIND, id = %id, "Inserting entity into cache");
        let entity = Arc::new(create());
        slots.insert(id, Arc::new(OnceCell::new_with(Some(entity.clone()))));
        entity
    }

    /// Evict `id`. Returns whether an entity had been cached.
    pub fn remove(&self, id: &E::Id) -> bool {
        remove_slot(&self.inner, id)
    }

    /// Evict everything. Returns the number of entities that were cached.
    pub fn clear(&self) -> usize {
        let mut slots = self.inner.slots.lock();
        let count = slots.values().filter(|slot| slot.initialized()).count();
        slots.clear();
        tracing::info!(kind = E::KIND, cleared = count, "Cleared cache");
        count
    }

    /// Make sure the fetched entity is the one cached under its own id.
    fn settle(&self, requested: &E::Id, slot: &Slot<E>, entity: Arc<E>) -> Arc<E> {
        let own_id = entity.id();
        let mut slots = self.inner.slots.lock();

        if own_id != *requested {
            warn!(
                kind = E::KIND,
                requested = %requested,
                received = %own_id,
                "Server returned a different identifier than requested"
            );
            if slots.get(requested).is_some_and(|s| Arc::ptr_eq(s, slot)) {
                slots.remove(requested);
            }
        }

        match slots.get(&own_id) {
            Some(current) if Arc::ptr_eq(current, slot) => entity,
            Some(current) if current.initialized() => match current.get() {
                // Another path (create, bulk fetch) cached this id meanwhile.
                Some(existing) => existing.clone(),
                None => entity,
            },
            _ => {
                slots.insert(own_id, slot.clone());
                entity
            }
        }
    }

    /// Drop the in-flight slot for `id` if it never got a value.
    fn discard_pending(&self, id: &E::Id, slot: &Slot<E>) {
        let mut slots = self.inner.slots.lock();
        if slots
            .get(id)
            .is_some_and(|s| Arc::ptr_eq(s, slot) && !s.initialized())
        {
            slots.remove(id);
        }
    }
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for EntityCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("kind", &E::KIND)
            .field("len", &self.len())
            .finish()
    }
}

impl<E: Entity> Clone for EntityCache<E> {
    /// Clones share the same entries.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning handle to an [`EntityCache`].
pub struct WeakEntityCache<E: Entity> {
    inner: Weak<CacheInner<E>>,
}

impl<E: Entity> WeakEntityCache<E> {
    /// Evict `id` from the cache if it still exists.
    ///
    /// Returns whether an entity had been cached.
    pub fn remove(&self, id: &E::Id) -> bool {
        match self.inner.upgrade() {
            Some(inner) => remove_slot(&inner, id),
            None => false,
        }
    }

    /// Evict `id` only while it still maps to `entity`.
    ///
    /// A stale instance whose entry was evicted and refetched leaves the
    /// live replacement alone. Returns whether `entity` had been cached.
    pub fn remove_instance(&self, id: &E::Id, entity: &E) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut slots = inner.slots.lock();
        let current = slots
            .get(id)
            .and_then(|slot| slot.get())
            .is_some_and(|cached| std::ptr::eq(Arc::as_ptr(cached), entity));
        if current {
            slots.remove(id);
        }
        debug!(kind = E::KIND, id = %id, removed = current, "Evicted cached instance");
        current
    }

    /// Cached entity for `id`, if the cache still exists.
    pub fn get(&self, id: &E::Id) -> Option<Arc<E>> {
        let inner = self.inner.upgrade()?;
        let slots = inner.slots.lock();
        slots.get(id).and_then(|slot| slot.get().cloned())
    }
}

impl<E: Entity> Clone for WeakEntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for WeakEntityCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEntityCache")
            .field("kind", &E::KIND)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

fn remove_slot<E: Entity>(inner: &CacheInner<E>, id: &E::Id) -> bool {
    let removed = inner
        .slots
        .lock()
        .remove(id)
        .is_some_and(|slot| slot.initialized());
    debug!(kind = E::KIND, id = %id, removed, "Evicted cache entry");
    removed
}
