//! Listener multiplexer: `(key, tag)` bookkeeping over store subscriptions.
//!
//! The multiplexer owns the only mutable shared state of the client. Its
//! maps are guarded by mutexes that are never held across an `.await`:
//! store calls happen before or after the map update, never during it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use rook_remote::{ChangeCallback, RemoteStore, SubscriptionHandle};
use rook_types::{Key, StorePath, Tag};

use crate::error::{ClientError, ClientResult};

/// Locally unique identity of one installed subscription, used to tell a
/// subscription apart from a later replacement under the same `(key, tag)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A live binding between `(key, tag)` and a store-level subscription.
#[derive(Clone, Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub key: Key,
    pub tag: Tag,
    pub path: StorePath,
    pub handle: SubscriptionHandle,
}

/// A live binding between a tag and a root-scoped store subscription.
#[derive(Clone, Debug)]
pub struct RootSubscription {
    pub id: SubscriptionId,
    pub tag: Tag,
    pub path: StorePath,
    pub handle: SubscriptionHandle,
}

/// Tracks every active subscription for one domain type.
///
/// A map entry is dropped only after its store subscription is gone. A
/// handle that is no longer tracked but failed to unsubscribe is kept as
/// an orphan and retried at the start of every later attach or detach.
pub struct ListenerMultiplexer {
    store: Arc<dyn RemoteStore>,
    next_id: AtomicU64,
    keyed: Mutex<HashMap<(Key, Tag), Subscription>>,
    collection: Mutex<HashMap<Tag, RootSubscription>>,
    orphans: Mutex<Vec<SubscriptionHandle>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> ClientError {
    ClientError::Internal(format!("lock poisoned: {e}"))
}

impl ListenerMultiplexer {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            keyed: Mutex::new(HashMap::new()),
            collection: Mutex::new(HashMap::new()),
            orphans: Mutex::new(Vec::new()),
        }
    }

    /// Reserve an id for a subscription about to be attached.
    pub fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn keyed(&self) -> ClientResult<MutexGuard<'_, HashMap<(Key, Tag), Subscription>>> {
        self.keyed.lock().map_err(poisoned)
    }

    fn collection(&self) -> ClientResult<MutexGuard<'_, HashMap<Tag, RootSubscription>>> {
        self.collection.lock().map_err(poisoned)
    }

    fn orphans(&self) -> ClientResult<MutexGuard<'_, Vec<SubscriptionHandle>>> {
        self.orphans.lock().map_err(poisoned)
    }

    /// Unsubscribe a handle that is no longer tracked in either map. On
    /// failure the handle is parked for a later retry.
    async fn release(&self, handle: SubscriptionHandle) -> ClientResult<()> {
        if let Err(e) = self.store.unsubscribe(handle).await {
            warn!(%handle, error = %e, "unsubscribe failed, will retry");
            self.orphans()?.push(handle);
        }
        Ok(())
    }

    /// Retry every parked handle once.
    async fn retry_orphans(&self) -> ClientResult<()> {
        let pending = std::mem::take(&mut *self.orphans()?);
        for handle in pending {
            match self.store.unsubscribe(handle).await {
                Ok(_) => debug!(%handle, "orphaned subscription released"),
                Err(e) => {
                    debug!(%handle, error = %e, "orphaned subscription still attached");
                    self.orphans()?.push(handle);
                }
            }
        }
        Ok(())
    }

    /// Subscribe `on_change` at `path` and install it under `(key, tag)`,
    /// detaching whatever was installed there before.
    ///
    /// If the previous subscription cannot be detached it stays installed,
    /// the new one is released, and the error is returned.
    pub async fn attach(
        &self,
        id: SubscriptionId,
        key: &Key,
        tag: &Tag,
        path: StorePath,
        on_change: ChangeCallback,
    ) -> ClientResult<()> {
        self.retry_orphans().await?;
        let handle = self.store.subscribe(&path, on_change).await?;
        let map_key = (key.clone(), tag.clone());

        let previous = self.keyed()?.get(&map_key).map(|sub| sub.handle);
        if let Some(old) = previous {
            if let Err(e) = self.store.unsubscribe(old).await {
                self.release(handle).await?;
                return Err(e.into());
            }
        }

        let replaced = self.keyed()?.insert(
            map_key,
            Subscription {
                id,
                key: key.clone(),
                tag: tag.clone(),
                path,
                handle,
            },
        );
        // Installed by a concurrent attach while `old` was being detached.
        if let Some(raced) = replaced.filter(|sub| Some(sub.handle) != previous) {
            self.release(raced.handle).await?;
        }

        match previous {
            Some(old) => debug!(%key, %tag, %old, new = %handle, "listener replaced"),
            None => debug!(%key, %tag, %handle, "listener attached"),
        }
        Ok(())
    }

    /// Drop the keyed entry if it is still the subscription `id`.
    fn forget_keyed(&self, map_key: &(Key, Tag), id: SubscriptionId) -> ClientResult<()> {
        let mut keyed = self.keyed()?;
        if keyed.get(map_key).is_some_and(|sub| sub.id == id) {
            keyed.remove(map_key);
        }
        Ok(())
    }

    /// Detach the subscription under `(key, tag)`. Returns `false` if none.
    pub async fn detach(&self, key: &Key, tag: &Tag) -> ClientResult<bool> {
        self.detach_matching(key, tag, None).await
    }

    /// Detach `(key, tag)` only if it is still the subscription `id`.
    pub async fn detach_if_current(
        &self,
        key: &Key,
        tag: &Tag,
        id: SubscriptionId,
    ) -> ClientResult<bool> {
        self.detach_matching(key, tag, Some(id)).await
    }

    async fn detach_matching(
        &self,
        key: &Key,
        tag: &Tag,
        only: Option<SubscriptionId>,
    ) -> ClientResult<bool> {
        self.retry_orphans().await?;
        let map_key = (key.clone(), tag.clone());
        let current = self
            .keyed()?
            .get(&map_key)
            .filter(|sub| only.map_or(true, |id| sub.id == id))
            .map(|sub| (sub.id, sub.handle));

        let Some((id, handle)) = current else {
            return Ok(false);
        };
        self.store.unsubscribe(handle).await?;
        self.forget_keyed(&map_key, id)?;
        debug!(%key, %tag, %handle, "listener detached");
        Ok(true)
    }

    /// Detach every subscription on `key`. Returns `false` if none.
    ///
    /// Every subscription is attempted; the first failure is reported and
    /// the failed ones stay installed.
    pub async fn detach_all(&self, key: &Key) -> ClientResult<bool> {
        self.retry_orphans().await?;
        let current: Vec<((Key, Tag), SubscriptionId, SubscriptionHandle)> = self
            .keyed()?
            .iter()
            .filter(|((k, _), _)| k == key)
            .map(|(map_key, sub)| (map_key.clone(), sub.id, sub.handle))
            .collect();

        let mut first_err = None;
        for (map_key, id, handle) in &current {
            match self.store.unsubscribe(*handle).await {
                Ok(_) => self.forget_keyed(map_key, *id)?,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e.into());
        }
        debug!(%key, count = current.len(), "all listeners on key detached");
        Ok(!current.is_empty())
    }

    /// Subscribe `on_change` at the root `path` and install it under `tag`.
    pub async fn attach_collection(
        &self,
        id: SubscriptionId,
        tag: &Tag,
        path: StorePath,
        on_change: ChangeCallback,
    ) -> ClientResult<()> {
        self.retry_orphans().await?;
        let handle = self.store.subscribe(&path, on_change).await?;

        let previous = self.collection()?.get(tag).map(|sub| sub.handle);
        if let Some(old) = previous {
            if let Err(e) = self.store.unsubscribe(old).await {
                self.release(handle).await?;
                return Err(e.into());
            }
        }

        let replaced = self.collection()?.insert(
            tag.clone(),
            RootSubscription {
                id,
                tag: tag.clone(),
                path,
                handle,
            },
        );
        if let Some(raced) = replaced.filter(|sub| Some(sub.handle) != previous) {
            self.release(raced.handle).await?;
        }

        match previous {
            Some(old) => debug!(%tag, %old, new = %handle, "collection listener replaced"),
            None => debug!(%tag, %handle, "collection listener attached"),
        }
        Ok(())
    }

    fn forget_collection(&self, tag: &Tag, id: SubscriptionId) -> ClientResult<()> {
        let mut collection = self.collection()?;
        if collection.get(tag).is_some_and(|sub| sub.id == id) {
            collection.remove(tag);
        }
        Ok(())
    }

    pub async fn detach_collection(&self, tag: &Tag) -> ClientResult<bool> {
        self.retry_orphans().await?;
        let current = self.collection()?.get(tag).map(|sub| (sub.id, sub.handle));
        let Some((id, handle)) = current else {
            return Ok(false);
        };
        self.store.unsubscribe(handle).await?;
        self.forget_collection(tag, id)?;
        debug!(%tag, %handle, "collection listener detached");
        Ok(true)
    }

    pub async fn detach_all_collection(&self) -> ClientResult<bool> {
        self.retry_orphans().await?;
        let current: Vec<(Tag, SubscriptionId, SubscriptionHandle)> = self
            .collection()?
            .values()
            .map(|sub| (sub.tag.clone(), sub.id, sub.handle))
            .collect();

        let mut first_err = None;
        for (tag, id, handle) in &current {
            match self.store.unsubscribe(*handle).await {
                Ok(_) => self.forget_collection(tag, *id)?,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e.into());
        }
        debug!(count = current.len(), "all collection listeners detached");
        Ok(!current.is_empty())
    }

    /// Snapshot of the keyed subscriptions on `key`.
    pub fn subscriptions_for(&self, key: &Key) -> ClientResult<Vec<Subscription>> {
        let keyed = self.keyed()?;
        let mut subs: Vec<Subscription> = keyed
            .values()
            .filter(|s| &s.key == key)
            .cloned()
            .collect();
        subs.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(subs)
    }

    /// Number of keyed and collection subscriptions.
    pub fn active_count(&self) -> ClientResult<(usize, usize)> {
        Ok((self.keyed()?.len(), self.collection()?.len()))
    }

    /// Handles awaiting another unsubscribe attempt.
    pub fn orphan_count(&self) -> ClientResult<usize> {
        Ok(self.orphans()?.len())
    }
}

impl std::fmt::Debug for ListenerMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (keyed, collection) = self.active_count().unwrap_or_default();
        f.debug_struct("ListenerMultiplexer")
            .field("keyed", &keyed)
            .field("collection", &collection)
            .field("orphans", &self.orphan_count().unwrap_or_default())
            .finish()
    }
}
