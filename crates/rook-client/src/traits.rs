//! The [`TypedStorage`] contract all domain-facing code programs against.

use std::sync::Arc;

use async_trait::async_trait;

use rook_registry::DomainObject;
use rook_types::{Key, Tag};

use crate::error::ClientResult;

/// Callback receiving the new value of one record.
pub type ValueListener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Callback receiving the full current collection of a root path.
pub type CollectionListener<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

/// Asynchronous CRUD and change notification over one registered domain
/// type.
///
/// Listener semantics:
/// - At most one listener exists per `(key, tag)`; adding another under the
///   same pair replaces it, and the old callback never fires for changes
///   made after the replacement returned.
/// - A listener fires at least once after each change made while it is
///   active; extra firings are possible.
/// - Deleting a listener is best-effort: a notification already in flight
///   may still reach the old callback once.
#[async_trait]
pub trait TypedStorage<T: DomainObject>: Send + Sync {
    /// Read one record. Fails with `NotFound` if absent.
    async fn get_value(&self, key: &Key) -> ClientResult<T>;

    /// Read several records in order. Fails with `NotFound` if any one is
    /// absent; partial results are never returned.
    async fn get_values(&self, keys: &[Key]) -> ClientResult<Vec<T>>;

    /// Read every record under the root, ordered by key.
    async fn get_all_values(&self) -> ClientResult<Vec<T>>;

    /// Every key under the root, in order.
    async fn get_all_keys(&self) -> ClientResult<Vec<Key>>;

    async fn key_exists(&self, key: &Key) -> ClientResult<bool>;

    /// Create a record. Fails with `AlreadyExists` if the key is taken, in
    /// which case the existing record is untouched.
    async fn register_value(&self, value: &T) -> ClientResult<bool>;

    /// Modify an existing record. Fails with `NotFound` if absent; never
    /// creates.
    async fn update_value(&self, value: &T) -> ClientResult<bool>;

    /// Create or overwrite a record.
    async fn set_value(&self, value: &T) -> ClientResult<bool>;

    /// Delete a record. Returns `false` if there was nothing to delete.
    async fn remove_value(&self, key: &Key) -> ClientResult<bool>;

    /// Watch one record. Returns `false` if the key does not exist.
    async fn add_on_change_listener(
        &self,
        key: &Key,
        tag: Tag,
        callback: ValueListener<T>,
    ) -> ClientResult<bool>;

    /// Watch the whole root; the callback receives the full collection.
    async fn add_on_collection_change_listener(
        &self,
        tag: Tag,
        callback: CollectionListener<T>,
    ) -> ClientResult<bool>;

    /// Returns `false` if no listener existed for `(key, tag)`.
    async fn delete_on_change_listener(&self, key: &Key, tag: &Tag) -> ClientResult<bool>;

    /// Returns `false` if no collection listener existed for `tag`.
    async fn delete_on_collection_change_listener(&self, tag: &Tag) -> ClientResult<bool>;

    /// Detach every listener on `key`. Returns `false` if there were none.
    async fn delete_all_on_change_listeners(&self, key: &Key) -> ClientResult<bool>;

    /// Detach every collection listener. Returns `false` if there were none.
    async fn delete_all_on_collection_change_listeners(&self) -> ClientResult<bool>;

    /// Like [`get_value`](Self::get_value), mapping `NotFound` to `None`.
    async fn find_value(&self, key: &Key) -> ClientResult<Option<T>> {
        match self.get_value(key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove the record stored under `value`'s key.
    async fn remove_entity(&self, value: &T) -> ClientResult<bool> {
        self.remove_value(&value.key()).await
    }

    /// [`add_on_change_listener`](Self::add_on_change_listener) taking a
    /// plain closure.
    async fn on_change<G, F>(&self, key: &Key, tag: G, callback: F) -> ClientResult<bool>
    where
        Self: Sized,
        G: Into<Tag> + Send,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.add_on_change_listener(key, tag.into(), Arc::new(callback))
            .await
    }

    /// [`add_on_collection_change_listener`](Self::add_on_collection_change_listener)
    /// taking a plain closure.
    async fn on_collection_change<G, F>(&self, tag: G, callback: F) -> ClientResult<bool>
    where
        Self: Sized,
        G: Into<Tag> + Send,
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        self.add_on_collection_change_listener(tag.into(), Arc::new(callback))
            .await
    }
}
