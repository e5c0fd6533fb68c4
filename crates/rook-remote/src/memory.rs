use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, info};

use rook_types::StorePath;

use crate::error::{RemoteError, RemoteResult};
use crate::traits::{ChangeCallback, RemoteStore, SubscriptionHandle};
use crate::tree;
use crate::watch::WatcherSet;

/// Tree and watchers share one lock so notifications are queued in the
/// same order as the mutations that caused them.
struct State {
    root: Value,
    watchers: WatcherSet,
}

/// In-memory, JSON-tree remote store.
///
/// Intended for tests, tools and embedding. Values are held behind a
/// `RwLock`; notifications are delivered on per-subscription tokio tasks.
/// `create_if_absent` is atomic.
pub struct InMemoryRemoteStore {
    state: RwLock<State>,
    available: AtomicBool,
}

impl InMemoryRemoteStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                root: Value::Object(Map::new()),
                watchers: WatcherSet::new(),
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Create a store pre-populated with a tree, e.g. one saved by
    /// [`snapshot`](Self::snapshot).
    pub fn from_snapshot(snapshot: Value) -> RemoteResult<Self> {
        let store = Self::new();
        let root = tree::normalize(snapshot)?;
        {
            let mut state = store.write_state()?;
            if let Some(root) = root {
                state.root = root;
            }
        }
        info!("in-memory store loaded from snapshot");
        Ok(store)
    }

    /// A copy of the whole tree.
    pub fn snapshot(&self) -> RemoteResult<Value> {
        Ok(self.read_state()?.root.clone())
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> RemoteResult<usize> {
        Ok(self.read_state()?.watchers.len())
    }

    /// Simulate losing (or regaining) the connection to the backend.
    /// While unavailable every operation fails with [`RemoteError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn ensure_available(&self) -> RemoteResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable)
        }
    }

    fn read_state(&self) -> RemoteResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| RemoteError::Internal(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> RemoteResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| RemoteError::Internal(format!("lock poisoned: {e}")))
    }

    /// Run a tree mutation and queue the resulting notifications.
    fn mutate<R>(
        &self,
        path: &StorePath,
        op: impl FnOnce(&mut Value) -> RemoteResult<R>,
    ) -> RemoteResult<R> {
        self.ensure_available()?;
        let mut guard = self.write_state()?;
        let state = &mut *guard;
        let captured = state.watchers.capture(&state.root, path);
        let result = op(&mut state.root)?;
        state.watchers.notify(&state.root, captured);
        Ok(result)
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn read(&self, path: &StorePath) -> RemoteResult<Option<Value>> {
        self.ensure_available()?;
        let state = self.read_state()?;
        Ok(tree::get(&state.root, path).cloned())
    }

    async fn write(&self, path: &StorePath, value: Value) -> RemoteResult<()> {
        self.mutate(path, |root| Ok(tree::set(root, path, value)?))?;
        debug!(%path, "value written");
        Ok(())
    }

    async fn patch(&self, path: &StorePath, fields: Map<String, Value>) -> RemoteResult<()> {
        self.mutate(path, |root| Ok(tree::merge(root, path, fields)?))?;
        debug!(%path, "value patched");
        Ok(())
    }

    async fn delete(&self, path: &StorePath) -> RemoteResult<bool> {
        let existed = self.mutate(path, |root| Ok(tree::remove(root, path).is_some()))?;
        debug!(%path, existed, "value deleted");
        Ok(existed)
    }

    async fn subscribe(
        &self,
        path: &StorePath,
        on_change: ChangeCallback,
    ) -> RemoteResult<SubscriptionHandle> {
        self.ensure_available()?;
        let runtime = Handle::try_current().map_err(|_| RemoteError::NoRuntime)?;
        let mut state = self.write_state()?;
        Ok(state.watchers.add(path.clone(), on_change, &runtime))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> RemoteResult<bool> {
        self.ensure_available()?;
        let mut state = self.write_state()?;
        Ok(state.watchers.remove(handle))
    }

    async fn exists(&self, path: &StorePath) -> RemoteResult<bool> {
        self.ensure_available()?;
        let state = self.read_state()?;
        Ok(tree::get(&state.root, path).is_some())
    }

    async fn read_batch(&self, paths: &[StorePath]) -> RemoteResult<Vec<Option<Value>>> {
        self.ensure_available()?;
        let state = self.read_state()?;
        Ok(paths
            .iter()
            .map(|path| tree::get(&state.root, path).cloned())
            .collect())
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> RemoteResult<bool> {
        let created = self.mutate(path, |root| {
            if tree::get(root, path).is_some() {
                return Ok(false);
            }
            tree::set(root, path, value)?;
            Ok(true)
        })?;
        debug!(%path, created, "conditional create");
        Ok(created)
    }

    fn supports_atomic_create(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for InMemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscriptions = self.subscription_count().unwrap_or_default();
        f.debug_struct("InMemoryRemoteStore")
            .field("available", &self.is_available())
            .field("subscriptions", &subscriptions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChangeFuture;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    /// A callback that forwards every notification into a channel.
    fn channel_callback() -> (ChangeCallback, mpsc::UnboundedReceiver<Option<Value>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: ChangeCallback = Arc::new(move |value: Option<Value>| -> ChangeFuture {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(value);
            })
        });
        (callback, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Option<Value>>) -> Option<Value> {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("notification timed out")
            .expect("channel closed")
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Option<Value>>) {
        let res = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(res.is_err(), "unexpected notification: {res:?}");
    }

    // ---- Test 1: Write then read ----
    #[tokio::test]
    async fn write_then_read() {
        let store = InMemoryRemoteStore::new();
        store
            .write(&path("users/1"), json!({"name": "Alice"}))
            .await
            .unwrap();

        let value = store.read(&path("users/1")).await.unwrap();
        assert_eq!(value, Some(json!({"name": "Alice"})));
        let parent = store.read(&path("users")).await.unwrap();
        assert_eq!(parent, Some(json!({"1": {"name": "Alice"}})));
    }

    // ---- Test 2: Read missing returns None ----
    #[tokio::test]
    async fn read_missing_is_none() {
        let store = InMemoryRemoteStore::new();
        assert!(store.read(&path("users/ghost")).await.unwrap().is_none());
        assert!(!store.exists(&path("users/ghost")).await.unwrap());
    }

    // ---- Test 3: Delete reports prior existence ----
    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryRemoteStore::new();
        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        assert!(store.delete(&path("u/1")).await.unwrap());
        assert!(!store.delete(&path("u/1")).await.unwrap());
        assert_eq!(store.snapshot().unwrap(), json!({}));
    }

    // ---- Test 4: Patch merges fields ----
    #[tokio::test]
    async fn patch_merges_fields() {
        let store = InMemoryRemoteStore::new();
        store
            .write(&path("u/1"), json!({"name": "A", "rating": 1}))
            .await
            .unwrap();
        let mut fields = Map::new();
        fields.insert("rating".into(), json!(2));
        store.patch(&path("u/1"), fields).await.unwrap();
        assert_eq!(
            store.read(&path("u/1")).await.unwrap(),
            Some(json!({"name": "A", "rating": 2}))
        );
    }

    // ---- Test 5: Conditional create is exclusive ----
    #[tokio::test]
    async fn create_if_absent_does_not_overwrite() {
        let store = InMemoryRemoteStore::new();
        assert!(store.supports_atomic_create());
        assert!(store
            .create_if_absent(&path("u/1"), json!({"name": "A"}))
            .await
            .unwrap());
        assert!(!store
            .create_if_absent(&path("u/1"), json!({"name": "B"}))
            .await
            .unwrap());
        assert_eq!(
            store.read(&path("u/1")).await.unwrap(),
            Some(json!({"name": "A"}))
        );
    }

    // ---- Test 6: Concurrent creates: exactly one wins ----
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_have_one_winner() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .create_if_absent(&path("u/1"), json!({ "writer": i }))
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    // ---- Test 7: Read batch preserves order ----
    #[tokio::test]
    async fn read_batch_preserves_order() {
        let store = InMemoryRemoteStore::new();
        store.write(&path("u/a"), json!({"n": "a"})).await.unwrap();
        store.write(&path("u/c"), json!({"n": "c"})).await.unwrap();

        let values = store
            .read_batch(&[path("u/c"), path("u/b"), path("u/a")])
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![Some(json!({"n": "c"})), None, Some(json!({"n": "a"}))]
        );
    }

    // ---- Test 8: Subscriber sees changes at its path ----
    #[tokio::test]
    async fn subscriber_sees_changes() {
        let store = InMemoryRemoteStore::new();
        let (callback, mut rx) = channel_callback();
        store.subscribe(&path("u/1"), callback).await.unwrap();

        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        store.write(&path("u/1"), json!({"n": 2})).await.unwrap();
        store.delete(&path("u/1")).await.unwrap();

        assert_eq!(next(&mut rx).await, Some(json!({"n": 1})));
        assert_eq!(next(&mut rx).await, Some(json!({"n": 2})));
        assert_eq!(next(&mut rx).await, None);
    }

    // ---- Test 9: Unrelated and no-op writes are silent ----
    #[tokio::test]
    async fn unrelated_and_identical_writes_are_silent() {
        let store = InMemoryRemoteStore::new();
        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        let (callback, mut rx) = channel_callback();
        store.subscribe(&path("u/1"), callback).await.unwrap();

        store.write(&path("u/2"), json!({"n": 9})).await.unwrap();
        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        assert_quiet(&mut rx).await;
    }

    // ---- Test 10: Parent subscriber sees child changes ----
    #[tokio::test]
    async fn parent_subscriber_sees_child_changes() {
        let store = InMemoryRemoteStore::new();
        let (callback, mut rx) = channel_callback();
        store.subscribe(&path("u"), callback).await.unwrap();

        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        assert_eq!(next(&mut rx).await, Some(json!({"1": {"n": 1}})));

        store.write(&path("u/2"), json!({"n": 2})).await.unwrap();
        assert_eq!(
            next(&mut rx).await,
            Some(json!({"1": {"n": 1}, "2": {"n": 2}}))
        );
    }

    // ---- Test 11: Child subscriber sees ancestor overwrite ----
    #[tokio::test]
    async fn child_subscriber_sees_ancestor_write() {
        let store = InMemoryRemoteStore::new();
        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        let (callback, mut rx) = channel_callback();
        store.subscribe(&path("u/1"), callback).await.unwrap();

        store.write(&path("u"), json!({"2": {"n": 2}})).await.unwrap();
        assert_eq!(next(&mut rx).await, None);
    }

    // ---- Test 12: Unsubscribe stops delivery ----
    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let store = InMemoryRemoteStore::new();
        let (callback, mut rx) = channel_callback();
        let handle = store.subscribe(&path("u/1"), callback).await.unwrap();
        assert_eq!(store.subscription_count().unwrap(), 1);

        assert!(store.unsubscribe(handle).await.unwrap());
        assert!(!store.unsubscribe(handle).await.unwrap());
        assert_eq!(store.subscription_count().unwrap(), 0);

        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        let res = timeout(Duration::from_millis(100), rx.recv()).await;
        // Either nothing arrives or the channel closes with the task.
        assert!(matches!(res, Err(_) | Ok(None)));
    }

    // ---- Test 13: Offline store fails every call ----
    #[tokio::test]
    async fn unavailable_store_fails() {
        let store = InMemoryRemoteStore::new();
        store.set_available(false);
        let err = store.read(&path("u/1")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable));
        let err = store.write(&path("u/1"), json!(1)).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable));

        store.set_available(true);
        assert!(store.read(&path("u/1")).await.unwrap().is_none());
    }

    // ---- Test 14: Snapshot round-trip ----
    #[tokio::test]
    async fn snapshot_round_trip() {
        let store = InMemoryRemoteStore::new();
        store.write(&path("u/1"), json!({"n": 1})).await.unwrap();
        let snapshot = store.snapshot().unwrap();

        let restored = InMemoryRemoteStore::from_snapshot(snapshot).unwrap();
        assert_eq!(
            restored.read(&path("u/1")).await.unwrap(),
            Some(json!({"n": 1}))
        );
    }

    // ---- Test 15: Invalid field names are rejected ----
    #[tokio::test]
    async fn invalid_field_names_rejected() {
        let store = InMemoryRemoteStore::new();
        let err = store
            .write(&path("u/1"), json!({"bad.field": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Type(_)));
        assert!(store.read(&path("u/1")).await.unwrap().is_none());
    }
}
