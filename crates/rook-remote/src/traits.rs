use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use rook_types::StorePath;

use crate::error::RemoteResult;

/// Future returned by a [`ChangeCallback`]; awaited before the next
/// notification for the same subscription is delivered.
pub type ChangeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback invoked with the new value at a subscribed path.
///
/// The argument is `None` when the path no longer holds a value.
pub type ChangeCallback = Arc<dyn Fn(Option<Value>) -> ChangeFuture + Send + Sync>;

/// Opaque handle identifying one store-level subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Tree-addressable key-value service with path-scoped change notifications.
///
/// All implementations must satisfy these invariants:
/// - `read` returns exactly what the last completed write left at the path,
///   including children written through descendant paths.
/// - Writing `null` is equivalent to deleting the path.
/// - The store never interprets values beyond their tree structure.
/// - Notifications are delivered on the store's own tasks, never on the
///   caller's, and only for changes made after `subscribe` returned.
/// - All backend errors are propagated, never silently ignored.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the value at a path.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    async fn read(&self, path: &StorePath) -> RemoteResult<Option<Value>>;

    /// Replace the value at a path, creating parents as needed.
    async fn write(&self, path: &StorePath, value: Value) -> RemoteResult<()>;

    /// Merge top-level fields into the object at a path.
    ///
    /// Fields not named are left untouched; a `null` field is removed.
    async fn patch(&self, path: &StorePath, fields: Map<String, Value>) -> RemoteResult<()>;

    /// Delete the value at a path. Returns `true` if anything was there.
    async fn delete(&self, path: &StorePath) -> RemoteResult<bool>;

    /// Register `on_change` for changes at or below `path`.
    async fn subscribe(
        &self,
        path: &StorePath,
        on_change: ChangeCallback,
    ) -> RemoteResult<SubscriptionHandle>;

    /// Detach a subscription. Returns `false` if the handle was unknown.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> RemoteResult<bool>;

    /// Check whether a path holds a value.
    async fn exists(&self, path: &StorePath) -> RemoteResult<bool> {
        Ok(self.read(path).await?.is_some())
    }

    /// Read several paths, preserving order.
    ///
    /// Default implementation calls `read()` for each path. Backends may
    /// override for fewer round-trips.
    async fn read_batch(&self, paths: &[StorePath]) -> RemoteResult<Vec<Option<Value>>> {
        let mut values = Vec::with_capacity(paths.len());
        for path in paths {
            values.push(self.read(path).await?);
        }
        Ok(values)
    }

    /// Write `value` only if the path is currently empty. Returns `true` if
    /// the value was written.
    ///
    /// The default implementation reads and then writes. It is NOT atomic:
    /// two concurrent writers may both observe an empty path and both
    /// succeed. Backends with a conditional-write primitive override this
    /// and report it through [`supports_atomic_create`](Self::supports_atomic_create).
    async fn create_if_absent(&self, path: &StorePath, value: Value) -> RemoteResult<bool> {
        if self.read(path).await?.is_some() {
            return Ok(false);
        }
        self.write(path, value).await?;
        Ok(true)
    }

    /// Whether `create_if_absent` is a single atomic operation.
    fn supports_atomic_create(&self) -> bool {
        false
    }
}
