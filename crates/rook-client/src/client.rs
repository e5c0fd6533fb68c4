//! [`StorageClient`]: shared entry point handing out typed adapters.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use rook_registry::{DomainObject, Registry};
use rook_remote::RemoteStore;

use crate::adapter::RemoteStorageAdapter;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::listeners::ListenerMultiplexer;

/// One store, one registry and one configuration, shared by every adapter.
///
/// Adapters for the same domain type share a listener multiplexer, so a
/// `(key, tag)` pair stays unique no matter which handle installed it.
pub struct StorageClient {
    store: Arc<dyn RemoteStore>,
    registry: Arc<Registry>,
    config: ClientConfig,
    multiplexers: Mutex<HashMap<TypeId, Arc<ListenerMultiplexer>>>,
}

impl StorageClient {
    pub fn new(store: Arc<dyn RemoteStore>, registry: Registry, config: ClientConfig) -> Self {
        debug!(types = registry.len(), namespace = ?config.namespace, "storage client created");
        Self {
            store,
            registry: Arc::new(registry),
            config,
            multiplexers: Mutex::new(HashMap::new()),
        }
    }

    /// A typed adapter for `T`. Fails with `Unregistered` if `T` is not in
    /// the registry.
    pub fn for_type<T: DomainObject>(&self) -> ClientResult<RemoteStorageAdapter<T>> {
        self.registry.root_path::<T>()?;

        let listeners = {
            let mut multiplexers = self
                .multiplexers
                .lock()
                .map_err(|e| ClientError::Internal(format!("lock poisoned: {e}")))?;
            Arc::clone(
                multiplexers
                    .entry(TypeId::of::<T>())
                    .or_insert_with(|| Arc::new(ListenerMultiplexer::new(Arc::clone(&self.store)))),
            )
        };

        Ok(RemoteStorageAdapter::with_listeners(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            self.config.clone(),
            listeners,
        ))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("registry", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
