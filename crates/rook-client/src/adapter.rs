//! [`RemoteStorageAdapter`]: the [`TypedStorage`] implementation backed by a
//! [`RemoteStore`].

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use rook_registry::{DomainObject, Registry};
use rook_remote::{ChangeCallback, ChangeFuture, RemoteStore};
use rook_types::{Key, StorePath, Tag};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::listeners::{ListenerMultiplexer, SubscriptionId};
use crate::traits::{CollectionListener, TypedStorage, ValueListener};

/// Typed CRUD and change notification for one domain type `T`.
///
/// Every operation resolves `T`'s root path through the registry, so an
/// adapter for an unregistered type can be built but every call on it
/// fails with `Unregistered`.
pub struct RemoteStorageAdapter<T: DomainObject> {
    store: Arc<dyn RemoteStore>,
    registry: Arc<Registry>,
    config: ClientConfig,
    listeners: Arc<ListenerMultiplexer>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DomainObject> RemoteStorageAdapter<T> {
    /// Create an adapter with its own listener multiplexer.
    pub fn new(store: Arc<dyn RemoteStore>, registry: Arc<Registry>, config: ClientConfig) -> Self {
        let listeners = Arc::new(ListenerMultiplexer::new(Arc::clone(&store)));
        Self::with_listeners(store, registry, config, listeners)
    }

    /// Create an adapter sharing an existing multiplexer.
    pub fn with_listeners(
        store: Arc<dyn RemoteStore>,
        registry: Arc<Registry>,
        config: ClientConfig,
        listeners: Arc<ListenerMultiplexer>,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            listeners,
            _marker: PhantomData,
        }
    }

    pub fn listeners(&self) -> &ListenerMultiplexer {
        &self.listeners
    }

    /// `namespace/root_path` for `T`.
    fn root(&self) -> ClientResult<StorePath> {
        let root = self.registry.root_path::<T>()?;
        Ok(self.config.namespace_path()?.join(root.as_path()))
    }

    fn record_path(&self, key: &Key) -> ClientResult<StorePath> {
        Ok(self.root()?.child(key))
    }

    fn not_found(key: &Key) -> ClientError {
        ClientError::NotFound {
            domain_type: T::DOMAIN_TYPE,
            key: key.clone(),
        }
    }

    async fn convert(&self, value: Value) -> ClientResult<T> {
        Ok(self.registry.convert_to_domain::<T>(value).await?)
    }

    /// Convert every child of a collection node, in key order.
    async fn convert_collection(
        registry: &Registry,
        root: &StorePath,
        node: Option<Value>,
    ) -> ClientResult<Vec<T>> {
        let children = match node {
            None => return Ok(Vec::new()),
            Some(Value::Object(children)) => children,
            Some(_) => {
                return Err(ClientError::MalformedCollection { path: root.clone() });
            }
        };

        let mut values = Vec::with_capacity(children.len());
        for (_, child) in children {
            values.push(registry.convert_to_domain::<T>(child).await?);
        }
        Ok(values)
    }

    /// Store callback feeding a keyed listener.
    fn value_callback(
        &self,
        key: &Key,
        tag: &Tag,
        id: SubscriptionId,
        callback: ValueListener<T>,
    ) -> ChangeCallback {
        let registry = Arc::clone(&self.registry);
        let listeners: Weak<ListenerMultiplexer> = Arc::downgrade(&self.listeners);
        let detach_on_remove = self.config.detach_listeners_on_remove;
        let key = key.clone();
        let tag = tag.clone();

        Arc::new(move |value: Option<Value>| -> ChangeFuture {
            let registry = Arc::clone(&registry);
            let listeners = listeners.clone();
            let callback = Arc::clone(&callback);
            let key = key.clone();
            let tag = tag.clone();
            Box::pin(async move {
                match value {
                    Some(value) => match registry.convert_to_domain::<T>(value).await {
                        Ok(domain) => callback(domain),
                        Err(e) => {
                            warn!(%key, %tag, error = %e, "dropping undecodable change");
                        }
                    },
                    None if detach_on_remove => {
                        let Some(listeners) = listeners.upgrade() else {
                            return;
                        };
                        if let Err(e) = listeners.detach_if_current(&key, &tag, id).await {
                            warn!(%key, %tag, error = %e, "failed to detach listener of removed record");
                        }
                    }
                    None => {}
                }
            })
        })
    }

    /// Store callback feeding a collection listener.
    fn collection_callback(
        &self,
        root: StorePath,
        tag: &Tag,
        callback: CollectionListener<T>,
    ) -> ChangeCallback {
        let registry = Arc::clone(&self.registry);
        let tag = tag.clone();

        Arc::new(move |node: Option<Value>| -> ChangeFuture {
            let registry = Arc::clone(&registry);
            let callback = Arc::clone(&callback);
            let root = root.clone();
            let tag = tag.clone();
            Box::pin(async move {
                match Self::convert_collection(&registry, &root, node).await {
                    Ok(values) => callback(values),
                    Err(e) => {
                        warn!(%root, %tag, error = %e, "dropping undecodable collection change");
                    }
                }
            })
        })
    }
}

#[async_trait]
impl<T: DomainObject> TypedStorage<T> for RemoteStorageAdapter<T> {
    async fn get_value(&self, key: &Key) -> ClientResult<T> {
        let path = self.record_path(key)?;
        let value = self
            .store
            .read(&path)
            .await?
            .ok_or_else(|| Self::not_found(key))?;
        self.convert(value).await
    }

    async fn get_values(&self, keys: &[Key]) -> ClientResult<Vec<T>> {
        let root = self.root()?;
        let paths: Vec<StorePath> = keys.iter().map(|k| root.child(k)).collect();
        let found = self.store.read_batch(&paths).await?;

        let mut present = Vec::with_capacity(found.len());
        for (key, value) in keys.iter().zip(found) {
            present.push(value.ok_or_else(|| Self::not_found(key))?);
        }

        let mut values = Vec::with_capacity(present.len());
        for value in present {
            values.push(self.convert(value).await?);
        }
        Ok(values)
    }

    async fn get_all_values(&self) -> ClientResult<Vec<T>> {
        let root = self.root()?;
        let node = self.store.read(&root).await?;
        Self::convert_collection(&self.registry, &root, node).await
    }

    async fn get_all_keys(&self) -> ClientResult<Vec<Key>> {
        let root = self.root()?;
        match self.store.read(&root).await? {
            None => Ok(Vec::new()),
            Some(Value::Object(children)) => children
                .keys()
                .map(|k| Key::new(k.as_str()).map_err(ClientError::from))
                .collect(),
            Some(_) => Err(ClientError::MalformedCollection { path: root }),
        }
    }

    async fn key_exists(&self, key: &Key) -> ClientResult<bool> {
        let path = self.record_path(key)?;
        Ok(self.store.exists(&path).await?)
    }

    async fn register_value(&self, value: &T) -> ClientResult<bool> {
        let key = value.key();
        let path = self.record_path(&key)?;
        let record = self.registry.encode(value)?;

        if !self.store.create_if_absent(&path, record.into_value()).await? {
            return Err(ClientError::AlreadyExists {
                domain_type: T::DOMAIN_TYPE,
                key,
            });
        }
        debug!(domain_type = T::DOMAIN_TYPE, %path, "record created");
        Ok(true)
    }

    async fn update_value(&self, value: &T) -> ClientResult<bool> {
        let key = value.key();
        let path = self.record_path(&key)?;
        let record = self.registry.encode(value)?;

        if !self.store.exists(&path).await? {
            return Err(Self::not_found(&key));
        }
        self.store.patch(&path, record.into_fields()).await?;
        debug!(domain_type = T::DOMAIN_TYPE, %path, "record updated");
        Ok(true)
    }

    async fn set_value(&self, value: &T) -> ClientResult<bool> {
        let path = self.record_path(&value.key())?;
        let record = self.registry.encode(value)?;
        self.store.write(&path, record.into_value()).await?;
        debug!(domain_type = T::DOMAIN_TYPE, %path, "record set");
        Ok(true)
    }

    async fn remove_value(&self, key: &Key) -> ClientResult<bool> {
        let path = self.record_path(key)?;
        let existed = self.store.delete(&path).await?;
        debug!(domain_type = T::DOMAIN_TYPE, %path, existed, "record removed");
        Ok(existed)
    }

    async fn add_on_change_listener(
        &self,
        key: &Key,
        tag: Tag,
        callback: ValueListener<T>,
    ) -> ClientResult<bool> {
        let path = self.record_path(key)?;
        if !self.store.exists(&path).await? {
            return Ok(false);
        }

        let id = self.listeners.next_id();
        let on_change = self.value_callback(key, &tag, id, callback);
        self.listeners
            .attach(id, key, &tag, path.clone(), on_change)
            .await?;

        // The record may have been removed between the check and the
        // subscribe, in which case no removal notification will follow.
        if !self.store.exists(&path).await? {
            self.listeners.detach_if_current(key, &tag, id).await?;
            debug!(domain_type = T::DOMAIN_TYPE, %path, %tag, "record vanished while attaching");
            return Ok(false);
        }
        Ok(true)
    }

    async fn add_on_collection_change_listener(
        &self,
        tag: Tag,
        callback: CollectionListener<T>,
    ) -> ClientResult<bool> {
        let root = self.root()?;
        let id = self.listeners.next_id();
        let on_change = self.collection_callback(root.clone(), &tag, callback);
        self.listeners
            .attach_collection(id, &tag, root, on_change)
            .await?;
        Ok(true)
    }

    async fn delete_on_change_listener(&self, key: &Key, tag: &Tag) -> ClientResult<bool> {
        self.registry.root_path::<T>()?;
        self.listeners.detach(key, tag).await
    }

    async fn delete_on_collection_change_listener(&self, tag: &Tag) -> ClientResult<bool> {
        self.registry.root_path::<T>()?;
        self.listeners.detach_collection(tag).await
    }

    async fn delete_all_on_change_listeners(&self, key: &Key) -> ClientResult<bool> {
        self.registry.root_path::<T>()?;
        self.listeners.detach_all(key).await
    }

    async fn delete_all_on_collection_change_listeners(&self) -> ClientResult<bool> {
        self.registry.root_path::<T>()?;
        self.listeners.detach_all_collection().await
    }
}

impl<T: DomainObject> std::fmt::Debug for RemoteStorageAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorageAdapter")
            .field("domain_type", &T::DOMAIN_TYPE)
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .finish()
    }
}
