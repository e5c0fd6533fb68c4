//! Typed storage client for the Rook object store.
//!
//! Domain code programs against [`TypedStorage`]: asynchronous CRUD,
//! existence checks and tagged change listeners over one registered domain
//! type. [`RemoteStorageAdapter`] implements it on top of any
//! [`RemoteStore`](rook_remote::RemoteStore), resolving root paths and
//! conversions through the [`Registry`](rook_registry::Registry).
//!
//! # Modules
//!
//! - [`error`] -- [`ClientError`] and the recoverable/programming split
//! - [`config`] -- [`ClientConfig`] (namespace, listener detach policy)
//! - [`traits`] -- The [`TypedStorage`] contract
//! - [`adapter`] -- [`RemoteStorageAdapter`]
//! - [`listeners`] -- [`ListenerMultiplexer`] keyed by `(key, tag)`
//! - [`client`] -- [`StorageClient`], the shared entry point
//!
//! # Example
//!
//! ```ignore
//! let client = StorageClient::new(store, registry, ClientConfig::default());
//! let users = client.for_type::<User>()?;
//! users.register_value(&alice).await?;
//! users.on_change(&alice.key, "profile", |u| println!("{}", u.name)).await?;
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod listeners;
pub mod traits;

pub use adapter::RemoteStorageAdapter;
pub use client::StorageClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use listeners::{ListenerMultiplexer, RootSubscription, Subscription, SubscriptionId};
pub use traits::{CollectionListener, TypedStorage, ValueListener};
