//! Domain object registry for the Rook object store.
//!
//! The registry is the single source of truth mapping a domain type to its
//! storage location and to its persisted (on-the-wire) representation.
//!
//! # Architecture
//!
//! - **[`DomainObject`]** is the capability each domain type implements
//!   once: its root path, its persisted type, and both conversions.
//! - **[`Registry`]** is an immutable table built explicitly at start-up
//!   with [`RegistryBuilder`]. Nothing is registered as a side effect of
//!   constructing a domain value; looking up a type that was never
//!   registered fails with [`RegistryError::Unregistered`].
//!
//! # Modules
//!
//! - [`error`] -- Error types for registry operations
//! - [`domain`] -- The [`DomainObject`] capability trait
//! - [`registry`] -- [`Registry`], [`RegistryBuilder`] and [`RegistryEntry`]

pub mod domain;
pub mod error;
pub mod registry;

pub use domain::DomainObject;
pub use error::{RegistryError, RegistryResult};
pub use registry::{PersistedType, Registry, RegistryBuilder, RegistryEntry};
