//! The [`DomainObject`] capability trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use rook_types::Key;

use crate::error::RegistryResult;

/// An application entity stored through the typed object store.
///
/// Each domain type implements this once. It names where instances live
/// and how they convert to and from their flat persisted shape; the
/// [`Registry`](crate::Registry) decides whether the type may be used.
#[async_trait]
pub trait DomainObject: Clone + Send + Sync + Sized + 'static {
    /// The flat, serializable wire shape of this type.
    type Persisted: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Stable, human-readable name of the domain type.
    const DOMAIN_TYPE: &'static str;

    /// Root path used when the type is registered without an override.
    const ROOT_PATH: &'static str;

    /// The key this instance is stored under.
    fn key(&self) -> Key;

    /// Check that this value can be stored and read back unchanged.
    ///
    /// Called before every write. Types whose `from_persisted` rejects
    /// or rewrites some values must reject the same values here.
    fn validate(&self) -> RegistryResult<()> {
        Ok(())
    }

    /// Convert into the persisted shape. Never fails.
    fn to_persisted(&self) -> Self::Persisted;

    /// Rebuild a domain value from its persisted shape.
    async fn from_persisted(persisted: Self::Persisted) -> RegistryResult<Self>;
}
