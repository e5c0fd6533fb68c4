//! The explicit, immutable domain type table.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::info;

use rook_types::{Record, RootPath};

use crate::domain::DomainObject;
use crate::error::{RegistryError, RegistryResult};

/// Runtime identity of a persisted representation type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistedType {
    id: TypeId,
    name: &'static str,
}

impl PersistedType {
    pub fn of<D: 'static>() -> Self {
        Self {
            id: TypeId::of::<D>(),
            name: type_name::<D>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified Rust type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<D: 'static>(&self) -> bool {
        self.id == TypeId::of::<D>()
    }
}

impl fmt::Debug for PersistedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersistedType({})", self.name)
    }
}

/// One row of the registry: where a domain type lives and what it
/// persists as.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    domain_type: &'static str,
    domain_type_id: TypeId,
    root_path: RootPath,
    persisted_type: PersistedType,
}

impl RegistryEntry {
    fn new<T: DomainObject>(root_path: RootPath) -> Self {
        Self {
            domain_type: T::DOMAIN_TYPE,
            domain_type_id: TypeId::of::<T>(),
            root_path,
            persisted_type: PersistedType::of::<T::Persisted>(),
        }
    }

    pub fn domain_type(&self) -> &'static str {
        self.domain_type
    }

    pub fn root_path(&self) -> &RootPath {
        &self.root_path
    }

    pub fn persisted_type(&self) -> PersistedType {
        self.persisted_type
    }
}

/// Builds a [`Registry`] from an explicit list of domain types.
///
/// ```
/// # use rook_registry::{Registry, RegistryResult};
/// # fn build() -> RegistryResult<Registry> {
/// let registry = Registry::builder()
///     // .register::<User>()?
///     // .register_at::<Lobby>("games/lobbies")?
///     .build();
/// # Ok(registry)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<RegistryEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its own [`DomainObject::ROOT_PATH`].
    pub fn register<T: DomainObject>(self) -> RegistryResult<Self> {
        self.register_at::<T>(T::ROOT_PATH)
    }

    /// Register `T` under an explicit root path.
    pub fn register_at<T: DomainObject>(mut self, root_path: &str) -> RegistryResult<Self> {
        let root_path = RootPath::new(root_path)?;

        if self.entries.iter().any(|e| {
            e.domain_type_id == TypeId::of::<T>() || e.domain_type == T::DOMAIN_TYPE
        }) {
            return Err(RegistryError::DuplicateDomainType {
                domain_type: T::DOMAIN_TYPE,
            });
        }

        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.root_path.conflicts_with(&root_path))
        {
            return Err(RegistryError::RootPathConflict {
                domain_type: T::DOMAIN_TYPE,
                root_path: root_path.to_string(),
                existing: existing.domain_type,
            });
        }

        self.entries.push(RegistryEntry::new::<T>(root_path));
        Ok(self)
    }

    pub fn build(self) -> Registry {
        let by_type = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.domain_type_id, idx))
            .collect();
        let registry = Registry {
            entries: self.entries,
            by_type,
        };
        info!(types = registry.len(), "domain registry built");
        registry
    }
}

/// Immutable mapping from domain type to storage location and
/// persisted representation.
///
/// Built once at start-up and shared (typically behind an `Arc`) for the
/// life of the process.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    by_type: HashMap<TypeId, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn entry_for<T: DomainObject>(&self) -> RegistryResult<&RegistryEntry> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|idx| &self.entries[*idx])
            .ok_or(RegistryError::Unregistered {
                domain_type: T::DOMAIN_TYPE,
            })
    }

    pub fn contains<T: DomainObject>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// The root path registered for `T`.
    pub fn root_path<T: DomainObject>(&self) -> RegistryResult<&RootPath> {
        Ok(self.entry_for::<T>()?.root_path())
    }

    /// The persisted representation registered for `T`.
    pub fn persisted_type<T: DomainObject>(&self) -> RegistryResult<PersistedType> {
        Ok(self.entry_for::<T>()?.persisted_type())
    }

    /// Convert a wire value read from the store into a `T`.
    ///
    /// Fails with [`RegistryError::TypeMismatch`] if the value is not a flat
    /// record of `T`'s persisted shape.
    pub async fn convert_to_domain<T: DomainObject>(&self, persisted: Value) -> RegistryResult<T> {
        let entry = self.entry_for::<T>()?;
        let mismatch = |reason: String| RegistryError::TypeMismatch {
            domain_type: T::DOMAIN_TYPE,
            expected: entry.persisted_type.name(),
            reason,
        };

        let record = Record::from_value(persisted).map_err(|e| mismatch(e.to_string()))?;
        let persisted: T::Persisted = record.decode().map_err(|e| mismatch(e.to_string()))?;
        T::from_persisted(persisted).await
    }

    /// Convert an in-memory persisted value into a `T`, checking its
    /// runtime type against the registered persisted type.
    pub async fn convert_persisted_to_domain<T, D>(&self, persisted: D) -> RegistryResult<T>
    where
        T: DomainObject,
        D: Any + Send,
    {
        let entry = self.entry_for::<T>()?;
        let boxed: Box<dyn Any + Send> = Box::new(persisted);
        let persisted = boxed
            .downcast::<T::Persisted>()
            .map_err(|_| RegistryError::TypeMismatch {
                domain_type: T::DOMAIN_TYPE,
                expected: entry.persisted_type.name(),
                reason: format!("found {}", type_name::<D>()),
            })?;
        T::from_persisted(*persisted).await
    }

    /// Convert a domain value into its persisted shape.
    pub fn convert_to_persisted<T: DomainObject>(&self, value: &T) -> T::Persisted {
        value.to_persisted()
    }

    /// Convert a registered domain value into the record written to the store.
    ///
    /// Fails with [`RegistryError::Conversion`] if the value does not pass
    /// [`DomainObject::validate`] or if every field is `null`, since such a
    /// record would not be stored at all.
    pub fn encode<T: DomainObject>(&self, value: &T) -> RegistryResult<Record> {
        self.entry_for::<T>()?;
        value.validate()?;
        let record = Record::encode(&value.to_persisted())?;
        if record.fields().values().all(Value::is_null) {
            return Err(RegistryError::conversion(
                T::DOMAIN_TYPE,
                "record has no stored fields",
            ));
        }
        Ok(record)
    }

    /// Look up an entry by domain type name.
    pub fn entry(&self, domain_type: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.domain_type == domain_type)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rook_types::Key;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    struct Player {
        key: Key,
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct PlayerRecord {
        key: String,
        name: String,
    }

    #[async_trait]
    impl DomainObject for Player {
        type Persisted = PlayerRecord;
        const DOMAIN_TYPE: &'static str = "player";
        const ROOT_PATH: &'static str = "players";

        fn key(&self) -> Key {
            self.key.clone()
        }

        fn validate(&self) -> RegistryResult<()> {
            if self.name.is_empty() {
                return Err(RegistryError::conversion(Self::DOMAIN_TYPE, "empty name"));
            }
            Ok(())
        }

        fn to_persisted(&self) -> PlayerRecord {
            PlayerRecord {
                key: self.key.to_string(),
                name: self.name.clone(),
            }
        }

        async fn from_persisted(persisted: PlayerRecord) -> RegistryResult<Self> {
            if persisted.name.is_empty() {
                return Err(RegistryError::conversion(Self::DOMAIN_TYPE, "empty name"));
            }
            Ok(Self {
                key: Key::new(persisted.key)?,
                name: persisted.name,
            })
        }
    }

    #[derive(Clone, Debug)]
    struct Table;

    #[derive(Serialize, Deserialize)]
    struct TableRecord {
        seats: u8,
    }

    #[async_trait]
    impl DomainObject for Table {
        type Persisted = TableRecord;
        const DOMAIN_TYPE: &'static str = "table";
        const ROOT_PATH: &'static str = "tables";

        fn key(&self) -> Key {
            Key::new("only").unwrap()
        }

        fn to_persisted(&self) -> TableRecord {
            TableRecord { seats: 4 }
        }

        async fn from_persisted(_: TableRecord) -> RegistryResult<Self> {
            Ok(Table)
        }
    }

    #[derive(Clone, Debug)]
    struct Memo {
        note: Option<String>,
    }

    #[derive(Serialize, Deserialize)]
    struct MemoRecord {
        note: Option<String>,
    }

    #[async_trait]
    impl DomainObject for Memo {
        type Persisted = MemoRecord;
        const DOMAIN_TYPE: &'static str = "memo";
        const ROOT_PATH: &'static str = "memos";

        fn key(&self) -> Key {
            Key::new("memo").unwrap()
        }

        fn to_persisted(&self) -> MemoRecord {
            MemoRecord {
                note: self.note.clone(),
            }
        }

        async fn from_persisted(persisted: MemoRecord) -> RegistryResult<Self> {
            Ok(Memo {
                note: persisted.note,
            })
        }
    }

    fn alice() -> Player {
        Player {
            key: Key::new("1").unwrap(),
            name: "Alice".into(),
        }
    }

    #[test]
    fn root_path_and_persisted_type() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        assert_eq!(registry.root_path::<Player>().unwrap().to_string(), "players");
        assert!(registry.persisted_type::<Player>().unwrap().is::<PlayerRecord>());
        assert!(registry.contains::<Player>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_lookups_fail() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let err = registry.root_path::<Table>().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Unregistered {
                domain_type: "table"
            }
        ));
        assert!(registry.persisted_type::<Table>().is_err());
        assert!(registry.encode(&Table).is_err());
    }

    #[test]
    fn register_at_overrides_root() {
        let registry = Registry::builder()
            .register_at::<Player>("games/v1/players")
            .unwrap()
            .build();
        assert_eq!(
            registry.root_path::<Player>().unwrap().to_string(),
            "games/v1/players"
        );
        assert_eq!(
            registry.entry("player").unwrap().root_path().to_string(),
            "games/v1/players"
        );
    }

    #[test]
    fn duplicate_registration_rejected() {
        let err = Registry::builder()
            .register::<Player>()
            .unwrap()
            .register_at::<Player>("elsewhere")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDomainType { .. }));
    }

    #[test]
    fn conflicting_roots_rejected() {
        let err = Registry::builder()
            .register_at::<Player>("games")
            .unwrap()
            .register_at::<Table>("games/tables")
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::RootPathConflict {
                existing: "player",
                ..
            }
        ));
    }

    #[test]
    fn invalid_root_rejected() {
        let err = Registry::builder().register_at::<Player>("bad.root").unwrap_err();
        assert!(matches!(err, RegistryError::Type(_)));
    }

    #[tokio::test]
    async fn round_trip_through_record() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let record = registry.encode(&alice()).unwrap();
        let back: Player = registry
            .convert_to_domain(record.into_value())
            .await
            .unwrap();
        assert_eq!(back, alice());
    }

    #[tokio::test]
    async fn round_trip_through_persisted() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let persisted = registry.convert_to_persisted(&alice());
        let back: Player = registry.convert_persisted_to_domain(persisted).await.unwrap();
        assert_eq!(back, alice());
    }

    #[tokio::test]
    async fn wrong_runtime_type_is_mismatch() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let err = registry
            .convert_persisted_to_domain::<Player, _>(TableRecord { seats: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn wrong_wire_shape_is_mismatch() {
        let registry = Registry::builder().register::<Player>().unwrap().build();

        let err = registry
            .convert_to_domain::<Player>(json!({"seats": 4}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));

        let err = registry
            .convert_to_domain::<Player>(json!("not a record"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn domain_validation_surfaces_as_conversion() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let err = registry
            .convert_to_domain::<Player>(json!({"key": "1", "name": ""}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conversion { .. }));
    }

    #[tokio::test]
    async fn unregistered_conversion_fails() {
        let registry = Registry::builder().build();
        assert!(registry.is_empty());
        let err = registry
            .convert_to_domain::<Player>(json!({"key": "1", "name": "A"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unregistered { .. }));
    }

    #[test]
    fn encode_rejects_values_that_would_not_read_back() {
        let registry = Registry::builder().register::<Player>().unwrap().build();
        let nameless = Player {
            key: Key::new("1").unwrap(),
            name: String::new(),
        };
        let err = registry.encode(&nameless).unwrap_err();
        assert!(matches!(err, RegistryError::Conversion { .. }));
        assert!(registry.encode(&alice()).is_ok());
    }

    #[test]
    fn encode_rejects_all_null_record() {
        let registry = Registry::builder().register::<Memo>().unwrap().build();
        let err = registry.encode(&Memo { note: None }).unwrap_err();
        assert!(matches!(err, RegistryError::Conversion { .. }));

        let record = registry
            .encode(&Memo {
                note: Some("hi".into()),
            })
            .unwrap();
        assert_eq!(record.len(), 1);
    }
}
