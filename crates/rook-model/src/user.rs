//! Player accounts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rook_registry::{DomainObject, RegistryError, RegistryResult};
use rook_types::Key;

/// A registered player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub key: Key,
    pub name: String,
    pub email: Option<String>,
    pub rating: u32,
}

/// Wire shape of a [`User`] under `users/<key>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub key: String,
    pub name: String,
    /// Serialized as `null` when unset so a patch clears a stored email.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rating: u32,
}

impl User {
    /// Starting rating for new accounts.
    pub const DEFAULT_RATING: u32 = 1200;

    pub fn new(key: Key, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            email: None,
            rating: Self::DEFAULT_RATING,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_rating(mut self, rating: u32) -> Self {
        self.rating = rating;
        self
    }
}

fn check_name(name: &str) -> RegistryResult<()> {
    if name.trim().is_empty() {
        return Err(RegistryError::conversion(User::DOMAIN_TYPE, "empty name"));
    }
    Ok(())
}

/// An empty email is rejected rather than read back as "no email".
fn check_email(email: Option<&str>) -> RegistryResult<()> {
    if email.is_some_and(|e| e.trim().is_empty()) {
        return Err(RegistryError::conversion(User::DOMAIN_TYPE, "empty email"));
    }
    Ok(())
}

#[async_trait]
impl DomainObject for User {
    type Persisted = UserRecord;
    const DOMAIN_TYPE: &'static str = "user";
    const ROOT_PATH: &'static str = "users";

    fn key(&self) -> Key {
        self.key.clone()
    }

    fn validate(&self) -> RegistryResult<()> {
        check_name(&self.name)?;
        check_email(self.email.as_deref())
    }

    fn to_persisted(&self) -> UserRecord {
        UserRecord {
            key: self.key.to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
            rating: self.rating,
        }
    }

    async fn from_persisted(persisted: UserRecord) -> RegistryResult<Self> {
        check_name(&persisted.name)?;
        check_email(persisted.email.as_deref())?;
        Ok(Self {
            key: Key::new(persisted.key)?,
            name: persisted.name,
            email: persisted.email,
            rating: persisted.rating,
        })
    }
}
