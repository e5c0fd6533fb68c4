//! Record keys and listener tags.
//!
//! Keys follow the rules of Firebase-style hierarchical databases:
//! - Must be non-empty and at most [`MAX_KEY_BYTES`] bytes
//! - Must not contain `/`, `.`, `#`, `$`, `[` or `]`
//! - Must not contain ASCII control characters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum length of a key in UTF-8 bytes.
pub const MAX_KEY_BYTES: usize = 768;

/// Characters that are forbidden anywhere in a key.
const FORBIDDEN_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Validate a key, returning `Ok(())` if it is well-formed.
///
/// # Examples
///
/// ```
/// use rook_types::validate_key;
///
/// assert!(validate_key("alice").is_ok());
/// assert!(validate_key("lobby-42").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("users/alice").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".into(),
        });
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: format!("key exceeds {MAX_KEY_BYTES} bytes"),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if key.contains(*ch) {
            return Err(TypeError::InvalidKey {
                key: key.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if key.chars().any(|c| c.is_ascii_control()) {
        return Err(TypeError::InvalidKey {
            key: key.to_string(),
            reason: "contains a control character".into(),
        });
    }

    Ok(())
}

/// Identifier of one record, unique within a root path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Create a key, validating it first.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Key {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Caller-chosen label that distinguishes independent listeners on one key.
///
/// Tags are never written to the store, so any string is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
