//! Addresses into the remote hierarchical store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::{validate_key, Key};

/// A slash-separated address into the store tree.
///
/// The empty path is the root of the tree. Every segment obeys the same
/// rules as a [`Key`].
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the store tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path of the form `a/b/c`.
    ///
    /// A single leading or trailing `/` is tolerated; empty components in
    /// the middle are not.
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            validate_key(segment).map_err(|e| TypeError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path of the record stored under `key` below this path.
    pub fn child(&self, key: &Key) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.as_str().to_string());
        Self { segments }
    }

    /// Concatenate two paths.
    pub fn join(&self, other: &StorePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// The last segment, or `None` at the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Returns `true` if one path is an ancestor of the other, or they are
    /// equal. A change at either path can alter the value seen at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({self})")
    }
}

impl FromStr for StorePath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StorePath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.to_string()
    }
}

/// The namespace under which every instance of one domain type is stored.
///
/// A root path is never the store root itself.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootPath(StorePath);

impl RootPath {
    pub fn new(path: &str) -> Result<Self, TypeError> {
        let parsed = StorePath::parse(path)?;
        if parsed.is_root() {
            return Err(TypeError::InvalidPath {
                path: path.to_string(),
                reason: "root path must name at least one segment".into(),
            });
        }
        Ok(Self(parsed))
    }

    pub fn as_path(&self) -> &StorePath {
        &self.0
    }

    /// The store path of the record under `key`.
    pub fn child(&self, key: &Key) -> StorePath {
        self.0.child(key)
    }

    /// Returns `true` if a record of one root could live inside the other.
    pub fn conflicts_with(&self, other: &RootPath) -> bool {
        self.0.overlaps(&other.0)
    }
}

impl fmt::Display for RootPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for RootPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootPath({})", self.0)
    }
}

impl TryFrom<String> for RootPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<RootPath> for String {
    fn from(path: RootPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_and_display() {
        let path = StorePath::parse("games/v1/users").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.to_string(), "games/v1/users");
        assert_eq!(path.last(), Some("users"));
    }

    #[test]
    fn parse_tolerates_outer_slashes() {
        assert_eq!(
            StorePath::parse("/users/").unwrap(),
            StorePath::parse("users").unwrap()
        );
        assert!(StorePath::parse("").unwrap().is_root());
        assert!(StorePath::parse("/").unwrap().is_root());
    }

    #[test]
    fn parse_rejects_bad_segments() {
        assert!(StorePath::parse("a//b").is_err());
        assert!(StorePath::parse("a/b.c").is_err());
        assert!(StorePath::parse("a/$b").is_err());
    }

    #[test]
    fn child_and_parent() {
        let root = StorePath::parse("users").unwrap();
        let key = Key::new("alice").unwrap();
        let child = root.child(&key);
        assert_eq!(child.to_string(), "users/alice");
        assert_eq!(child.parent(), Some(root));
        assert_eq!(StorePath::root().parent(), None);
    }

    #[test]
    fn ancestry() {
        let users = StorePath::parse("users").unwrap();
        let alice = StorePath::parse("users/alice").unwrap();
        let lobbies = StorePath::parse("lobbies").unwrap();

        assert!(users.is_ancestor_of(&alice));
        assert!(!alice.is_ancestor_of(&users));
        assert!(!users.is_ancestor_of(&users));
        assert!(StorePath::root().is_ancestor_of(&users));

        assert!(users.overlaps(&alice));
        assert!(alice.overlaps(&users));
        assert!(users.overlaps(&users));
        assert!(!users.overlaps(&lobbies));
    }

    #[test]
    fn sibling_prefix_is_not_ancestor() {
        let user = StorePath::parse("user").unwrap();
        let users = StorePath::parse("users/alice").unwrap();
        assert!(!user.is_ancestor_of(&users));
    }

    #[test]
    fn root_path_rejects_store_root() {
        assert!(RootPath::new("").is_err());
        assert!(RootPath::new("/").is_err());
        assert!(RootPath::new("users").is_ok());
    }

    #[test]
    fn root_path_conflicts() {
        let games = RootPath::new("games").unwrap();
        let lobbies = RootPath::new("games/lobbies").unwrap();
        let users = RootPath::new("users").unwrap();
        assert!(games.conflicts_with(&lobbies));
        assert!(lobbies.conflicts_with(&games));
        assert!(!games.conflicts_with(&users));
    }

    #[test]
    fn join_paths() {
        let ns = StorePath::parse("games/v1").unwrap();
        let root = RootPath::new("users").unwrap();
        assert_eq!(ns.join(root.as_path()).to_string(), "games/v1/users");
        assert_eq!(StorePath::root().join(root.as_path()).to_string(), "users");
    }

    proptest! {
        #[test]
        fn display_reparses(segments in proptest::collection::vec("[a-zA-Z0-9_-]{1,12}", 0..6)) {
            let path = StorePath::parse(&segments.join("/")).unwrap();
            prop_assert_eq!(path.len(), segments.len());
            prop_assert_eq!(StorePath::parse(&path.to_string()).unwrap(), path);
        }
    }
}
