//! Foundation types for the Rook typed object store.
//!
//! Every other Rook crate depends on `rook-types`. Nothing here performs
//! I/O; these are the validated building blocks used to address and shape
//! data in the remote hierarchical store.
//!
//! # Key Types
//!
//! - [`Key`] -- Identifier of one record within a root path
//! - [`Tag`] -- Caller-chosen label distinguishing listeners on one key
//! - [`StorePath`] -- Slash-separated address into the store tree
//! - [`RootPath`] -- The namespace under which one domain type lives
//! - [`Record`] -- Flat, serializable wire shape of a persisted value

pub mod error;
pub mod key;
pub mod path;
pub mod record;

pub use error::TypeError;
pub use key::{validate_key, Key, Tag, MAX_KEY_BYTES};
pub use path::{RootPath, StorePath};
pub use record::Record;
