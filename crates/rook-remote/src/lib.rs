//! Remote hierarchical store for the Rook object store.
//!
//! The remote store is a tree-addressable key-value service: every node is
//! addressed by a [`StorePath`](rook_types::StorePath) and holds an opaque
//! JSON value. Clients read, write, patch and delete nodes, and subscribe
//! to change notifications scoped to a path.
//!
//! # Storage Backends
//!
//! All backends implement the [`RemoteStore`] trait:
//!
//! - [`InMemoryRemoteStore`] -- JSON-tree store for tests, tools and embedding
//!
//! # Notification Rules
//!
//! 1. A subscriber fires after any mutation that changes the value at its path.
//! 2. Nothing fires on subscribe; only changes are delivered.
//! 3. Notifications for one subscription are delivered in mutation order.
//! 4. Unsubscribing is best-effort: a callback that is already running finishes.

pub mod error;
pub mod memory;
pub mod traits;
pub mod tree;
mod watch;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{RemoteError, RemoteResult};
pub use memory::InMemoryRemoteStore;
pub use traits::{ChangeCallback, ChangeFuture, RemoteStore, SubscriptionHandle};
