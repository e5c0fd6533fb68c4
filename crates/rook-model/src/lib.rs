//! Game domain model for the Rook object store.
//!
//! # Modules
//!
//! - [`user`] -- [`User`] accounts under `users/`
//! - [`lobby`] -- [`Lobby`] rooms under `lobbies/` and their [`LobbyState`]
//! - [`registry`] -- [`game_registry`], the table seeding both types

pub mod lobby;
pub mod registry;
pub mod user;

pub use lobby::{Lobby, LobbyRecord, LobbyState};
pub use registry::game_registry;
pub use user::{User, UserRecord};
