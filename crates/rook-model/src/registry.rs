//! The explicit registry table for the game model.

use tracing::debug;

use rook_registry::{Registry, RegistryResult};

use crate::lobby::Lobby;
use crate::user::User;

/// Build the registry seeding every game domain type at its default root.
pub fn game_registry() -> RegistryResult<Registry> {
    let registry = Registry::builder()
        .register::<User>()?
        .register::<Lobby>()?
        .build();
    debug!(types = registry.len(), "game registry built");
    Ok(registry)
}
