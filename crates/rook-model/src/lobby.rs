//! Game lobbies: a host, a bounded list of players, and a lifecycle state.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use rook_registry::{DomainObject, RegistryError, RegistryResult};
use rook_types::{Key, TypeError};

/// Lifecycle of a lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LobbyState {
    Open,
    InGame,
    Closed,
}

impl LobbyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InGame => "in_game",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LobbyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LobbyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_game" => Ok(Self::InGame),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown lobby state '{other}'")),
        }
    }
}

/// A game lobby.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lobby {
    pub key: Key,
    pub name: String,
    pub host: Key,
    pub players: Vec<Key>,
    pub max_players: u32,
    pub state: LobbyState,
    /// Must have millisecond precision; [`DomainObject::validate`] rejects
    /// finer timestamps.
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a [`Lobby`] under `lobbies/<key>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyRecord {
    pub key: String,
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub players: Vec<String>,
    pub max_players: u32,
    pub state: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Lobby {
    /// A new open lobby with a fresh UUIDv7 key and `host` as its only
    /// player.
    pub fn open(name: impl Into<String>, host: Key, max_players: u32) -> Result<Self, TypeError> {
        let key = Key::new(uuid::Uuid::now_v7().to_string())?;
        Ok(Self {
            key,
            name: name.into(),
            players: vec![host.clone()],
            host,
            max_players: max_players.max(1),
            state: LobbyState::Open,
            created_at: Utc::now().trunc_subsecs(3),
        })
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// Add `player` to an open lobby. Returns `false` if the lobby is not
    /// open, is full, or already seats the player.
    pub fn join(&mut self, player: Key) -> bool {
        if self.state != LobbyState::Open || self.is_full() || self.players.contains(&player) {
            return false;
        }
        self.players.push(player);
        true
    }

    /// Remove `player`. Returns `false` if they were not seated.
    pub fn leave(&mut self, player: &Key) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p != player);
        self.players.len() != before
    }
}

fn check_capacity(players: usize, max_players: u32) -> RegistryResult<()> {
    if players > max_players as usize {
        return Err(RegistryError::conversion(
            Lobby::DOMAIN_TYPE,
            format!("{players} players exceed the limit of {max_players}"),
        ));
    }
    Ok(())
}

#[async_trait]
impl DomainObject for Lobby {
    type Persisted = LobbyRecord;
    const DOMAIN_TYPE: &'static str = "lobby";
    const ROOT_PATH: &'static str = "lobbies";

    fn key(&self) -> Key {
        self.key.clone()
    }

    fn validate(&self) -> RegistryResult<()> {
        check_capacity(self.players.len(), self.max_players)?;
        if self.created_at.timestamp_subsec_nanos() % 1_000_000 != 0 {
            return Err(RegistryError::conversion(
                Self::DOMAIN_TYPE,
                "created_at is finer than millisecond precision",
            ));
        }
        Ok(())
    }

    fn to_persisted(&self) -> LobbyRecord {
        LobbyRecord {
            key: self.key.to_string(),
            name: self.name.clone(),
            host: self.host.to_string(),
            players: self.players.iter().map(Key::to_string).collect(),
            max_players: self.max_players,
            state: self.state.to_string(),
            created_at: self.created_at.timestamp_millis(),
        }
    }

    async fn from_persisted(persisted: LobbyRecord) -> RegistryResult<Self> {
        let state = persisted
            .state
            .parse::<LobbyState>()
            .map_err(|reason| RegistryError::conversion(Self::DOMAIN_TYPE, reason))?;

        check_capacity(persisted.players.len(), persisted.max_players)?;

        let created_at = DateTime::from_timestamp_millis(persisted.created_at).ok_or_else(|| {
            RegistryError::conversion(
                Self::DOMAIN_TYPE,
                format!("timestamp {} out of range", persisted.created_at),
            )
        })?;

        let players = persisted
            .players
            .into_iter()
            .map(Key::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key: Key::new(persisted.key)?,
            name: persisted.name,
            host: Key::new(persisted.host)?,
            players,
            max_players: persisted.max_players,
            state,
            created_at,
        })
    }
}
