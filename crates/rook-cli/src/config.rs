use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use rook_client::ClientConfig;

/// Snapshot file used when neither the flag nor the config names one.
pub const DEFAULT_DB: &str = "rook.json";

/// Contents of the `--config` TOML file.
///
/// ```toml
/// db = "state/rook.json"
///
/// [client]
/// namespace = "games/v1"
/// detach_listeners_on_remove = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub db: Option<PathBuf>,
    pub client: ClientConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.client.namespace_path()?;
        Ok(config)
    }

    /// The snapshot path: the flag wins over the file, then the default.
    pub fn db_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.db.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }
}
