use serde::{Deserialize, Serialize};

use rook_types::StorePath;

use crate::error::{ClientError, ClientResult};

/// Configuration for the typed storage client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path prefix under which every root path lives, e.g. `games/v1`.
    /// `None` stores root paths directly below the store root.
    pub namespace: Option<String>,
    /// Detach a keyed listener once it observes its record being removed.
    pub detach_listeners_on_remove: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            detach_listeners_on_remove: true,
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))?;
        config.namespace_path()?;
        Ok(config)
    }

    /// The namespace as a store path (the store root when unset).
    pub fn namespace_path(&self) -> ClientResult<StorePath> {
        match &self.namespace {
            Some(ns) => Ok(StorePath::parse(ns)?),
            None => Ok(StorePath::root()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ClientConfig::default();
        assert!(c.namespace.is_none());
        assert!(c.detach_listeners_on_remove);
        assert!(c.namespace_path().unwrap().is_root());
    }

    #[test]
    fn parse_toml() {
        let c = ClientConfig::from_toml_str(
            r#"
            namespace = "games/v1"
            detach_listeners_on_remove = false
            "#,
        )
        .unwrap();
        assert_eq!(c.namespace.as_deref(), Some("games/v1"));
        assert!(!c.detach_listeners_on_remove);
        assert_eq!(c.namespace_path().unwrap().to_string(), "games/v1");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        assert_eq!(ClientConfig::from_toml_str("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn invalid_namespace_rejected() {
        let err = ClientConfig::from_toml_str(r#"namespace = "bad.ns""#).unwrap_err();
        assert!(matches!(err, ClientError::Type(_)));
    }
}
