//! Node configuration, matching the teacher's `ioi-types::config` pattern of
//! a small `serde`-derived struct with explicit defaults, loadable from TOML.

use rollbound_types::ProtocolConstants;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeConfig {
    /// How many blocks the simulation harness bakes before exiting.
    pub blocks_to_bake: u32,
    /// The protocol constants this simulated chain runs under.
    pub constants: ProtocolConstants,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            blocks_to_bake: 16,
            constants: ProtocolConstants::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<NodeConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
