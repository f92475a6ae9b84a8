//! Bridge configuration

use serde::Deserialize;

/// Input bounds enforced by the dispatcher and the bulk loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Longest accepted language tag, in bytes.
    pub max_tag_len: usize,
    /// Most paths accepted by one `bulk_load` call.
    pub max_load_paths: usize,
    /// Longest accepted path, in bytes.
    pub max_path_len: usize,
    /// Most values one marshaled argument or result may expand to.
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tag_len: 17,
            max_load_paths: 256,
            max_path_len: 4096,
            max_nodes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub limits: Limits,
}

impl BridgeConfig {
    pub fn from_json_str(src: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json_str(r#"{ "limits": { "max_load_paths": 4 } }"#)
            .expect("parse");
        assert_eq!(config.limits.max_load_paths, 4);
        assert_eq!(config.limits.max_tag_len, 17);
        assert_eq!(config.limits.max_path_len, 4096);
        assert_eq!(config.limits.max_nodes, 1_000_000);
    }

    #[test]
    fn empty_json_is_default() {
        let config = BridgeConfig::from_json_str("{}").expect("parse");
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(BridgeConfig::from_json_str(r#"{ "limits": { "max_tag_len": "x" } }"#).is_err());
    }
}
