//! Configuration for the prediction API and CLI.

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Feature Store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    "data/store".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

/// Which classifier to serve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Onnx,
    Heuristic,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Optional training metadata with the feature list
    #[serde(default)]
    pub meta_path: Option<String>,
}

fn default_model_path() -> String {
    "data/models/f1_win_model.onnx".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            path: default_model_path(),
            meta_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (F1_PREDICT__SERVER__PORT, etc.)
            .add_source(
                config::Environment::with_prefix("F1_PREDICT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.dir, "data/store");
        assert_eq!(config.model.kind, ModelKind::Onnx);
        assert!(config.model.meta_path.is_none());
    }

    #[test]
    fn test_partial_json_uses_field_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"model": {"kind": "heuristic"}, "server": {"port": 9000}}"#)
                .unwrap();
        assert_eq!(config.model.kind, ModelKind::Heuristic);
        assert_eq!(config.model.path, default_model_path());
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_applies_env_overrides() {
        std::env::set_var("F1_PREDICT__MODEL__META_PATH", "data/models/meta.json");
        std::env::set_var("F1_PREDICT__SERVER__PORT", "9100");

        let config = AppConfig::load();

        std::env::remove_var("F1_PREDICT__MODEL__META_PATH");
        std::env::remove_var("F1_PREDICT__SERVER__PORT");

        let config = config.unwrap();
        assert_eq!(config.model.meta_path.as_deref(), Some("data/models/meta.json"));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.dir, "data/store");
    }
}
