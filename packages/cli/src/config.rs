use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vellum_editor::EditorConfig;
use vellum_io::Format;

pub const DEFAULT_CONFIG_NAME: &str = "vellum.config.json";

/// Vellum configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// History and geometry settings handed to the editor
    #[serde(flatten)]
    pub editor: EditorConfig,

    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Format assumed when neither `--format` nor the file extension decides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<Format>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = Self::path(cwd);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn path(cwd: &Path) -> PathBuf {
        cwd.join(DEFAULT_CONFIG_NAME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            log_level: "info".to_string(),
            default_format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyLimit": 20,
            "vectorEpsilon": 0.01,
            "logLevel": "debug",
            "defaultFormat": "pdf"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.history_limit, 20);
        assert_eq!(config.editor.vector_epsilon, 0.01);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_format, Some(Format::Pdf));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_format, None);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());

        std::fs::write(Config::path(dir.path()), r#"{ "historyLimit": 3 }"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.editor.history_limit, 3);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(Config::path(dir.path()), "{ historyLimit: ").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
