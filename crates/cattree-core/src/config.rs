use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatTreeError, Result};
use crate::store::DEFAULT_STORE_FILE;
use crate::validation::{NameRules, MAX_NAME_LENGTH};

const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_EXPORT_FILE: &str = "categories_tree.csv";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# cattree configuration file
# Location: ~/.cattree/config.toml

[names]
# Maximum category name length in characters
# Default: 128
max_length = 128

[removal]
# What to do when removing a category that still has children
#   "reject"  - refuse and report the number of children (default)
#   "cascade" - remove the whole subtree
policy = "reject"

[tabular]
# Write a header row on export and skip the first row on import
# Default: true
header = true

# File written by `cattree export` (when no path is given) and by /download,
# relative to the base directory
export_file = "categories_tree.csv"

[store]
# Category store file, relative to the base directory
file = "categories.toml"
"#;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub names: NamesConfig,

    #[serde(default)]
    pub removal: RemovalConfig,

    #[serde(default)]
    pub tabular: TabularConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamesConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    MAX_NAME_LENGTH
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemovalConfig {
    #[serde(default)]
    pub policy: RemovalPolicy,
}

/// Behaviour when the category being removed has children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    #[default]
    Reject,
    Cascade,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Cascade => write!(f, "cascade"),
        }
    }
}

impl FromStr for RemovalPolicy {
    type Err = CatTreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "cascade" => Ok(Self::Cascade),
            other => Err(CatTreeError::InvalidConfigValue {
                key: "removal.policy".to_string(),
                message: format!("expected 'reject' or 'cascade', got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularConfig {
    #[serde(default = "default_true")]
    pub header: bool,

    #[serde(default = "default_export_file")]
    pub export_file: String,
}

fn default_true() -> bool {
    true
}

fn default_export_file() -> String {
    DEFAULT_EXPORT_FILE.to_string()
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            header: true,
            export_file: default_export_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_file")]
    pub file: String,
}

fn default_store_file() -> String {
    DEFAULT_STORE_FILE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: default_store_file(),
        }
    }
}

impl Config {
    /// Load config from base directory
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content).map_err(|e| CatTreeError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Hand-edited files get the same checks as `set`
    fn validate(&self) -> Result<()> {
        let mut scratch = Self::default();
        for (key, value) in self.list() {
            scratch.set(&key, &value)?;
        }
        Ok(())
    }

    /// Save config to base directory
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        let content = toml::to_string_pretty(self).map_err(|e| CatTreeError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::write(&path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(base_dir: &Path) -> Result<PathBuf> {
        let path = base_dir.join(CONFIG_FILE);
        fs::create_dir_all(base_dir)?;

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        }

        Ok(path)
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        self.list()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "names.max_length" => {
                let max_length = value.trim().parse::<usize>().map_err(|e| {
                    CatTreeError::InvalidConfigValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                })?;
                if max_length == 0 {
                    return Err(CatTreeError::InvalidConfigValue {
                        key: key.to_string(),
                        message: "must be at least 1".to_string(),
                    });
                }
                self.names.max_length = max_length;
            }
            "removal.policy" => {
                self.removal.policy = value.parse()?;
            }
            "tabular.header" => {
                self.tabular.header = parse_bool(key, value)?;
            }
            "tabular.export_file" => {
                self.tabular.export_file = non_empty(key, value)?;
            }
            "store.file" => {
                self.store.file = non_empty(key, value)?;
            }
            _ => {
                return Err(CatTreeError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "names.max_length".to_string(),
                self.names.max_length.to_string(),
            ),
            (
                "removal.policy".to_string(),
                self.removal.policy.to_string(),
            ),
            ("tabular.header".to_string(), self.tabular.header.to_string()),
            (
                "tabular.export_file".to_string(),
                self.tabular.export_file.clone(),
            ),
            ("store.file".to_string(), self.store.file.clone()),
        ]
    }

    pub fn name_rules(&self) -> NameRules {
        NameRules::new(self.names.max_length)
    }

    pub fn store_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.store.file)
    }

    /// Default export target; an absolute `export_file` is used as is
    pub fn export_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.tabular.export_file)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(CatTreeError::InvalidConfigValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let trimmed = value.trim().trim_matches('"').trim_matches('\'');
    if trimmed.is_empty() {
        return Err(CatTreeError::InvalidConfigValue {
            key: key.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.names.max_length, 128);
        assert_eq!(config.removal.policy, RemovalPolicy::Reject);
        assert!(config.tabular.header);
        assert_eq!(config.store.file, "categories.toml");
    }

    #[test]
    fn test_config_get_set() {
        let mut config = Config::default();

        config.set("removal.policy", "Cascade").unwrap();
        assert_eq!(config.removal.policy, RemovalPolicy::Cascade);
        assert_eq!(config.get("removal.policy").unwrap(), "cascade");

        config.set("tabular.header", "no").unwrap();
        assert!(!config.tabular.header);

        config.set("names.max_length", "64").unwrap();
        assert_eq!(config.name_rules().max_length, 64);
    }

    #[test]
    fn test_config_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("removal.policy", "orphan").is_err());
        assert!(config.set("names.max_length", "0").is_err());
        assert!(config.set("names.max_length", "lots").is_err());
        assert!(config.set("tabular.export_file", "  ").is_err());
        assert!(matches!(
            config.set("unknown.key", "x"),
            Err(CatTreeError::ConfigKeyNotFound { .. })
        ));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = Config::init(dir.path()).unwrap();
        assert!(path.exists());

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.list(), Config::default().list());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.set("store.file", "tree.toml").unwrap();
        config.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.store_path(dir.path()), dir.path().join("tree.toml"));
    }

    #[test]
    fn test_load_rejects_zero_max_length() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[names]\nmax_length = 0\n").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            CatTreeError::InvalidConfigValue { ref key, .. } if key == "names.max_length"
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[removal]\npolicy = \"cascade\"\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.removal.policy, RemovalPolicy::Cascade);
        assert_eq!(config.names.max_length, MAX_NAME_LENGTH);
    }
}
