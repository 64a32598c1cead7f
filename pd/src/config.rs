//! PromptDeck configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::template::{DEFAULT_MAX_DICE, ResolverOptions};

/// Main PromptDeck configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Where the variable table is kept between runs
    #[serde(rename = "vars-file")]
    pub vars_file: PathBuf,

    /// Keep variables between runs; when false every run starts empty
    #[serde(rename = "persist-vars")]
    pub persist_vars: bool,

    /// Largest dice count a single roll may use
    #[serde(rename = "max-dice")]
    pub max_dice: u32,
}

fn default_vars_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptdeck")
        .join("vars.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            vars_file: default_vars_file(),
            persist_vars: true,
            max_dice: DEFAULT_MAX_DICE,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// 1. explicit `--config` path
    /// 2. `./.promptdeck.yml`
    /// 3. `~/.config/promptdeck/promptdeck.yml`
    /// 4. defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::default_paths(),
        };
        paths
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|config| config.log_level)
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".promptdeck.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("promptdeck").join("promptdeck.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolver settings derived from this config
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            max_dice: self.max_dice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.persist_vars);
        assert_eq!(config.max_dice, DEFAULT_MAX_DICE);
        assert!(config.vars_file.ends_with("promptdeck/vars.json"));
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pd.yml");
        fs::write(
            &path,
            "log-level: DEBUG\nvars-file: /tmp/pd-vars.json\npersist-vars: false\nmax-dice: 20\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(config.vars_file, PathBuf::from("/tmp/pd-vars.json"));
        assert!(!config.persist_vars);
        assert_eq!(config.resolver_options().max_dice, 20);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pd.yml");
        fs::write(&path, "max-dice: 5\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_dice, 5);
        assert!(config.persist_vars);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pd.yml");
        fs::write(&path, "log-level: WARN\n").unwrap();
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }
}
