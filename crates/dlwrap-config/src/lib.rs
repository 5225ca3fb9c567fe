//! # dlwrap-config
//!
//! Configuration management for the dlwrap shim generator.
//!
//! Loads configuration from:
//! 1. `~/.dlwrap/config.toml` (global)
//! 2. `.dlwrap/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)
//!
//! An explicit config file (`dlwrap --config <FILE>`) replaces steps 1 and 2.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub mod logging;
pub mod testing;

pub use logging::LogLevel;

/// Env var replacing the allocation primitive set (comma separated)
pub const ENV_ALLOC_PRIMITIVES: &str = "DLWRAP_ALLOC_PRIMITIVES";
/// Env var selecting the init guard (`flag` or `once`)
pub const ENV_INIT_GUARD: &str = "DLWRAP_INIT_GUARD";

/// Symbols that must never go through `dlsym` lazy resolution.
pub const DEFAULT_ALLOCATION_PRIMITIVES: [&str; 4] = ["malloc", "free", "calloc", "realloc"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid init guard {0:?} (expected \"flag\" or \"once\")")]
    InvalidGuard(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let mut config = Self::load_layered(global.as_deref(), &Self::project_config_path())?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load a single explicit config file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Global file first, project file merged over it. Missing files are skipped.
    ///
    /// Layers merge key by key, so any value a project file sets explicitly
    /// wins, including one equal to the default.
    pub fn load_layered(global: Option<&Path>, project: &Path) -> Result<Self, ConfigError> {
        let mut table = toml::Table::new();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                merge_tables(&mut table, read_table(global_path)?);
            }
        }

        if project.exists() {
            debug!("Loading project config from {:?}", project);
            merge_tables(&mut table, read_table(project)?);
        }

        Ok(toml::Value::Table(table).try_into::<Config>()?)
    }

    /// Global config path: ~/.dlwrap/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".dlwrap/config.toml"))
    }

    /// Project config path: .dlwrap/config.toml
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".dlwrap/config.toml")
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup(ENV_ALLOC_PRIMITIVES) {
            self.generator.allocation_primitives = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(guard) = lookup(ENV_INIT_GUARD) {
            self.generator.init_guard = guard.parse()?;
        }
        Ok(())
    }

    /// Generate TOML for this config
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate default config TOML string
    pub fn default_toml() -> Result<String, ConfigError> {
        Config::default().to_toml()
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.parse::<toml::Table>()?)
}

/// Recursively overlay `overlay` onto `base`; nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let merged = match (base.remove(&key), value) {
            (Some(toml::Value::Table(mut inner)), toml::Value::Table(over)) => {
                merge_tables(&mut inner, over);
                toml::Value::Table(inner)
            }
            (_, value) => value,
        };
        base.insert(key, merged);
    }
}

/// Code generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Names routed to `__libc_<name>` instead of `dlsym`
    pub allocation_primitives: Vec<String>,
    /// How the generated Linux wrappers guard one-time initialization
    pub init_guard: InitGuard,
    /// User function called from the generated constructors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_init: Option<String>,
    /// User function called from the generated destructors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_fini: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            allocation_primitives: DEFAULT_ALLOCATION_PRIMITIVES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            init_guard: InitGuard::Flag,
            on_init: None,
            on_fini: None,
        }
    }
}

/// Initialization guard emitted into the lazy-resolution section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitGuard {
    /// Plain `static int` flag. Not thread-safe.
    #[default]
    Flag,
    /// `pthread_once` latch plus atomic flag accesses
    Once,
}

impl FromStr for InitGuard {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flag" => Ok(InitGuard::Flag),
            "once" => Ok(InitGuard::Once),
            _ => Err(ConfigError::InvalidGuard(s.to_string())),
        }
    }
}

impl fmt::Display for InitGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitGuard::Flag => f.write_str("flag"),
            InitGuard::Once => f.write_str("once"),
        }
    }
}

/// Diagnostics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Fail the run if any declaration-like line was skipped
    pub deny_skipped: bool,
    /// Fallback log level when neither DLWRAP_LOG nor RUST_LOG is set
    pub log_level: LogLevel,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            deny_skipped: false,
            log_level: LogLevel::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(
            config.generator.allocation_primitives,
            vec!["malloc", "free", "calloc", "realloc"]
        );
        assert_eq!(config.generator.init_guard, InitGuard::Flag);
        assert!(!config.diagnostics.deny_skipped);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml().unwrap();
        assert!(toml_str.contains("[generator]"));
        assert!(toml_str.contains("[diagnostics]"));
        assert!(toml_str.contains("init_guard = \"flag\""));
        assert!(toml_str.contains("\"realloc\""));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.generator.on_init = Some("trace_setup".to_string());
        config.generator.init_guard = InitGuard::Once;
        let parsed: Config = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_init_guard_from_str() {
        assert_eq!("flag".parse::<InitGuard>().unwrap(), InitGuard::Flag);
        assert_eq!(" ONCE ".parse::<InitGuard>().unwrap(), InitGuard::Once);
        assert!(matches!(
            "mutex".parse::<InitGuard>(),
            Err(ConfigError::InvalidGuard(_))
        ));
    }

    #[test]
    fn test_overrides_replace_primitives_and_guard() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_ALLOC_PRIMITIVES, "malloc, free,,posix_memalign"),
            (ENV_INIT_GUARD, "once"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(
            config.generator.allocation_primitives,
            vec!["malloc", "free", "posix_memalign"]
        );
        assert_eq!(config.generator.init_guard, InitGuard::Once);
    }

    #[test]
    fn test_overrides_reject_bad_guard() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == ENV_INIT_GUARD).then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn test_merge_tables_overlays_nested_keys() {
        let mut base: toml::Table =
            "[generator]\non_init = \"setup\"\ninit_guard = \"once\"\n".parse().unwrap();
        let overlay: toml::Table = "[generator]\ninit_guard = \"flag\"\n".parse().unwrap();
        merge_tables(&mut base, overlay);
        let config: Config = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(config.generator.init_guard, InitGuard::Flag);
        assert_eq!(config.generator.on_init.as_deref(), Some("setup"));
    }
}
