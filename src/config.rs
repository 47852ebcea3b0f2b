//! Configuration for the assembler.
//!
//! Settings are read from a [`ConfigSource`]: environment variables by
//! default, or a JSON document with the `config` feature.

use std::collections::HashMap;
use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Default bound on nested assembly depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "FERROUS_ASSEMBLER";

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    /// Parses a raw string, trying integer, float and boolean before text.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }

    pub fn as_string(&self, key: &str) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            _ => Err(DiError::Config(format!("{key} is not a string"))),
        }
    }

    pub fn as_bool(&self, key: &str) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            _ => Err(DiError::Config(format!("{key} is not a boolean"))),
        }
    }

    pub fn as_usize(&self, key: &str) -> DiResult<usize> {
        match self {
            ConfigValue::Integer(i) if *i >= 0 => Ok(*i as usize),
            ConfigValue::Integer(_) => Err(DiError::Config(format!("{key} cannot be negative"))),
            _ => Err(DiError::Config(format!("{key} is not an integer"))),
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
///
/// Key `max_depth` with prefix `FERROUS_ASSEMBLER` reads
/// `FERROUS_ASSEMBLER_MAX_DEPTH`.
#[derive(Debug)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    /// Reads variables under [`DEFAULT_ENV_PREFIX`].
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Reads unprefixed variables.
    pub fn unprefixed() -> Self {
        Self { prefix: None }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvironmentConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key))
            .ok()
            .map(|value| ConfigValue::parse(&value))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(transparent))]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Parses a flat JSON object of settings.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Config(format!("invalid JSON configuration: {e}")))
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Assembler settings.
///
/// # Examples
///
/// ```rust
/// use ferrous_assembler::config::{AssemblerConfig, ConfigValue, MapConfigSource};
///
/// let source = MapConfigSource::new()
///     .set("max_depth", ConfigValue::Integer(64))
///     .set("default_after_inject", ConfigValue::String("init".into()));
/// let config = AssemblerConfig::from_source(&source).unwrap();
///
/// assert_eq!(config.max_depth, 64);
/// assert_eq!(config.default_after_inject.as_deref(), Some("init"));
/// assert!(config.memoize_definitions);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct AssemblerConfig {
    /// Deepest nesting of assemblies allowed on one thread
    pub max_depth: usize,
    /// Registry-wide after-inject hook name, used if the registry sets none
    pub default_after_inject: Option<String>,
    /// Registry-wide before-clear hook name, used if the registry sets none
    pub default_before_clear: Option<String>,
    /// Cache merged definitions; turn off when the registry is replaced often
    pub memoize_definitions: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_after_inject: None,
            default_before_clear: None,
            memoize_definitions: true,
        }
    }
}

impl AssemblerConfig {
    /// Loads settings from `source`, keeping defaults for missing keys.
    pub fn from_source(source: &dyn ConfigSource) -> DiResult<Self> {
        let mut config = Self::default();
        if let Some(value) = source.get("max_depth") {
            config.max_depth = value.as_usize("max_depth")?;
            if config.max_depth == 0 {
                return Err(DiError::Config("max_depth must be at least 1".to_string()));
            }
        }
        if let Some(value) = source.get("default_after_inject") {
            config.default_after_inject = Some(value.as_string("default_after_inject")?.to_string());
        }
        if let Some(value) = source.get("default_before_clear") {
            config.default_before_clear = Some(value.as_string("default_before_clear")?.to_string());
        }
        if let Some(value) = source.get("memoize_definitions") {
            config.memoize_definitions = value.as_bool("memoize_definitions")?;
        }
        tracing::debug!(?config, "loaded assembler configuration");
        Ok(config)
    }

    /// Loads settings from `FERROUS_ASSEMBLER_*` environment variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_source(&EnvironmentConfigSource::new())
    }

    /// Parses a JSON document such as `{"max_depth": 64}`.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Config(format!("invalid JSON configuration: {e}")))
    }
}
