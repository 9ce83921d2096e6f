//! Runtime configuration
//!
//! One TOML document selects the backend environment and its
//! parameters, read once at startup:
//!
//! ```toml
//! env = "embedded"
//!
//! [embedded]
//! path = "blog.redb"
//!
//! [cache]
//! capacity = 4096
//! ```
//!
//! Backend selection is a closed enum; an unknown `env` value fails
//! deserialization instead of falling back to anything.

use polystore_cache::DEFAULT_CAPACITY;
use polystore_core::{RepositoryError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which backend the process runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnv {
    /// Hierarchical datastore backend
    Datastore,
    /// Embedded key-value backend
    Embedded,
    /// Relational backend (placeholder)
    Relational,
}

/// Embedded-backend parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddedConfig {
    /// Database file path
    #[serde(default = "default_embedded_path")]
    pub path: PathBuf,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        EmbeddedConfig {
            path: default_embedded_path(),
        }
    }
}

fn default_embedded_path() -> PathBuf {
    PathBuf::from("polystore.redb")
}

/// Relational-backend parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationalConfig {
    /// Connection URL; required when `env = "relational"`
    pub url: Option<String>,
}

/// Shared repository cache parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum cached entries across all repositories; 0 disables
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Top-level runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend environment to run against
    pub env: RuntimeEnv,
    /// Embedded-backend parameters
    #[serde(default)]
    pub embedded: EmbeddedConfig,
    /// Relational-backend parameters
    #[serde(default)]
    pub relational: RelationalConfig,
    /// Shared cache parameters
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RepositoryError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
