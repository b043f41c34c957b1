//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `<config dir>/easyant/config.toml` - user-wide defaults
//! - Project: `.easyant/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resolver::{ResolveLogLevel, ResolveOptions};

/// Artifact types put on a plugin classpath when none are configured.
pub const DEFAULT_CLASSPATH_TYPES: &[&str] = &["jar"];

/// easyant configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Resolution settings
    pub resolve: ResolveConfig,

    /// Repository settings
    pub repository: RepositoryConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Active build configurations (comma-separated)
    pub configurations: Option<String>,
}

/// Resolution configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Resolve log level
    pub log: Option<ResolveLogLevel>,

    /// Offline mode (only use the cache)
    pub offline: bool,
}

/// Module repository configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RepositoryConfig {
    /// Repository root
    pub path: Option<PathBuf>,

    /// Download cache
    pub cache: Option<PathBuf>,

    /// Artifact types that go on plugin classpaths
    pub classpath_types: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        // relative repository paths are relative to the file that names them
        let base = path.parent().unwrap_or(Path::new("."));
        config.repository.path = config.repository.path.map(|p| base.join(p));
        config.repository.cache = config.repository.cache.map(|p| base.join(p));

        Ok(config)
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.configurations.is_some() {
            self.build.configurations = other.build.configurations;
        }

        if other.resolve.log.is_some() {
            self.resolve.log = other.resolve.log;
        }
        if other.resolve.offline {
            self.resolve.offline = true;
        }

        if other.repository.path.is_some() {
            self.repository.path = other.repository.path;
        }
        if other.repository.cache.is_some() {
            self.repository.cache = other.repository.cache;
        }
        if other.repository.classpath_types.is_some() {
            self.repository.classpath_types = other.repository.classpath_types;
        }
    }

    /// Options passed to every resolution.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            log: self.resolve.log.unwrap_or_default(),
            use_cache_only: self.resolve.offline,
        }
    }

    /// Artifact types that go on plugin classpaths.
    pub fn classpath_types(&self) -> Vec<String> {
        match &self.repository.classpath_types {
            Some(types) => types.clone(),
            None => DEFAULT_CLASSPATH_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.easyant/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the project config path (.easyant/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".easyant").join("config.toml")
}
