//! Global context for easyant operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! configuration and cache locations, and the merged configuration.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;

use crate::core::descriptor::DESCRIPTOR_NAME;
use crate::util::config::{load_config, project_config_path, Config};

/// Project directories for easyant
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "easyant", "easyant"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// User-wide configuration directory
    config_dir: PathBuf,

    /// User-wide cache and data directory
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let (config_dir, home) = match PROJECT_DIRS.as_ref() {
            Some(dirs) => (dirs.config_dir().to_path_buf(), dirs.data_dir().to_path_buf()),
            None => {
                let fallback = cwd.join(".easyant");
                (fallback.clone(), fallback)
            }
        };

        Ok(GlobalContext {
            cwd,
            config_dir,
            home,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the user-wide data directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the default module repository.
    pub fn repository_dir(&self) -> PathBuf {
        self.home.join("repository")
    }

    /// Get the default download cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Find the module descriptor, starting from cwd and searching upward.
    pub fn find_descriptor(&self) -> Result<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(DESCRIPTOR_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find `{}` in `{}` or any parent directory",
                    DESCRIPTOR_NAME,
                    self.cwd.display()
                );
            }
        }
    }

    /// Load the configuration for the project rooted at `project_root`.
    pub fn load_config(&self, project_root: &Path) -> Config {
        load_config(&self.config_path(), &project_config_path(project_root))
    }
}
