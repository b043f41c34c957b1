//! Command implementations

pub mod describe;
pub mod load;
pub mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use easyant::core::buildconf::ACTIVE_CONFS_PROPERTY;
use easyant::core::{ModuleDescriptor, Project};
use easyant::ops::{BuildContext, ModuleLoader};
use easyant::resolver::FileRepository;
use easyant::util::{Config, GlobalContext};

/// Everything a command needs, built from the global flags.
pub struct Session {
    pub global: GlobalContext,
    pub config: Config,
    /// Descriptor of the module in the working directory
    pub descriptor: PathBuf,
    defines: Vec<(String, String)>,
}

impl Session {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let global = GlobalContext::new()?;

        let descriptor = global.find_descriptor()?;
        let mut config = global.load_config(project_root(&descriptor));

        // flags override both config files
        if let Some(conf) = &cli.conf {
            config.build.configurations = Some(conf.clone());
        }
        if cli.offline {
            config.resolve.offline = true;
        }
        if let Some(path) = &cli.repository {
            config.repository.path = Some(path.clone());
        }
        if let Some(path) = &cli.cache {
            config.repository.cache = Some(path.clone());
        }

        Ok(Session {
            global,
            config,
            descriptor,
            defines: cli.define.clone(),
        })
    }

    /// A fresh build context over the module's directory.
    pub fn context(&self) -> BuildContext {
        let repository = self
            .config
            .repository
            .path
            .clone()
            .unwrap_or_else(|| self.global.repository_dir());
        let cache = self
            .config
            .repository
            .cache
            .clone()
            .unwrap_or_else(|| self.global.cache_dir());
        tracing::debug!(
            "repository {}, cache {}",
            repository.display(),
            cache.display()
        );

        let mut project = Project::new(project_root(&self.descriptor));
        for (name, value) in &self.defines {
            project.declare_property(name, value);
        }
        if let Some(confs) = &self.config.build.configurations {
            project.declare_property(ACTIVE_CONFS_PROPERTY, confs);
        }

        BuildContext::new(project, Arc::new(FileRepository::new(repository, cache)))
            .with_options(self.config.resolve_options())
            .with_classpath_types(self.config.classpath_types())
    }

    /// Load the module into a fresh context.
    pub fn load(&self) -> Result<(BuildContext, ModuleDescriptor)> {
        let mut ctx = self.context();
        let descriptor = ModuleLoader::new().load(&mut ctx, &self.descriptor)?;
        Ok((ctx, descriptor))
    }
}

fn project_root(descriptor: &Path) -> &Path {
    descriptor.parent().unwrap_or(Path::new("."))
}
