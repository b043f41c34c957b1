//! Module resolution.
//!
//! Resolution turns module coordinates into local artifact files. The loader
//! treats the resolver as a black box behind [`ModuleResolver`]; the crate
//! ships [`FileRepository`], a directory-layout repository with a download
//! cache.
//!
//! A resolution is always expressed as a [`ResolveRequest`]: a synthetic
//! caller module that depends on the modules to fetch, optionally carrying
//! extra dependencies, exclusions and forced revisions.

pub mod errors;
pub mod repository;
pub mod resolve;

pub use errors::ResolveError;
pub use repository::FileRepository;
pub use resolve::{find_script, ResolveReport, ResolvedArtifact, SCRIPT_TYPE};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::module_id::{ModuleId, ModuleRevisionId};

/// How chatty a resolution is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveLogLevel {
    /// Log every resolved module and copied artifact.
    #[default]
    Default,
    /// Log copied artifacts only.
    DownloadOnly,
    /// Log nothing above debug.
    Quiet,
}

/// Options passed to every resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Log level of the resolution
    pub log: ResolveLogLevel,
    /// Only use what is already in the cache
    pub use_cache_only: bool,
}

/// A dependency of the synthetic caller module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// Module to fetch
    pub module: ModuleRevisionId,
    /// Whether its own dependencies are fetched too
    pub transitive: bool,
}

impl DependencySpec {
    pub fn new(module: ModuleRevisionId) -> Self {
        DependencySpec {
            module,
            transitive: true,
        }
    }
}

/// Drop matching modules from transitive resolution.
///
/// A missing field matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ExcludeRule {
    #[serde(default, alias = "org")]
    pub organisation: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
}

impl ExcludeRule {
    /// Check if a module is excluded.
    pub fn matches(&self, id: &ModuleId) -> bool {
        self.organisation.as_deref().map_or(true, |o| o == id.organisation())
            && self.module.as_deref().map_or(true, |m| m == id.name())
    }
}

/// Force the revision of matching modules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConflictRule {
    #[serde(default, alias = "org")]
    pub organisation: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    pub revision: String,
}

impl ConflictRule {
    /// Check if the rule applies to a module.
    pub fn matches(&self, id: &ModuleId) -> bool {
        self.organisation.as_deref().map_or(true, |o| o == id.organisation())
            && self.module.as_deref().map_or(true, |m| m == id.name())
    }
}

/// Caller-supplied additions to a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolveOverrides {
    pub dependencies: Vec<DependencySpec>,
    pub excludes: Vec<ExcludeRule>,
    pub conflicts: Vec<ConflictRule>,
}

impl ResolveOverrides {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.excludes.is_empty() && self.conflicts.is_empty()
    }
}

/// A synthetic module whose dependencies are what needs resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Coordinate of the synthetic caller
    pub caller: ModuleRevisionId,
    /// Modules to resolve
    pub dependencies: Vec<DependencySpec>,
    /// Exclusions applied to transitive dependencies
    pub excludes: Vec<ExcludeRule>,
    /// Forced revisions
    pub conflicts: Vec<ConflictRule>,
}

impl ResolveRequest {
    /// Create an empty request for `caller`.
    pub fn new(caller: ModuleRevisionId) -> Self {
        ResolveRequest {
            caller,
            dependencies: Vec::new(),
            excludes: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Request for one module, named after it: `<org>#<name>-caller;working`.
    pub fn for_module(module: &ModuleRevisionId) -> Self {
        let caller =
            ModuleRevisionId::new(module.organisation(), format!("{}-caller", module.name()), "working");
        let mut request = ResolveRequest::new(caller);
        request.add_dependency(DependencySpec::new(module.clone()));
        request
    }

    /// Add a dependency unless the module is already requested.
    pub fn add_dependency(&mut self, dep: DependencySpec) {
        if !self
            .dependencies
            .iter()
            .any(|d| d.module.module_id() == dep.module.module_id())
        {
            self.dependencies.push(dep);
        }
    }

    /// Merge caller overrides into the request.
    pub fn merge(&mut self, overrides: &ResolveOverrides) {
        for dep in &overrides.dependencies {
            self.add_dependency(dep.clone());
        }
        self.excludes.extend(overrides.excludes.iter().cloned());
        self.conflicts.extend(overrides.conflicts.iter().cloned());
    }

    /// Check if a module is excluded.
    pub fn is_excluded(&self, id: &ModuleId) -> bool {
        self.excludes.iter().any(|e| e.matches(id))
    }

    /// Apply forced revisions to a coordinate.
    pub fn pin(&self, mrid: &ModuleRevisionId) -> ModuleRevisionId {
        match self.conflicts.iter().find(|c| c.matches(mrid.module_id())) {
            Some(rule) => mrid.with_revision(&rule.revision),
            None => mrid.clone(),
        }
    }
}

/// A module resolution service.
pub trait ModuleResolver {
    /// Resolve the dependencies of a request into local artifacts.
    fn resolve(
        &self,
        request: &ResolveRequest,
        options: &ResolveOptions,
    ) -> Result<ResolveReport, ResolveError>;

    /// Locate the descriptor of a module.
    fn find_descriptor(
        &self,
        mrid: &ModuleRevisionId,
        options: &ResolveOptions,
    ) -> Result<PathBuf, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_for_module() {
        let docs = ModuleRevisionId::new("org.acme", "docs", "1.0");
        let request = ResolveRequest::for_module(&docs);

        assert_eq!(request.caller.to_string(), "org.acme#docs-caller;working");
        assert_eq!(request.dependencies, vec![DependencySpec::new(docs)]);
    }

    #[test]
    fn test_merge_overrides() {
        let docs = ModuleRevisionId::new("org.acme", "docs", "1.0");
        let mut request = ResolveRequest::for_module(&docs);

        request.merge(&ResolveOverrides {
            dependencies: vec![
                DependencySpec::new(docs.with_revision("2.0")),
                DependencySpec::new(ModuleRevisionId::new("org.acme", "engine", "3.0")),
            ],
            excludes: vec![ExcludeRule {
                organisation: Some("org.legacy".into()),
                module: None,
            }],
            conflicts: vec![ConflictRule {
                organisation: None,
                module: Some("engine".into()),
                revision: "3.1".into(),
            }],
        });

        assert_eq!(request.dependencies.len(), 2);
        assert!(request.is_excluded(&ModuleId::new("org.legacy", "anything")));
        assert!(!request.is_excluded(&ModuleId::new("org.acme", "engine")));

        let pinned = request.pin(&ModuleRevisionId::new("org.acme", "engine", "3.0"));
        assert_eq!(pinned.revision(), Some("3.1"));
    }
}
