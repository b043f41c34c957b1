//! Build context - the state of one load pass.
//!
//! Everything the loader, the importers and the binder mutate lives here and
//! is passed down by `&mut`: the project, the resolution service and its
//! options, and the batch resolve result shared by deferred imports.

use std::fmt;
use std::sync::Arc;

use crate::core::buildconf::{self, AVAILABLE_CONFS_PROPERTY, MAIN_CONFS_PROPERTY};
use crate::core::error::BuildError;
use crate::core::project::Project;
use crate::resolver::{ModuleResolver, ResolveOptions, ResolveReport};
use crate::util::config::DEFAULT_CLASSPATH_TYPES;

/// State shared by every step of a load pass.
pub struct BuildContext {
    /// The project being composed
    pub project: Project,

    /// Resolution service
    resolver: Arc<dyn ModuleResolver>,

    /// Options passed to every resolution
    options: ResolveOptions,

    /// Artifact types that go on plugin classpaths
    classpath_types: Vec<String>,

    /// Batch resolve result of the current pass
    shared_resolve: Option<Arc<ResolveReport>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project", &self.project)
            .field("options", &self.options)
            .field("classpath_types", &self.classpath_types)
            .field(
                "shared_resolve",
                &self.shared_resolve.as_ref().map(|r| r.len()),
            )
            .finish()
    }
}

impl BuildContext {
    /// Create a context over `project` resolving through `resolver`.
    pub fn new(project: Project, resolver: Arc<dyn ModuleResolver>) -> Self {
        BuildContext {
            project,
            resolver,
            options: ResolveOptions::default(),
            classpath_types: DEFAULT_CLASSPATH_TYPES.iter().map(|t| t.to_string()).collect(),
            shared_resolve: None,
        }
    }

    /// Set the resolve options.
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the artifact types that go on plugin classpaths.
    pub fn with_classpath_types(mut self, types: Vec<String>) -> Self {
        self.classpath_types = types;
        self
    }

    pub fn resolver(&self) -> &dyn ModuleResolver {
        self.resolver.as_ref()
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Check if an artifact type goes on the classpath.
    pub fn is_classpath_type(&self, kind: &str) -> bool {
        self.classpath_types.iter().any(|t| t == kind)
    }

    /// Store the batch resolve result of this pass.
    pub fn set_shared_resolve(&mut self, report: ResolveReport) {
        if self.shared_resolve.is_some() {
            tracing::debug!("replacing the batch resolve result of a previous pass");
        }
        self.shared_resolve = Some(Arc::new(report));
    }

    /// The batch resolve result of this pass, if any.
    pub fn shared_resolve(&self) -> Option<Arc<ResolveReport>> {
        self.shared_resolve.clone()
    }

    /// Check an item gated on `conf` against the project's configurations.
    pub fn is_active(&self, conf: Option<&str>) -> Result<bool, BuildError> {
        buildconf::is_active(
            conf,
            self.project.property(AVAILABLE_CONFS_PROPERTY),
            self.project.property(MAIN_CONFS_PROPERTY),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingResolver;

    #[test]
    fn test_gate_uses_main_confs() {
        let mut ctx = BuildContext::new(Project::new("/work"), Arc::new(RecordingResolver::new()));
        assert!(ctx.is_active(None).unwrap());
        assert!(ctx.is_active(Some("prod")).is_err());

        ctx.project.override_property(AVAILABLE_CONFS_PROPERTY, "prod,test");
        assert!(!ctx.is_active(Some("prod")).unwrap());

        ctx.project.override_property(MAIN_CONFS_PROPERTY, "test");
        assert!(ctx.is_active(Some("prod,test")).unwrap());
        assert!(!ctx.is_active(Some("prod")).unwrap());
    }

    #[test]
    fn test_classpath_types() {
        let ctx = BuildContext::new(Project::new("/work"), Arc::new(RecordingResolver::new()))
            .with_classpath_types(vec!["bundle".to_string()]);
        assert!(ctx.is_classpath_type("bundle"));
        assert!(!ctx.is_classpath_type("jar"));
    }
}
