//! Extension-point binding.

use crate::core::descriptor::ExtensionPointMapping;
use crate::core::error::BuildError;
use crate::ops::context::BuildContext;

/// Bind `target` to `to_phase`, or only detach it when `to_phase` is `None`.
///
/// Returns `false` when the gating configurations are not active and
/// nothing was changed.
pub fn bind_target(
    ctx: &mut BuildContext,
    target: &str,
    to_phase: Option<&str>,
    conf: Option<&str>,
) -> Result<bool, BuildError> {
    if !ctx.is_active(conf)? {
        tracing::debug!(
            "not binding `{}`: build configurations `{}` are not active",
            target,
            conf.unwrap_or_default()
        );
        return Ok(false);
    }

    ctx.project.detach_then_attach(target, to_phase)?;
    Ok(true)
}

/// Apply a descriptor's extension-point mapping.
pub fn apply_mapping(ctx: &mut BuildContext, mapping: &ExtensionPointMapping) -> Result<bool, BuildError> {
    bind_target(
        ctx,
        &mapping.target,
        mapping.to_phase.as_deref(),
        mapping.conf.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::buildconf::{AVAILABLE_CONFS_PROPERTY, MAIN_CONFS_PROPERTY};
    use crate::core::project::Project;
    use crate::core::target::Target;
    use crate::test_support::RecordingResolver;

    fn context() -> BuildContext {
        let mut project = Project::new("/work");
        project
            .declare_target(Target::phase("compile").with_depends(["validate"]))
            .unwrap();
        project.declare_target(Target::phase("validate")).unwrap();
        project
            .declare_target(Target::phase("package").with_depends(["compile"]))
            .unwrap();
        project.declare_target(Target::new("javadoc")).unwrap();
        project.override_property(AVAILABLE_CONFS_PROPERTY, "prod,test");
        project.override_property(MAIN_CONFS_PROPERTY, "test");
        BuildContext::new(project, Arc::new(RecordingResolver::new()))
    }

    #[test]
    fn test_rebinding_moves_target() {
        let mut ctx = context();
        assert!(bind_target(&mut ctx, "javadoc", Some("compile"), None).unwrap());
        assert!(bind_target(&mut ctx, "javadoc", Some("package"), None).unwrap());

        assert_eq!(ctx.project.target("compile").unwrap().depends, vec!["validate"]);
        assert_eq!(
            ctx.project.target("package").unwrap().depends,
            vec!["compile", "javadoc"]
        );
    }

    #[test]
    fn test_gated_binding() {
        let mut ctx = context();
        assert!(!bind_target(&mut ctx, "javadoc", Some("package"), Some("prod")).unwrap());
        assert!(ctx.project.phases_binding("javadoc").is_empty());

        assert!(bind_target(&mut ctx, "javadoc", Some("package"), Some("test")).unwrap());
        assert_eq!(ctx.project.phases_binding("javadoc").len(), 1);
    }

    #[test]
    fn test_binding_errors() {
        let mut ctx = context();

        let err = bind_target(&mut ctx, "missing", Some("package"), None).unwrap_err();
        assert!(matches!(err, BuildError::Graph(_)));

        let err = bind_target(&mut ctx, "javadoc", Some("nowhere"), None).unwrap_err();
        assert!(err.to_string().contains("phase does not exist"));

        let err = bind_target(&mut ctx, "javadoc", None, Some("qa")).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }
}
