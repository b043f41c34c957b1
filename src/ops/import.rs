//! Importing plugin modules into the project.
//!
//! Two variants share one contract. [`import_module`] resolves the module on
//! its own; [`import_deferred`] picks the module out of the batch resolve
//! result stored in the [`BuildContext`]. Both apply the same gate and
//! `skip.*` rules, then register the module's artifacts:
//!
//! - its one `script` artifact is declared into the project,
//! - classpath artifacts go on the `<org#module>.classpath` reference,
//! - anything else becomes a `<org#module>[.<name>].<ext>.file` property.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use anyhow::{Context, Result};

use crate::core::descriptor::{ImportMode, PluginDescriptor};
use crate::core::error::BuildError;
use crate::core::module_id::ModuleRevisionId;
use crate::core::project::{ImportedScript, Project};
use crate::core::script::BuildScript;
use crate::ops::context::BuildContext;
use crate::resolver::{find_script, ResolveOverrides, ResolveRequest, ResolvedArtifact};

/// What to import and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Module to import
    pub module: ModuleRevisionId,
    /// Import mode
    pub mode: ImportMode,
    /// Alias (`as`)
    pub alias: Option<String>,
    /// Whether `skip.*` properties are ignored
    pub mandatory: bool,
    /// Gating build configurations
    pub conf: Option<String>,
    /// Extra attributes, declared as properties before the import
    pub attributes: BTreeMap<String, String>,
    /// Extra dependencies, exclusions and forced revisions (eager only)
    pub overrides: ResolveOverrides,
}

impl ImportSpec {
    pub fn new(module: ModuleRevisionId) -> Self {
        ImportSpec {
            module,
            mode: ImportMode::Import,
            alias: None,
            mandatory: false,
            conf: None,
            attributes: BTreeMap::new(),
            overrides: ResolveOverrides::default(),
        }
    }

    /// Build a spec from either an `org#name;rev` string or its parts.
    pub fn from_parts(
        mrid: Option<&str>,
        organisation: Option<&str>,
        module: Option<&str>,
        revision: Option<&str>,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(ModuleRevisionId::from_parts(
            mrid,
            organisation,
            module,
            revision,
        )?))
    }

    /// Spec for a plugin or build-type reference.
    pub fn from_plugin(plugin: &PluginDescriptor) -> Self {
        ImportSpec {
            module: plugin.module.clone(),
            mode: plugin.mode,
            alias: plugin.alias.clone(),
            mandatory: plugin.mandatory,
            conf: plugin.conf.clone(),
            attributes: plugin.attributes.clone(),
            overrides: ResolveOverrides::default(),
        }
    }

    pub fn with_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_conf(mut self, conf: impl Into<String>) -> Self {
        self.conf = Some(conf.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ResolveOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// The alias, defaulting to the module name in include mode.
    pub fn effective_alias(&self) -> Option<&str> {
        match (&self.alias, self.mode) {
            (Some(alias), _) => Some(alias),
            (None, ImportMode::Include) => Some(self.module.name()),
            (None, ImportMode::Import) => None,
        }
    }
}

/// What an import call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The module's artifacts were registered.
    Imported,
    /// The gating configurations are not active.
    Inactive,
    /// A `skip.*` property asked to skip the module.
    Skipped,
    /// The module's script was imported before.
    AlreadyImported,
    /// The batch resolve result does not contain the module.
    NotResolved,
}

/// Resolve a module on its own and import it.
pub fn import_module(ctx: &mut BuildContext, spec: &ImportSpec) -> Result<ImportOutcome> {
    let spec = match prepare(ctx, spec)? {
        ControlFlow::Continue(spec) => spec,
        ControlFlow::Break(outcome) => return Ok(outcome),
    };

    let mut request = ResolveRequest::for_module(&spec.module);
    request.merge(&spec.overrides);

    let report = ctx
        .resolver()
        .resolve(&request, ctx.options())
        .map_err(BuildError::from)
        .with_context(|| format!("failed to resolve {}", spec.module))?;

    let artifacts: Vec<ResolvedArtifact> = report.artifacts().to_vec();
    register(ctx, &spec, &artifacts)?;
    Ok(ImportOutcome::Imported)
}

/// Import a module from the batch resolve result of the current pass.
///
/// The module's own artifacts and those of its transitive dependencies in
/// the batch result are registered. Without a batch result, or when the
/// module is not part of it, nothing happens.
pub fn import_deferred(ctx: &mut BuildContext, spec: &ImportSpec) -> Result<ImportOutcome> {
    let spec = match prepare(ctx, spec)? {
        ControlFlow::Continue(spec) => spec,
        ControlFlow::Break(outcome) => return Ok(outcome),
    };

    let Some(shared) = ctx.shared_resolve() else {
        tracing::debug!("no batch resolve result, not importing {}", spec.module);
        return Ok(ImportOutcome::NotResolved);
    };
    if !shared.contains(spec.module.module_id()) {
        tracing::debug!(
            "{} is not part of the batch resolve result, not importing",
            spec.module.module_id()
        );
        return Ok(ImportOutcome::NotResolved);
    }

    let artifacts: Vec<ResolvedArtifact> = shared
        .closure_artifacts(spec.module.module_id())
        .into_iter()
        .cloned()
        .collect();
    register(ctx, &spec, &artifacts)?;
    Ok(ImportOutcome::Imported)
}

/// Gate, alias and skip handling shared by both variants.
///
/// Returns the normalized spec, or the outcome when there is nothing to do.
fn prepare(
    ctx: &mut BuildContext,
    spec: &ImportSpec,
) -> Result<ControlFlow<ImportOutcome, ImportSpec>, BuildError> {
    if !ctx.is_active(spec.conf.as_deref())? {
        tracing::debug!(
            "skipping import of {}: build configurations `{}` are not active",
            spec.module,
            spec.conf.as_deref().unwrap_or_default()
        );
        return Ok(ControlFlow::Break(ImportOutcome::Inactive));
    }

    let mut spec = spec.clone();
    spec.alias = spec.effective_alias().map(str::to_string);

    if skip_requested(&ctx.project, &spec) {
        if !spec.mandatory {
            tracing::info!("skipping import of {} as requested", spec.module);
            return Ok(ControlFlow::Break(ImportOutcome::Skipped));
        }
        tracing::warn!(
            "{} is mandatory and cannot be skipped, importing it anyway",
            spec.module
        );
    }

    let module = spec.module.module_id();
    if let Some(existing) = ctx.project.imported().iter().find(|i| &i.module == module) {
        tracing::debug!(
            "{} is already imported as `{}`, ignoring {} as `{}`",
            module,
            existing.alias.as_deref().unwrap_or(module.name()),
            spec.mode.as_str(),
            spec.alias.as_deref().unwrap_or(module.name()),
        );
        return Ok(ControlFlow::Break(ImportOutcome::AlreadyImported));
    }

    for (name, value) in &spec.attributes {
        let value = ctx.project.expand(value);
        ctx.project.declare_property(name, value);
    }

    Ok(ControlFlow::Continue(spec))
}

/// Check for `skip.<org#module>` or `skip.<alias>` set to anything but `false`.
pub fn skip_requested(project: &Project, spec: &ImportSpec) -> bool {
    let mut keys = vec![format!("skip.{}", spec.module.module_id())];
    if let Some(alias) = spec.effective_alias() {
        keys.push(format!("skip.{}", alias));
    }
    keys.iter()
        .filter_map(|key| project.property(key))
        .any(|value| value != "false")
}

/// Property naming an auxiliary artifact's local file.
pub fn artifact_property(artifact: &ResolvedArtifact) -> String {
    let module = artifact.module_id();
    if artifact.name == module.name() {
        format!("{}.{}.file", module, artifact.ext)
    } else {
        format!("{}.{}.{}.file", module, artifact.name, artifact.ext)
    }
}

/// Path reference holding a module's classpath.
pub fn classpath_reference(spec: &ImportSpec) -> String {
    format!("{}.classpath", spec.module.module_id())
}

/// Register resolved artifacts, then declare the module's script.
fn register(ctx: &mut BuildContext, spec: &ImportSpec, artifacts: &[ResolvedArtifact]) -> Result<()> {
    let script = find_script(artifacts, spec.module.module_id()).map_err(BuildError::from)?;

    let reference = classpath_reference(spec);
    for artifact in artifacts {
        if std::ptr::eq(artifact, script) {
            continue;
        }
        if ctx.is_classpath_type(&artifact.kind) {
            tracing::debug!("adding {} to {}", artifact.local_file.display(), reference);
            ctx.project.add_path_element(&reference, &artifact.local_file);
        } else {
            let property = artifact_property(artifact);
            tracing::debug!("{} = {}", property, artifact.local_file.display());
            ctx.project
                .declare_property(property, artifact.local_file.display().to_string());
        }
    }

    import_script(ctx, spec, script)
}

fn import_script(ctx: &mut BuildContext, spec: &ImportSpec, artifact: &ResolvedArtifact) -> Result<()> {
    let script = BuildScript::load(&artifact.local_file, &artifact.module)
        .with_context(|| format!("failed to load the build script of {}", artifact.module))?;

    tracing::info!(
        "{} {} {}",
        match spec.mode {
            ImportMode::Import => "importing",
            ImportMode::Include => "including",
        },
        artifact.module,
        spec.alias
            .as_deref()
            .map(|a| format!("as `{}`", a))
            .unwrap_or_default()
    );

    ctx.project.record_import(ImportedScript {
        module: spec.module.module_id().clone(),
        mode: spec.mode,
        alias: spec.alias.clone(),
        script: artifact.local_file.clone(),
    });

    declare_script(ctx, &script, spec.mode, spec.alias.as_deref())
}

/// Declare a build script into the project, resolving its nested imports.
///
/// The script's properties are declared before its imports so they win
/// over the defaults of the modules it imports.
pub fn declare_script(
    ctx: &mut BuildContext,
    script: &BuildScript,
    mode: ImportMode,
    alias: Option<&str>,
) -> Result<()> {
    script.declare_properties(&mut ctx.project);

    for nested in &script.imports {
        let spec = ImportSpec::from_plugin(&nested.plugin).with_overrides(nested.overrides.clone());
        import_module(ctx, &spec).with_context(|| {
            format!("failed to import {} from {}", spec.module, script.owner)
        })?;
    }

    script.declare_targets(&mut ctx.project, mode, alias)?;
    Ok(())
}
