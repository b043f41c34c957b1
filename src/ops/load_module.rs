//! Loading a module into the project.
//!
//! [`ModuleLoader::load`] runs the whole composition of one module, in this
//! order:
//!
//! 1. parse the descriptor and merge its `extends` chain,
//! 2. publish the available and main build configurations,
//! 3. set the module coordinate properties and the loader attributes,
//! 4. declare the visible, active properties,
//! 5. apply the default target and base directory,
//! 6. resolve the build type and plugins in one batch,
//! 7. import the build type, then each plugin, from that batch,
//! 8. declare the module's own build script,
//! 9. apply the extension-point mappings.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::buildconf::{
    MainConfs, ACTIVE_CONFS_PROPERTY, AVAILABLE_CONFS_PROPERTY, MAIN_CONFS_PROPERTY,
};
use crate::core::descriptor::{
    can_inherit, read_property_file, ImportMode, ModuleDescriptor, PluginDescriptor,
};
use crate::core::error::BuildError;
use crate::core::module_id::ModuleRevisionId;
use crate::core::project::ImportedScript;
use crate::core::script::BuildScript;
use crate::ops::bind::apply_mapping;
use crate::ops::context::BuildContext;
use crate::ops::import::{declare_script, import_deferred, skip_requested, ImportSpec};
use crate::resolver::{DependencySpec, ResolveRequest};

/// Loads module descriptors into a [`BuildContext`].
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    /// Extra attributes, declared as properties before the module's own
    attributes: BTreeMap<String, String>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        ModuleLoader::default()
    }

    /// Set an attribute that becomes a project property during the load.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Load the descriptor at `path` into the project.
    pub fn load(&self, ctx: &mut BuildContext, path: &Path) -> Result<ModuleDescriptor> {
        let descriptor = ModuleDescriptor::load_with_parents(path, ctx.resolver(), ctx.options())?;
        tracing::info!("loading {}", descriptor.mrid);

        self.load_descriptor(ctx, &descriptor)
            .with_context(|| format!("failed to load module {}", descriptor.mrid))?;
        Ok(descriptor)
    }

    /// Load an already parsed descriptor into the project.
    pub fn load_descriptor(&self, ctx: &mut BuildContext, md: &ModuleDescriptor) -> Result<()> {
        publish_configurations(ctx, md);

        ctx.project
            .override_property("module.organisation", md.mrid.organisation());
        ctx.project.override_property("module.name", md.mrid.name());
        match md.mrid.revision() {
            Some(rev) => ctx.project.override_property("module.revision", rev),
            None => {
                ctx.project.remove_property("module.revision");
            }
        }
        for (name, value) in &self.attributes {
            let value = ctx.project.expand(value);
            ctx.project.declare_property(name, value);
        }

        declare_properties(ctx, md)?;

        if let Some(target) = &md.default_target {
            ctx.project.set_default_target(target);
        }
        if let Some(basedir) = &md.basedir {
            ctx.project.set_basedir(basedir);
        }

        let imports = visible_imports(ctx, md)?;
        batch_resolve(ctx, &md.mrid, &imports)?;
        for plugin in &imports {
            let spec = ImportSpec::from_plugin(plugin);
            import_deferred(ctx, &spec)
                .with_context(|| format!("failed to import {}", plugin.module))?;
        }

        if let Some(script_path) = &md.script {
            let script = BuildScript::load(script_path, &md.mrid)?;
            ctx.project.record_import(ImportedScript {
                module: md.mrid.module_id().clone(),
                mode: ImportMode::Import,
                alias: None,
                script: script_path.clone(),
            });
            declare_script(ctx, &script, ImportMode::Import, None)?;
        }

        for mapping in &md.bindings {
            if !can_inherit(mapping, &md.mrid) {
                tracing::debug!("binding of `{}` is not visible in {}", mapping.target, md.mrid);
                continue;
            }
            apply_mapping(ctx, mapping)?;
        }

        Ok(())
    }
}

/// Publish the available set and recompute `main.confs`.
fn publish_configurations(ctx: &mut BuildContext, md: &ModuleDescriptor) {
    let Some(available) = md.configurations.as_deref() else {
        ctx.project.remove_property(AVAILABLE_CONFS_PROPERTY);
        ctx.project.remove_property(MAIN_CONFS_PROPERTY);
        return;
    };
    ctx.project
        .override_property(AVAILABLE_CONFS_PROPERTY, available);

    let Some(active) = ctx.project.property(ACTIVE_CONFS_PROPERTY).map(str::to_string) else {
        ctx.project.remove_property(MAIN_CONFS_PROPERTY);
        return;
    };

    let main = MainConfs::compute(available, &active);
    for missing in &main.missing {
        tracing::warn!(
            "build configuration `{}` is not declared by {}",
            missing,
            md.mrid
        );
    }
    tracing::debug!("main build configurations: {}", main.to_csv());
    ctx.project.override_property(MAIN_CONFS_PROPERTY, main.to_csv());
}

/// Declare the visible properties whose configurations are active.
fn declare_properties(ctx: &mut BuildContext, md: &ModuleDescriptor) -> Result<()> {
    for prop in &md.properties {
        let label = prop
            .name
            .clone()
            .or_else(|| prop.file.as_ref().map(|f| f.display().to_string()))
            .unwrap_or_default();

        if !can_inherit(prop, &md.mrid) {
            tracing::debug!("property `{}` is not visible in {}", label, md.mrid);
            continue;
        }
        if !ctx.is_active(prop.conf.as_deref())? {
            tracing::debug!(
                "skipping property `{}`: build configurations `{}` are not active",
                label,
                prop.conf.as_deref().unwrap_or_default()
            );
            continue;
        }

        match (&prop.name, &prop.value, &prop.file) {
            (Some(name), Some(value), _) => {
                let value = ctx.project.expand(value);
                ctx.project.declare_property(name, value);
            }
            (_, _, Some(file)) => load_property_file(ctx, file)?,
            _ => {}
        }
    }
    Ok(())
}

fn load_property_file(ctx: &mut BuildContext, path: &Path) -> Result<()> {
    for (name, value) in read_property_file(path)? {
        let value = ctx.project.expand(&value);
        ctx.project.declare_property(name, value);
    }
    Ok(())
}

/// Build type and plugins visible in `md`, build type first.
fn visible_imports<'a>(
    ctx: &BuildContext,
    md: &'a ModuleDescriptor,
) -> Result<Vec<&'a PluginDescriptor>> {
    let mut imports = Vec::new();
    for plugin in md.imports() {
        if !can_inherit(plugin, &md.mrid) {
            tracing::debug!("{} is not visible in {}", plugin.module, md.mrid);
            continue;
        }
        // validate now so a bad `conf` fails before anything is resolved
        ctx.is_active(plugin.conf.as_deref())?;
        imports.push(plugin);
    }
    Ok(imports)
}

/// Resolve every active, non-skipped import in one request.
fn batch_resolve(
    ctx: &mut BuildContext,
    mrid: &ModuleRevisionId,
    imports: &[&PluginDescriptor],
) -> Result<()> {
    let caller = ModuleRevisionId::new(
        mrid.organisation(),
        format!("{}-caller", mrid.name()),
        "working",
    );
    let mut request = ResolveRequest::new(caller);

    for plugin in imports {
        if !ctx.is_active(plugin.conf.as_deref())? {
            continue;
        }
        let spec = ImportSpec::from_plugin(plugin);
        if !spec.mandatory && skip_requested(&ctx.project, &spec) {
            continue;
        }
        request.add_dependency(DependencySpec::new(plugin.module.clone()));
    }

    if request.dependencies.is_empty() {
        tracing::debug!("nothing to resolve for {}", mrid);
        return Ok(());
    }

    let report = ctx
        .resolver()
        .resolve(&request, ctx.options())
        .map_err(BuildError::from)
        .with_context(|| format!("failed to resolve the plugins of {}", mrid))?;
    ctx.set_shared_resolve(report);
    Ok(())
}
