//! Build scripts - what a plugin module contributes to the project.
//!
//! A plugin publishes one `script` artifact: a TOML file declaring phases,
//! targets, parameters and default properties, plus the other plugins it
//! needs. Declaring a script into a project in `include` mode prefixes every
//! target and phase it declares with `alias.`; references between its own
//! targets are rewritten the same way.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::descriptor::{ImportMode, PluginDescriptor, RawPluginRef};
use crate::core::error::{BuildError, ParseError};
use crate::core::module_id::ModuleRevisionId;
use crate::core::project::Project;
use crate::core::target::Target;
use crate::resolver::{ConflictRule, DependencySpec, ExcludeRule, ResolveOverrides};

/// A phase declared by a script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhaseDecl {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depends: Vec<String>,
}

/// A target declared by a script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetDecl {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    /// Phase the target extends
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default, rename = "if")]
    pub if_guard: Option<String>,
    #[serde(default, rename = "unless")]
    pub unless_guard: Option<String>,
}

/// Kind of a script parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    #[default]
    Property,
    Path,
}

/// A parameter the script expects from its user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A property the script sets unless the project already has it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptProperty {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A nested import, resolved eagerly when the script is imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptImport {
    pub plugin: PluginDescriptor,
    pub overrides: ResolveOverrides,
}

/// A parsed build script.
#[derive(Debug, Clone)]
pub struct BuildScript {
    /// Module that published the script
    pub owner: ModuleRevisionId,
    pub description: Option<String>,
    pub phases: Vec<PhaseDecl>,
    pub targets: Vec<TargetDecl>,
    pub parameters: Vec<ParameterDecl>,
    pub properties: Vec<ScriptProperty>,
    pub imports: Vec<ScriptImport>,
    /// Local script file
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default)]
    script: RawScriptHeader,
    #[serde(default, rename = "phase")]
    phases: Vec<PhaseDecl>,
    #[serde(default, rename = "target")]
    targets: Vec<TargetDecl>,
    #[serde(default, rename = "parameter")]
    parameters: Vec<ParameterDecl>,
    #[serde(default, rename = "property")]
    properties: Vec<ScriptProperty>,
    #[serde(default, rename = "import")]
    imports: Vec<RawImport>,
}

#[derive(Debug, Default, Deserialize)]
struct RawScriptHeader {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImport {
    #[serde(default, rename = "dependency")]
    dependencies: Vec<RawOverrideDependency>,
    #[serde(default, rename = "exclude")]
    excludes: Vec<ExcludeRule>,
    #[serde(default, rename = "conflict")]
    conflicts: Vec<ConflictRule>,
    #[serde(flatten)]
    plugin: RawPluginRef,
}

#[derive(Debug, Deserialize)]
struct RawOverrideDependency {
    module: ModuleRevisionId,
    #[serde(default = "default_true")]
    transitive: bool,
}

fn default_true() -> bool {
    true
}

impl BuildScript {
    /// Load a script published by `owner`.
    pub fn load(path: &Path, owner: &ModuleRevisionId) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build script: {}", path.display()))?;

        Ok(Self::parse(&content, path, owner)?)
    }

    /// Parse script content.
    pub fn parse(content: &str, path: &Path, owner: &ModuleRevisionId) -> Result<Self, BuildError> {
        let raw: RawScript =
            toml::from_str(content).map_err(|e| ParseError::from_toml(path, content, &e))?;

        let mut imports = Vec::with_capacity(raw.imports.len());
        for import in raw.imports {
            let overrides = ResolveOverrides {
                dependencies: import
                    .dependencies
                    .into_iter()
                    .map(|d| DependencySpec {
                        module: d.module,
                        transitive: d.transitive,
                    })
                    .collect(),
                excludes: import.excludes,
                conflicts: import.conflicts,
            };
            imports.push(ScriptImport {
                plugin: import.plugin.into_plugin(owner)?,
                overrides,
            });
        }

        let mut seen = HashSet::new();
        for name in raw
            .phases
            .iter()
            .map(|p| &p.name)
            .chain(raw.targets.iter().map(|t| &t.name))
        {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::new(
                    path,
                    format!("`{}` is declared more than once", name),
                )
                .into());
            }
        }

        Ok(BuildScript {
            owner: owner.clone(),
            description: raw.script.description,
            phases: raw.phases,
            targets: raw.targets,
            parameters: raw.parameters,
            properties: raw.properties,
            imports,
            path: path.to_path_buf(),
        })
    }

    /// Check if the script declares a phase or target with this name.
    pub fn declares(&self, name: &str) -> bool {
        self.phases.iter().any(|p| p.name == name) || self.targets.iter().any(|t| t.name == name)
    }

    /// Declare the script's properties, parameters, phases and targets.
    ///
    /// Nested imports are not handled here; they need a resolver and run
    /// between [`declare_properties`](Self::declare_properties) and
    /// [`declare_targets`](Self::declare_targets).
    pub fn declare_into(
        &self,
        project: &mut Project,
        mode: ImportMode,
        alias: Option<&str>,
    ) -> Result<(), BuildError> {
        self.declare_properties(project);
        self.declare_targets(project, mode, alias)
    }

    /// Declare properties and parameter defaults the project does not set yet.
    pub fn declare_properties(&self, project: &mut Project) {
        for prop in &self.properties {
            let value = project.expand(&prop.value);
            project.declare_property(&prop.name, value);
        }

        for param in &self.parameters {
            if let Some(default) = &param.default {
                let value = project.expand(default);
                project.declare_property(&param.name, value);
            }
        }
    }

    /// Check required parameters, then declare phases and targets.
    ///
    /// In include mode, names declared by this script are prefixed with
    /// `alias.`, in declarations and in `depends` alike.
    pub fn declare_targets(
        &self,
        project: &mut Project,
        mode: ImportMode,
        alias: Option<&str>,
    ) -> Result<(), BuildError> {
        let owner = self.owner.module_id().to_string();

        for param in self.parameters.iter().filter(|p| p.required) {
            if !project.has_property(&param.name) {
                return Err(BuildError::Configuration(format!(
                    "expected property `{}` required by {}",
                    param.name, owner
                )));
            }
        }

        let prefix = match (mode, alias) {
            (ImportMode::Include, Some(alias)) => Some(format!("{}.", alias)),
            _ => None,
        };
        let rename = |name: &str| -> String {
            match &prefix {
                Some(prefix) if self.declares(name) => format!("{}{}", prefix, name),
                _ => name.to_string(),
            }
        };

        for phase in &self.phases {
            let name = rename(&phase.name);
            let depends: Vec<String> = phase.depends.iter().map(|d| rename(d)).collect();

            match project.target(&name) {
                Some(existing) if existing.is_phase() => {
                    let mut merged = existing.clone();
                    for dep in depends {
                        if !merged.depends_on(&dep) {
                            merged.depends.push(dep);
                        }
                    }
                    tracing::debug!("phase `{}` already declared, merging", name);
                    project.replace_target(&name, merged)?;
                }
                _ => {
                    let mut target = Target::phase(&name).with_depends(depends).with_owner(&owner);
                    target.description = phase.description.clone();
                    project.declare_target(target)?;
                }
            }
        }

        for decl in &self.targets {
            let mut target = Target::new(rename(&decl.name))
                .with_depends(decl.depends.iter().map(|d| rename(d)))
                .with_owner(&owner);
            target.description = decl.description.clone();
            target.if_guard = decl.if_guard.clone();
            target.unless_guard = decl.unless_guard.clone();
            project.declare_target(target)?;
        }

        for decl in &self.targets {
            if let Some(phase) = &decl.phase {
                project.detach_then_attach(&rename(&decl.name), Some(&rename(phase)))?;
            }
        }

        Ok(())
    }
}
