//! module.toml descriptor parsing and composition.
//!
//! A module descriptor names the module, declares the build configurations
//! it knows about, and lists what it is composed of: properties, one build
//! type, plugins and extension-point mappings. Every one of those items
//! remembers which module declared it and how far it may be inherited.
//!
//! A descriptor may `extends` a parent module. The parent's items are merged
//! into the child (parent first) unless they are scoped to the parent alone.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::buildconf;
use crate::core::error::{BuildError, ParseError};
use crate::core::module_id::{ModuleId, ModuleRevisionId};
use crate::resolver::{ModuleResolver, ResolveOptions};

/// Canonical descriptor file name.
pub const DESCRIPTOR_NAME: &str = "module.toml";

/// How far an item is inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritScope {
    /// Only the declaring module sees it; children do not inherit it.
    #[serde(rename = "self")]
    SelfOnly,
    /// Only inheriting modules see it.
    Child,
    /// Everyone sees it.
    #[default]
    Both,
}

/// How an imported script's targets are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep target names as declared.
    #[default]
    Import,
    /// Prefix target names with `alias.`.
    Include,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Import => "import",
            ImportMode::Include => "include",
        }
    }
}

/// An item that can be inherited from a parent module.
pub trait InheritableItem {
    /// Coordinate of the module that declared the item.
    fn source_module(&self) -> &ModuleRevisionId;

    /// Inheritance scope of the item.
    fn inherit_scope(&self) -> InheritScope;
}

/// Check whether `item` is visible while loading `current`.
///
/// Child-scoped items are hidden from the module that declared them; in any
/// other module every item is visible.
pub fn can_inherit(item: &impl InheritableItem, current: &ModuleRevisionId) -> bool {
    !(item.source_module() == current && item.inherit_scope() == InheritScope::Child)
}

/// A property declared in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    /// Property name (absent for file-based declarations)
    pub name: Option<String>,
    /// Property value
    pub value: Option<String>,
    /// TOML file of `key = "value"` pairs, resolved against the descriptor
    pub file: Option<PathBuf>,
    /// Gating build configurations
    pub conf: Option<String>,
    pub source_module: ModuleRevisionId,
    pub inherit_scope: InheritScope,
}

impl InheritableItem for PropertyDeclaration {
    fn source_module(&self) -> &ModuleRevisionId {
        &self.source_module
    }

    fn inherit_scope(&self) -> InheritScope {
        self.inherit_scope
    }
}

/// Read the `key = "value"` pairs of a property file.
///
/// Nested tables become dotted names; non-string values keep their TOML
/// spelling.
pub fn read_property_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read property file: {}", path.display()))?;
    let table: toml::Table =
        toml::from_str(&content).map_err(|e| BuildError::from(ParseError::from_toml(path, &content, &e)))?;

    let mut pairs = Vec::new();
    flatten_table("", &table, &mut pairs);
    Ok(pairs)
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::Table(nested) => flatten_table(&name, nested, out),
            toml::Value::String(s) => out.push((name, s.clone())),
            other => out.push((name, other.to_string())),
        }
    }
}

/// A reference to a plugin module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Plugin coordinate
    pub module: ModuleRevisionId,
    /// Import mode
    pub mode: ImportMode,
    /// Alias (`as`)
    pub alias: Option<String>,
    /// Whether `skip.*` properties are ignored
    pub mandatory: bool,
    /// Gating build configurations
    pub conf: Option<String>,
    /// Open-ended attributes, declared as properties before the import
    pub attributes: BTreeMap<String, String>,
    pub source_module: ModuleRevisionId,
    pub inherit_scope: InheritScope,
}

/// The build type is a distinguished plugin reference.
pub type BuildTypeDescriptor = PluginDescriptor;

impl InheritableItem for PluginDescriptor {
    fn source_module(&self) -> &ModuleRevisionId {
        &self.source_module
    }

    fn inherit_scope(&self) -> InheritScope {
        self.inherit_scope
    }
}

/// Bind a target to a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPointMapping {
    /// Target to bind
    pub target: String,
    /// Destination phase; `None` only detaches
    pub to_phase: Option<String>,
    /// Gating build configurations
    pub conf: Option<String>,
    pub source_module: ModuleRevisionId,
    pub inherit_scope: InheritScope,
}

impl InheritableItem for ExtensionPointMapping {
    fn source_module(&self) -> &ModuleRevisionId {
        &self.source_module
    }

    fn inherit_scope(&self) -> InheritScope {
        self.inherit_scope
    }
}

/// A parsed module descriptor.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Module coordinate
    pub mrid: ModuleRevisionId,
    /// Module description
    pub description: Option<String>,
    /// Parent module
    pub extends: Option<ModuleRevisionId>,
    /// Available build configurations (comma-separated)
    pub configurations: Option<String>,
    /// Default target of the project
    pub default_target: Option<String>,
    /// Project base directory, resolved against the descriptor
    pub basedir: Option<PathBuf>,
    /// The module's own build script, resolved against the descriptor
    pub script: Option<PathBuf>,
    /// Declared properties, in declaration order
    pub properties: Vec<PropertyDeclaration>,
    /// Build type reference
    pub build_type: Option<BuildTypeDescriptor>,
    /// Plugin references, in declaration order
    pub plugins: Vec<PluginDescriptor>,
    /// Extension-point mappings, in declaration order
    pub bindings: Vec<ExtensionPointMapping>,
    /// Path of the descriptor file
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    module: RawModule,

    #[serde(default)]
    build: RawBuild,

    #[serde(default, rename = "build-type")]
    build_type: Option<RawPluginRef>,

    #[serde(default, rename = "plugin")]
    plugins: Vec<RawPluginRef>,

    #[serde(default, rename = "property")]
    properties: Vec<RawProperty>,

    #[serde(default, rename = "bind-target")]
    bindings: Vec<RawBinding>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    organisation: String,
    name: String,
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    extends: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawBuild {
    #[serde(default)]
    configurations: Option<String>,
    #[serde(default)]
    default_target: Option<String>,
    #[serde(default)]
    basedir: Option<PathBuf>,
    #[serde(default)]
    script: Option<PathBuf>,
}

/// A plugin, build-type or script import entry as written in TOML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawPluginRef {
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    organisation: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    revision: Option<String>,
    #[serde(default)]
    mode: ImportMode,
    #[serde(default, rename = "as")]
    alias: Option<String>,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    conf: Option<String>,
    #[serde(default)]
    inherit_scope: InheritScope,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

impl RawPluginRef {
    /// Convert to a plugin reference declared by `source`.
    ///
    /// The `conf` attribute is not validated here; descriptors check it
    /// against their available set, scripts at import time.
    pub(crate) fn into_plugin(
        self,
        source: &ModuleRevisionId,
    ) -> Result<PluginDescriptor, BuildError> {
        let module = ModuleRevisionId::from_parts(
            self.module.as_deref(),
            self.organisation.as_deref(),
            self.name.as_deref(),
            self.revision.as_deref(),
        )?;

        let attributes = self
            .extra
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();

        Ok(PluginDescriptor {
            module,
            mode: self.mode,
            alias: self.alias,
            mandatory: self.mandatory,
            conf: self.conf,
            attributes,
            source_module: source.clone(),
            inherit_scope: self.inherit_scope,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProperty {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    conf: Option<String>,
    #[serde(default)]
    inherit_scope: InheritScope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawBinding {
    target: String,
    #[serde(default)]
    to_phase: Option<String>,
    #[serde(default)]
    conf: Option<String>,
    #[serde(default)]
    inherit_scope: InheritScope,
}

impl ModuleDescriptor {
    /// Load a descriptor from a file, without resolving its parents.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read module descriptor: {}", path.display()))?;

        Ok(Self::parse(&content, path)?)
    }

    /// Load a descriptor and merge its `extends` chain.
    pub fn load_with_parents(
        path: &Path,
        resolver: &dyn ModuleResolver,
        options: &ResolveOptions,
    ) -> Result<Self> {
        let mut descriptor = Self::load(path)?;
        let mut seen = vec![descriptor.mrid.to_string()];
        let mut next = descriptor.extends.clone();

        while let Some(parent_mrid) = next {
            let key = parent_mrid.to_string();
            if seen.contains(&key) {
                seen.push(key);
                return Err(BuildError::CyclicImport { chain: seen }.into());
            }
            seen.push(key);

            let parent_path = resolver
                .find_descriptor(&parent_mrid, options)
                .map_err(BuildError::from)
                .with_context(|| {
                    format!("failed to locate parent module {} of {}", parent_mrid, descriptor.mrid)
                })?;
            let parent = Self::load(&parent_path)?;
            tracing::debug!("{} extends {}", descriptor.mrid, parent.mrid);

            next = parent.extends.clone();
            descriptor.merge_parent(&parent);
        }

        if descriptor.extends.is_some() {
            descriptor
                .validate_confs()
                .with_context(|| format!("invalid build configuration in {}", descriptor.mrid))?;
        }
        Ok(descriptor)
    }

    /// Parse descriptor content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, BuildError> {
        let raw: RawDescriptor = toml::from_str(content)
            .map_err(|e| ParseError::from_toml(path, content, &e))?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let mrid = match raw.module.revision {
            Some(rev) => ModuleRevisionId::new(&raw.module.organisation, &raw.module.name, rev),
            None => ModuleRevisionId::latest(&raw.module.organisation, &raw.module.name),
        };
        let extends = raw
            .module
            .extends
            .as_deref()
            .map(str::parse::<ModuleRevisionId>)
            .transpose()?;
        let mut properties = Vec::with_capacity(raw.properties.len());
        for prop in raw.properties {
            match (&prop.name, &prop.value, &prop.file) {
                (Some(_), Some(_), None) | (None, None, Some(_)) => {}
                _ => {
                    return Err(ParseError::new(
                        path,
                        "a [[property]] needs either `name` and `value`, or `file`",
                    )
                    .into())
                }
            }
            properties.push(PropertyDeclaration {
                name: prop.name,
                value: prop.value,
                file: prop.file.map(|f| dir.join(f)),
                conf: prop.conf,
                source_module: mrid.clone(),
                inherit_scope: prop.inherit_scope,
            });
        }

        let build_type = raw
            .build_type
            .map(|bt| bt.into_plugin(&mrid))
            .transpose()?;

        let plugins = raw
            .plugins
            .into_iter()
            .map(|p| p.into_plugin(&mrid))
            .collect::<Result<Vec<_>, _>>()?;

        let mut bindings = Vec::with_capacity(raw.bindings.len());
        for binding in raw.bindings {
            bindings.push(ExtensionPointMapping {
                target: binding.target,
                to_phase: binding.to_phase,
                conf: binding.conf,
                source_module: mrid.clone(),
                inherit_scope: binding.inherit_scope,
            });
        }

        let descriptor = ModuleDescriptor {
            mrid,
            description: raw.module.description,
            extends,
            configurations: raw.build.configurations,
            default_target: raw.build.default_target,
            basedir: raw.build.basedir.map(|b| dir.join(b)),
            script: raw.build.script.map(|s| dir.join(s)),
            properties,
            build_type,
            plugins,
            bindings,
            path: path.to_path_buf(),
        };

        // With a parent, the available set is only known once merged.
        if descriptor.extends.is_none() {
            descriptor.validate_confs()?;
        }
        Ok(descriptor)
    }

    /// Check every `conf` attribute against the available configurations.
    pub fn validate_confs(&self) -> Result<(), BuildError> {
        let available = self.configurations.as_deref();
        let confs = self
            .properties
            .iter()
            .map(|p| p.conf.as_deref())
            .chain(self.imports().map(|p| p.conf.as_deref()))
            .chain(self.bindings.iter().map(|b| b.conf.as_deref()));

        for conf in confs.flatten() {
            buildconf::validate(conf, available)?;
        }
        Ok(())
    }

    /// Merge the items a parent passes down into this descriptor.
    ///
    /// Parent items come first. Items scoped `self` stay with the parent. A
    /// property or build type declared here wins over the parent's.
    pub fn merge_parent(&mut self, parent: &ModuleDescriptor) {
        let inherited = |scope: InheritScope| scope != InheritScope::SelfOnly;

        let own_names: HashSet<&str> = self
            .properties
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect();
        let mut properties: Vec<PropertyDeclaration> = parent
            .properties
            .iter()
            .filter(|p| inherited(p.inherit_scope))
            .filter(|p| p.name.as_deref().map_or(true, |n| !own_names.contains(n)))
            .cloned()
            .collect();
        properties.append(&mut self.properties);
        self.properties = properties;

        if self.build_type.is_none() {
            self.build_type = parent
                .build_type
                .iter()
                .find(|bt| inherited(bt.inherit_scope))
                .cloned();
        }

        let own_plugins: HashSet<&ModuleId> =
            self.plugins.iter().map(|p| p.module.module_id()).collect();
        let mut plugins: Vec<PluginDescriptor> = parent
            .plugins
            .iter()
            .filter(|p| inherited(p.inherit_scope))
            .filter(|p| !own_plugins.contains(p.module.module_id()))
            .cloned()
            .collect();
        plugins.append(&mut self.plugins);
        self.plugins = plugins;

        let mut bindings: Vec<ExtensionPointMapping> = parent
            .bindings
            .iter()
            .filter(|b| inherited(b.inherit_scope))
            .cloned()
            .collect();
        bindings.append(&mut self.bindings);
        self.bindings = bindings;

        if self.configurations.is_none() {
            self.configurations = parent.configurations.clone();
        }
        if self.default_target.is_none() {
            self.default_target = parent.default_target.clone();
        }
        if self.basedir.is_none() {
            self.basedir = parent.basedir.clone();
        }
    }

    /// Build type and plugins, build type first.
    pub fn imports(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.build_type.iter().chain(self.plugins.iter())
    }

    /// Directory containing the descriptor.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}
