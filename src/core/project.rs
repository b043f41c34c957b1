//! Project - the live target graph and property table of one build.
//!
//! The project stands in for the execution engine: it knows the declared
//! targets and phases, the (immutable) properties, path references such as
//! plugin classpaths, and which module scripts have been imported. It does
//! not run anything; `execution_order` answers which targets a run would
//! execute and in which order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::descriptor::ImportMode;
use crate::core::error::BuildError;
use crate::core::module_id::ModuleId;
use crate::core::target::Target;

/// Property that mirrors the project base directory.
pub const BASEDIR_PROPERTY: &str = "basedir";

/// A module script imported into the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedScript {
    /// Module the script belongs to
    pub module: ModuleId,
    /// How it was imported
    pub mode: ImportMode,
    /// Alias used as prefix in include mode
    pub alias: Option<String>,
    /// Local script file
    pub script: PathBuf,
}

/// The project being composed.
#[derive(Debug, Clone, Default)]
pub struct Project {
    /// Project base directory
    basedir: PathBuf,

    /// Target run when none is requested
    default_target: Option<String>,

    /// Targets by name
    targets: HashMap<String, Target>,

    /// Target names in declaration order
    declared: Vec<String>,

    /// Properties (first writer wins)
    properties: BTreeMap<String, String>,

    /// Named path collections (e.g. plugin classpaths)
    references: BTreeMap<String, Vec<PathBuf>>,

    /// Imported module scripts, in import order
    imported: Vec<ImportedScript>,
}

impl Project {
    /// Create an empty project rooted at `basedir`.
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        let basedir = basedir.into();
        let mut project = Project {
            basedir: basedir.clone(),
            ..Project::default()
        };
        project
            .properties
            .insert(BASEDIR_PROPERTY.to_string(), basedir.display().to_string());
        project
    }

    // ---------------------------------------------------------------------
    // Targets
    // ---------------------------------------------------------------------

    /// Declare a new target or phase.
    pub fn declare_target(&mut self, target: Target) -> Result<(), BuildError> {
        if self.targets.contains_key(&target.name) {
            return Err(BuildError::Graph(format!(
                "duplicate target `{}`",
                target.name
            )));
        }
        self.declared.push(target.name.clone());
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Check if a target exists.
    pub fn has_target(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Replace an existing target definition in place.
    pub fn replace_target(&mut self, name: &str, definition: Target) -> Result<(), BuildError> {
        match self.targets.get_mut(name) {
            Some(slot) => {
                *slot = definition;
                Ok(())
            }
            None => Err(BuildError::Graph(format!("target `{}` does not exist", name))),
        }
    }

    /// All targets and phases, in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.declared.iter().filter_map(|name| self.targets.get(name))
    }

    /// All phases, in declaration order.
    pub fn phases(&self) -> impl Iterator<Item = &Target> {
        self.targets().filter(|t| t.is_phase())
    }

    /// Phases whose dependency list contains `target`.
    pub fn phases_binding(&self, target: &str) -> Vec<&Target> {
        self.phases().filter(|p| p.depends_on(target)).collect()
    }

    /// Detach `target` from every phase, then attach it to `to_phase`.
    ///
    /// This is the only way targets move between phases, so a target is bound
    /// to at most one phase. The detach step runs even when `to_phase` is
    /// `None`, and keeps the order of the other dependencies.
    pub fn detach_then_attach(
        &mut self,
        target: &str,
        to_phase: Option<&str>,
    ) -> Result<(), BuildError> {
        if !self.has_target(target) {
            return Err(BuildError::Graph(format!(
                "unable to bind target `{}`: target does not exist",
                target
            )));
        }

        if let Some(phase) = to_phase {
            match self.target(phase) {
                None => {
                    return Err(BuildError::Graph(format!(
                        "unable to bind target `{}` to `{}`: phase does not exist",
                        target, phase
                    )))
                }
                Some(t) if !t.is_phase() => {
                    return Err(BuildError::Graph(format!(
                        "unable to bind target `{}` to `{}`: `{}` is not a phase",
                        target, phase, phase
                    )))
                }
                Some(_) => {}
            }
        }

        let bound: Vec<String> = self
            .phases_binding(target)
            .into_iter()
            .map(|p| p.name.clone())
            .collect();
        for name in bound {
            let rebuilt = self.targets[&name].without_dependency(target);
            tracing::debug!("detaching `{}` from phase `{}`", target, name);
            self.replace_target(&name, rebuilt)?;
        }

        if let Some(phase) = to_phase {
            let rebuilt = self.targets[phase].with_dependency(target);
            tracing::debug!("binding `{}` to phase `{}`", target, phase);
            self.replace_target(phase, rebuilt)?;
        }

        Ok(())
    }

    /// Targets a run of `name` would execute, dependencies first.
    ///
    /// Dependencies are visited depth-first in declaration order. Targets
    /// whose `if` property is unset or whose `unless` property is set are
    /// left out, but their dependencies still run.
    pub fn execution_order(&self, name: &str) -> Result<Vec<String>, BuildError> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        let mut pending = vec![name];

        while let Some(current) = pending.pop() {
            if nodes.contains_key(current) {
                continue;
            }
            let target = self.target(current).ok_or_else(|| {
                BuildError::Graph(format!("target `{}` does not exist", current))
            })?;
            nodes.insert(current, graph.add_node(current));
            for dep in &target.depends {
                if !self.has_target(dep) {
                    return Err(BuildError::Graph(format!(
                        "target `{}` does not exist (required by `{}`)",
                        dep, current
                    )));
                }
                pending.push(dep);
            }
        }

        for (&from, &node) in &nodes {
            for dep in &self.targets[from].depends {
                graph.add_edge(nodes[dep.as_str()], node, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(BuildError::Graph(format!(
                "circular dependency involving target `{}`",
                graph[cycle.node_id()]
            )));
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit(name, &mut visited, &mut order);
        Ok(order)
    }

    fn visit(&self, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let target = &self.targets[name];
        for dep in &target.depends {
            self.visit(dep, visited, order);
        }

        let if_ok = target.if_guard.as_deref().map_or(true, |p| self.has_property(p));
        let unless_ok = target
            .unless_guard
            .as_deref()
            .map_or(true, |p| !self.has_property(p));
        if if_ok && unless_ok {
            order.push(name.to_string());
        } else {
            tracing::debug!("skipping target `{}` (guard not satisfied)", name);
        }
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Declare a property unless it is already set.
    ///
    /// Returns `true` if the value was stored.
    pub fn declare_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.properties.contains_key(&name) {
            tracing::trace!("property `{}` already set, keeping existing value", name);
            return false;
        }
        self.properties.insert(name, value.into());
        true
    }

    /// Set a property, replacing any previous value.
    pub fn override_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Remove a property.
    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    /// Get a property value.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Check if a property is set.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// All properties, sorted by name.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Replace `${name}` references with property values.
    ///
    /// Unknown references are left as written.
    pub fn expand(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.property(name) {
                        Some(v) => out.push_str(v),
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }

    // ---------------------------------------------------------------------
    // References
    // ---------------------------------------------------------------------

    /// Append a path to a named path reference, creating it if needed.
    pub fn add_path_element(&mut self, reference: impl Into<String>, path: impl Into<PathBuf>) {
        let path = path.into();
        let entry = self.references.entry(reference.into()).or_default();
        if !entry.contains(&path) {
            entry.push(path);
        }
    }

    /// Get a path reference.
    pub fn reference(&self, name: &str) -> Option<&[PathBuf]> {
        self.references.get(name).map(Vec::as_slice)
    }

    /// All path references, sorted by name.
    pub fn references(&self) -> &BTreeMap<String, Vec<PathBuf>> {
        &self.references
    }

    // ---------------------------------------------------------------------
    // Imports & project settings
    // ---------------------------------------------------------------------

    /// Record an imported module script.
    pub fn record_import(&mut self, import: ImportedScript) {
        self.imported.push(import);
    }

    /// Check if a module's script was already imported.
    pub fn is_imported(&self, module: &ModuleId) -> bool {
        self.imported.iter().any(|i| &i.module == module)
    }

    /// Imported module scripts, in import order.
    pub fn imported(&self) -> &[ImportedScript] {
        &self.imported
    }

    /// Get the base directory.
    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    /// Set the base directory and the `basedir` property.
    pub fn set_basedir(&mut self, basedir: impl Into<PathBuf>) {
        self.basedir = basedir.into();
        self.override_property(BASEDIR_PROPERTY, self.basedir.display().to_string());
    }

    /// Get the default target.
    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    /// Set the default target.
    pub fn set_default_target(&mut self, name: impl Into<String>) {
        self.default_target = Some(name.into());
    }
}
