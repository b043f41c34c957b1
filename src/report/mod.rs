//! Module reports - a read-only view of what a module contributes.
//!
//! An [`EasyAntReport`] lists one module's own targets, phases, parameters,
//! properties and imports. Imports carry the imported module's report when
//! it could be built, so a report is a tree. The `available_*` queries walk
//! that tree depth-first on every call.
//!
//! Targets of an aliased import are renamed `alias + name`, with no
//! separator in between.

pub mod builder;

pub use builder::ReportBuilder;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::descriptor::ImportMode;
use crate::core::module_id::ModuleRevisionId;
use crate::core::script::ParameterKind;

/// A target as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    /// Phase the target extends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_guard: Option<String>,
    #[serde(rename = "unless", skip_serializing_if = "Option::is_none")]
    pub unless_guard: Option<String>,
}

impl TargetReport {
    fn renamed(&self, alias: Option<&str>) -> TargetReport {
        match alias {
            Some(alias) => TargetReport {
                name: format!("{}{}", alias, self.name),
                ..self.clone()
            },
            None => self.clone(),
        }
    }
}

/// A phase as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
}

/// A parameter a script expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterReport {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
}

/// What is known about one property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub required: bool,
    /// Module that declared it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        PropertyDescriptor {
            name: name.into(),
            ..PropertyDescriptor::default()
        }
    }

    /// Fill in what this descriptor lacks from a later declaration.
    ///
    /// Populated fields are never replaced, so merging twice is the same as
    /// merging once.
    pub fn merge_from(&mut self, other: &PropertyDescriptor) {
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.default.is_none() {
            self.default = other.default.clone();
        }
        if self.value.is_none() {
            self.value = other.value.clone();
        }
        if self.owner.is_none() {
            self.owner = other.owner.clone();
        }
        self.required |= other.required;
    }
}

/// One import edge of a report.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedModuleReport {
    pub module: ModuleRevisionId,
    pub mode: ImportMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub mandatory: bool,
    /// Report of the imported module, when it could be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<EasyAntReport>,
}

impl ImportedModuleReport {
    /// Check whether `key` names this import by alias, name or `org#name`.
    pub fn matches(&self, key: &str) -> bool {
        self.alias.as_deref() == Some(key)
            || self.module.name() == key
            || self.module.module_id().to_string() == key
    }
}

impl PartialEq for ImportedModuleReport {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
    }
}

impl Eq for ImportedModuleReport {}

/// Report of one module.
#[derive(Debug, Clone, Serialize)]
pub struct EasyAntReport {
    pub module: ModuleRevisionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub targets: Vec<TargetReport>,
    pub phases: Vec<PhaseReport>,
    pub parameters: Vec<ParameterReport>,
    pub properties: BTreeMap<String, PropertyDescriptor>,
    pub imports: Vec<ImportedModuleReport>,
}

impl EasyAntReport {
    pub fn new(module: ModuleRevisionId) -> Self {
        EasyAntReport {
            module,
            description: None,
            targets: Vec::new(),
            phases: Vec::new(),
            parameters: Vec::new(),
            properties: BTreeMap::new(),
            imports: Vec::new(),
        }
    }

    pub fn add_target(&mut self, target: TargetReport) {
        self.targets.push(target);
    }

    pub fn add_phase(&mut self, phase: PhaseReport) {
        self.phases.push(phase);
    }

    pub fn add_parameter(&mut self, parameter: ParameterReport) {
        self.parameters.push(parameter);
    }

    /// Add a property, merging into an existing one of the same name.
    pub fn add_property(&mut self, property: PropertyDescriptor) {
        merge_property(&mut self.properties, property);
    }

    pub fn add_import(&mut self, import: ImportedModuleReport) {
        self.imports.push(import);
    }

    /// Own targets, then those of every import, depth-first.
    ///
    /// Name collisions between imports are kept as they are.
    pub fn available_targets(&self) -> Vec<TargetReport> {
        let mut targets = self.targets.clone();
        for import in &self.imports {
            if let Some(report) = &import.report {
                targets.extend(
                    report
                        .available_targets()
                        .iter()
                        .map(|t| t.renamed(import.alias.as_deref())),
                );
            }
        }
        targets
    }

    /// Own phases, then those of every import; the first of a name is kept.
    pub fn available_phases(&self) -> Vec<PhaseReport> {
        let mut phases = self.phases.clone();
        for import in &self.imports {
            if let Some(report) = &import.report {
                for phase in report.available_phases() {
                    if !phases.iter().any(|p| p.name == phase.name) {
                        phases.push(phase);
                    }
                }
            }
        }
        phases
    }

    /// Own parameters, then those of every import; the first of a name is kept.
    pub fn available_parameters(&self) -> Vec<ParameterReport> {
        let mut parameters = self.parameters.clone();
        for import in &self.imports {
            if let Some(report) = &import.report {
                for parameter in report.available_parameters() {
                    if !parameters.iter().any(|p| p.name == parameter.name) {
                        parameters.push(parameter);
                    }
                }
            }
        }
        parameters
    }

    /// Properties of the whole tree.
    ///
    /// The first declaration found depth-first wins; later ones only fill in
    /// what it lacks.
    pub fn available_properties(&self) -> BTreeMap<String, PropertyDescriptor> {
        let mut properties = self.properties.clone();
        for import in &self.imports {
            if let Some(report) = &import.report {
                for (_, property) in report.available_properties() {
                    merge_property(&mut properties, property);
                }
            }
        }
        properties
    }

    /// Every import of the tree, depth-first, each coordinate once.
    pub fn available_imported_modules(&self) -> Vec<&ImportedModuleReport> {
        let mut modules: Vec<&ImportedModuleReport> = Vec::new();
        self.collect_imports(&mut modules);
        modules
    }

    fn collect_imports<'a>(&'a self, out: &mut Vec<&'a ImportedModuleReport>) {
        for import in &self.imports {
            if !out.contains(&import) {
                out.push(import);
            }
            if let Some(report) = &import.report {
                report.collect_imports(out);
            }
        }
    }

    /// Find a target by name.
    pub fn target_report(&self, name: &str, include_imports: bool) -> Option<TargetReport> {
        if include_imports {
            self.available_targets().into_iter().find(|t| t.name == name)
        } else {
            self.targets.iter().find(|t| t.name == name).cloned()
        }
    }

    /// Find a phase by name.
    pub fn phase_report(&self, name: &str, include_imports: bool) -> Option<PhaseReport> {
        if include_imports {
            self.available_phases().into_iter().find(|p| p.name == name)
        } else {
            self.phases.iter().find(|p| p.name == name).cloned()
        }
    }

    /// Targets declaring `phase` as the phase they extend.
    pub fn targets_for_phase(&self, phase: &str, include_imports: bool) -> Vec<TargetReport> {
        let targets = if include_imports {
            self.available_targets()
        } else {
            self.targets.clone()
        };
        targets
            .into_iter()
            .filter(|t| t.phase.as_deref() == Some(phase))
            .collect()
    }

    /// Find an import by alias, module name or `org#name`.
    ///
    /// Direct imports are searched before nested ones.
    pub fn imported_module_report(&self, name_or_alias: &str) -> Option<&ImportedModuleReport> {
        self.imports
            .iter()
            .find(|i| i.matches(name_or_alias))
            .or_else(|| {
                self.available_imported_modules()
                    .into_iter()
                    .find(|i| i.matches(name_or_alias))
            })
    }
}

fn merge_property(properties: &mut BTreeMap<String, PropertyDescriptor>, property: PropertyDescriptor) {
    match properties.get_mut(&property.name) {
        Some(existing) => existing.merge_from(&property),
        None => {
            properties.insert(property.name.clone(), property);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, phase: Option<&str>) -> TargetReport {
        TargetReport {
            name: name.to_string(),
            description: None,
            depends: Vec::new(),
            phase: phase.map(str::to_string),
            if_guard: None,
            unless_guard: None,
        }
    }

    fn phase(name: &str) -> PhaseReport {
        PhaseReport {
            name: name.to_string(),
            description: None,
            depends: Vec::new(),
        }
    }

    fn import(module: &str, alias: Option<&str>, report: Option<EasyAntReport>) -> ImportedModuleReport {
        ImportedModuleReport {
            module: module.parse().unwrap(),
            mode: ImportMode::Import,
            alias: alias.map(str::to_string),
            mandatory: false,
            report,
        }
    }

    /// app imports build-std (no alias) and docs (alias "docs"); docs imports engine.
    fn tree() -> EasyAntReport {
        let mut engine = EasyAntReport::new("org.acme#engine;2.0".parse().unwrap());
        engine.add_target(target("warmup", None));
        engine.add_property(PropertyDescriptor {
            description: Some("engine home".into()),
            default: Some("/opt/engine".into()),
            ..PropertyDescriptor::new("engine.home")
        });

        let mut docs = EasyAntReport::new("org.acme#docs;1.0".parse().unwrap());
        docs.add_target(target("generate", Some("package")));
        docs.add_phase(phase("package"));
        docs.add_import(import("org.acme#engine;2.0", None, Some(engine)));

        let mut build_std = EasyAntReport::new("org.acme#build-std;1.0".parse().unwrap());
        build_std.add_phase(phase("compile"));
        build_std.add_phase(phase("package"));
        build_std.add_target(target("javac", Some("compile")));
        build_std.add_target(target("jar", Some("package")));

        let mut app = EasyAntReport::new("org.acme#app;1.0".parse().unwrap());
        app.add_target(target("hello", None));
        app.add_property(PropertyDescriptor {
            value: Some("/custom".into()),
            ..PropertyDescriptor::new("engine.home")
        });
        app.add_import(import("org.acme#build-std;1.0", None, Some(build_std)));
        app.add_import(import("org.acme#docs;1.0", Some("docs"), Some(docs)));
        app
    }

    #[test]
    fn test_available_targets_concatenate_alias() {
        let names: Vec<String> = tree().available_targets().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["hello", "javac", "jar", "docsgenerate", "docswarmup"]
        );
    }

    #[test]
    fn test_available_phases_keep_first() {
        let names: Vec<String> = tree().available_phases().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["compile", "package"]);
    }

    #[test]
    fn test_lookups() {
        let report = tree();

        assert!(report.target_report("hello", false).is_some());
        assert!(report.target_report("javac", false).is_none());
        assert!(report.target_report("javac", true).is_some());
        assert!(report.target_report("docsgenerate", true).is_some());
        assert!(report.phase_report("package", false).is_none());
        assert!(report.phase_report("package", true).is_some());

        let bound: Vec<String> = report
            .targets_for_phase("package", true)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(bound, vec!["jar", "docsgenerate"]);
        assert!(report.targets_for_phase("package", false).is_empty());
    }

    #[test]
    fn test_imported_module_lookup() {
        let report = tree();

        assert_eq!(
            report.imported_module_report("docs").unwrap().module.name(),
            "docs"
        );
        assert_eq!(
            report.imported_module_report("org.acme#build-std").unwrap().module.name(),
            "build-std"
        );
        assert_eq!(
            report.imported_module_report("engine").unwrap().module.name(),
            "engine"
        );
        assert!(report.imported_module_report("nothing").is_none());
        assert_eq!(report.available_imported_modules().len(), 3);
    }

    #[test]
    fn test_property_back_fill() {
        let properties = tree().available_properties();
        let home = &properties["engine.home"];

        assert_eq!(home.value.as_deref(), Some("/custom"));
        assert_eq!(home.description.as_deref(), Some("engine home"));
        assert_eq!(home.default.as_deref(), Some("/opt/engine"));
    }

    #[test]
    fn test_property_merge_is_idempotent() {
        let report = tree();
        let once = report.available_properties();

        let mut twice = once.clone();
        for property in once.values() {
            merge_property(&mut twice, property.clone());
            merge_property(&mut twice, property.clone());
        }
        assert_eq!(once, twice);

        let mut partial = PropertyDescriptor::new("x");
        let full = PropertyDescriptor {
            description: Some("d".into()),
            required: true,
            ..PropertyDescriptor::new("x")
        };
        partial.merge_from(&full);
        partial.merge_from(&PropertyDescriptor::new("x"));
        assert_eq!(partial.description.as_deref(), Some("d"));
        assert!(partial.required);
    }

    #[test]
    fn test_import_equality_is_by_coordinate() {
        let a = import("org.acme#docs;1.0", Some("a"), None);
        let b = import("org.acme#docs;1.0", None, Some(EasyAntReport::new("org.acme#docs;1.0".parse().unwrap())));
        let c = import("org.acme#docs;2.0", Some("a"), None);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_json_output() {
        let json = serde_json::to_value(tree()).unwrap();
        assert_eq!(json["module"], "org.acme#app;1.0");
        assert_eq!(json["imports"][1]["alias"], "docs");
        assert_eq!(json["imports"][1]["report"]["targets"][0]["phase"], "package");
    }
}
