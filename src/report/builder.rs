//! Building reports from descriptors and scripts.
//!
//! Each import is resolved on its own and its script read for targets,
//! phases, parameters, properties and nested imports. A module seen again on
//! the current import path is a [`BuildError::CyclicImport`].

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::descriptor::{can_inherit, read_property_file, ModuleDescriptor, PluginDescriptor};
use crate::core::error::BuildError;
use crate::core::module_id::ModuleRevisionId;
use crate::core::script::{BuildScript, ParameterKind};
use crate::ops::context::BuildContext;
use crate::report::{
    EasyAntReport, ImportedModuleReport, ParameterReport, PhaseReport, PropertyDescriptor,
    TargetReport,
};
use crate::resolver::{find_script, ModuleResolver, ResolveOptions, ResolveOverrides, ResolveRequest};

/// Builds [`EasyAntReport`]s through a resolution service.
pub struct ReportBuilder<'a> {
    resolver: &'a dyn ModuleResolver,
    options: &'a ResolveOptions,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(resolver: &'a dyn ModuleResolver, options: &'a ResolveOptions) -> Self {
        ReportBuilder { resolver, options }
    }

    /// Use the resolver and options of a build context.
    pub fn from_context(ctx: &'a BuildContext) -> Self {
        ReportBuilder::new(ctx.resolver(), ctx.options())
    }

    /// Report of the module described at `path`, parents merged.
    pub fn descriptor_report(&self, path: &Path) -> Result<EasyAntReport> {
        let md = ModuleDescriptor::load_with_parents(path, self.resolver, self.options)?;
        let owner = md.mrid.module_id().to_string();
        let mut stack = vec![owner.clone()];

        let mut report = EasyAntReport::new(md.mrid.clone());
        report.description = md.description.clone();

        for prop in md.properties.iter().filter(|p| can_inherit(*p, &md.mrid)) {
            match (&prop.name, &prop.file) {
                (Some(name), _) => report.add_property(PropertyDescriptor {
                    value: prop.value.clone(),
                    owner: Some(owner.clone()),
                    ..PropertyDescriptor::new(name)
                }),
                (None, Some(file)) => {
                    for (name, value) in read_property_file(file)? {
                        report.add_property(PropertyDescriptor {
                            value: Some(value),
                            owner: Some(owner.clone()),
                            ..PropertyDescriptor::new(name)
                        });
                    }
                }
                (None, None) => {}
            }
        }

        for plugin in md.imports().filter(|p| can_inherit(*p, &md.mrid)) {
            let import = self.import_report(plugin, &ResolveOverrides::default(), &mut stack)?;
            report.add_import(import);
        }

        if let Some(script) = &md.script {
            let script = BuildScript::load(script, &md.mrid)?;
            self.add_script(&mut report, &script, &mut stack)?;
        }

        Ok(report)
    }

    /// Report of a published module.
    pub fn module_report(&self, mrid: &ModuleRevisionId) -> Result<EasyAntReport> {
        let mut stack = Vec::new();
        self.build_module(mrid, &ResolveOverrides::default(), &mut stack)
    }

    fn build_module(
        &self,
        mrid: &ModuleRevisionId,
        overrides: &ResolveOverrides,
        stack: &mut Vec<String>,
    ) -> Result<EasyAntReport> {
        let key = mrid.module_id().to_string();
        if stack.contains(&key) {
            let mut chain = stack.clone();
            chain.push(key);
            return Err(BuildError::CyclicImport { chain }.into());
        }

        let mut request = ResolveRequest::for_module(mrid);
        request.merge(overrides);
        let resolved = self
            .resolver
            .resolve(&request, self.options)
            .map_err(BuildError::from)
            .with_context(|| format!("failed to resolve {}", mrid))?;

        let artifact = find_script(resolved.artifacts(), mrid.module_id()).map_err(BuildError::from)?;
        let script = BuildScript::load(&artifact.local_file, &artifact.module)?;

        let mut report = EasyAntReport::new(artifact.module.clone());
        report.description = script.description.clone();

        stack.push(key);
        let added = self.add_script(&mut report, &script, stack);
        stack.pop();
        added?;

        Ok(report)
    }

    fn add_script(
        &self,
        report: &mut EasyAntReport,
        script: &BuildScript,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        let owner = script.owner.module_id().to_string();

        for phase in &script.phases {
            report.add_phase(PhaseReport {
                name: phase.name.clone(),
                description: phase.description.clone(),
                depends: phase.depends.clone(),
            });
        }

        for target in &script.targets {
            report.add_target(TargetReport {
                name: target.name.clone(),
                description: target.description.clone(),
                depends: target.depends.clone(),
                phase: target.phase.clone(),
                if_guard: target.if_guard.clone(),
                unless_guard: target.unless_guard.clone(),
            });
        }

        for param in &script.parameters {
            report.add_parameter(ParameterReport {
                name: param.name.clone(),
                kind: param.kind,
                description: param.description.clone(),
                default: param.default.clone(),
                required: param.required,
            });
            if param.kind == ParameterKind::Property {
                report.add_property(PropertyDescriptor {
                    description: param.description.clone(),
                    default: param.default.clone(),
                    required: param.required,
                    owner: Some(owner.clone()),
                    ..PropertyDescriptor::new(&param.name)
                });
            }
        }

        for prop in &script.properties {
            report.add_property(PropertyDescriptor {
                description: prop.description.clone(),
                value: Some(prop.value.clone()),
                owner: Some(owner.clone()),
                ..PropertyDescriptor::new(&prop.name)
            });
        }

        for nested in &script.imports {
            let import = self.import_report(&nested.plugin, &nested.overrides, stack)?;
            report.add_import(import);
        }

        Ok(())
    }

    fn import_report(
        &self,
        plugin: &PluginDescriptor,
        overrides: &ResolveOverrides,
        stack: &mut Vec<String>,
    ) -> Result<ImportedModuleReport> {
        let report = match self.build_module(&plugin.module, overrides, stack) {
            Ok(report) => Some(report),
            Err(err) if plugin.mandatory || is_cycle(&err) => {
                return Err(err.context(format!("failed to build the report of {}", plugin.module)))
            }
            Err(err) => {
                tracing::warn!("no report for {}: {:#}", plugin.module, err);
                None
            }
        };

        Ok(ImportedModuleReport {
            module: plugin.module.clone(),
            mode: plugin.mode,
            alias: plugin.alias.clone(),
            mandatory: plugin.mandatory,
            report,
        })
    }
}

fn is_cycle(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(
            e.downcast_ref::<BuildError>(),
            Some(BuildError::CyclicImport { .. })
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::resolver::FileRepository;
    use crate::test_support::{capture_logs, write_file, RepoBuilder};

    const BUILD_STD: &str = r#"
[script]
description = "Standard build"

[[phase]]
name = "compile"

[[phase]]
name = "package"
depends = ["compile"]

[[target]]
name = "javac"
phase = "compile"

[[parameter]]
name = "src.dir"
description = "source directory"
default = "src"

[[parameter]]
name = "compile.classpath"
kind = "path"
"#;

    const DOCS: &str = r#"
[[target]]
name = "generate"
phase = "package"

[[property]]
name = "src.dir"
value = "docs-src"

[[import]]
module = "org.acme#engine;1.0"
"#;

    const ENGINE: &str = r#"
[[target]]
name = "warmup"

[[parameter]]
name = "engine.home"
required = true
"#;

    fn repo(tmp: &TempDir) -> FileRepository {
        let repo = RepoBuilder::new(tmp.path().join("repo"));
        repo.module("org.acme", "build-std", "1.0").script(BUILD_STD).publish();
        repo.module("org.acme", "docs", "1.0").script(DOCS).publish();
        repo.module("org.acme", "engine", "1.0").script(ENGINE).publish();
        FileRepository::new(tmp.path().join("repo"), tmp.path().join("cache"))
    }

    fn app(tmp: &TempDir, plugins: &str) -> std::path::PathBuf {
        write_file(
            &tmp.path().join("app"),
            "module.toml",
            &format!(
                "[module]\norganisation = \"org.acme\"\nname = \"app\"\nrevision = \"1.0\"\n\n[[property]]\nname = \"src.dir\"\nvalue = \"main\"\n\n[build-type]\nmodule = \"org.acme#build-std;1.0\"\n\n{}",
                plugins
            ),
        )
    }

    #[test]
    fn test_descriptor_report() {
        let tmp = TempDir::new().unwrap();
        let resolver = repo(&tmp);
        let options = ResolveOptions::default();
        let path = app(&tmp, "[[plugin]]\nmodule = \"org.acme#docs;1.0\"\nas = \"docs:\"\n");

        let report = ReportBuilder::new(&resolver, &options)
            .descriptor_report(&path)
            .unwrap();

        assert_eq!(report.imports.len(), 2);
        let docs = report.imported_module_report("docs:").unwrap();
        assert_eq!(docs.module.name(), "docs");
        assert!(report.imported_module_report("engine").is_some());

        let targets: Vec<String> = report.available_targets().into_iter().map(|t| t.name).collect();
        assert_eq!(targets, vec!["javac", "docs:generate", "docs:warmup"]);
        assert_eq!(report.targets_for_phase("package", true).len(), 1);
        assert_eq!(
            report.phase_report("package", true).unwrap().depends,
            vec!["compile"]
        );

        let properties = report.available_properties();
        let src = &properties["src.dir"];
        assert_eq!(src.value.as_deref(), Some("main"));
        assert_eq!(src.description.as_deref(), Some("source directory"));
        assert_eq!(src.default.as_deref(), Some("src"));
        assert!(properties["engine.home"].required);
        assert!(!properties.contains_key("compile.classpath"));
        assert_eq!(report.available_parameters().len(), 3);
    }

    #[test]
    fn test_module_report() {
        let tmp = TempDir::new().unwrap();
        let resolver = repo(&tmp);
        let options = ResolveOptions::default();

        let report = ReportBuilder::new(&resolver, &options)
            .module_report(&"org.acme#build-std;1.0".parse().unwrap())
            .unwrap();
        assert_eq!(report.description.as_deref(), Some("Standard build"));
        assert_eq!(report.phases.len(), 2);
        assert!(report.imports.is_empty());
    }

    #[test]
    fn test_missing_optional_import() {
        let tmp = TempDir::new().unwrap();
        let resolver = repo(&tmp);
        let options = ResolveOptions::default();
        let path = app(&tmp, "[[plugin]]\nmodule = \"org.acme#missing;1.0\"\n");

        let (report, logs) = capture_logs(|| {
            ReportBuilder::new(&resolver, &options)
                .descriptor_report(&path)
                .unwrap()
        });
        let missing = report.imported_module_report("missing").unwrap();
        assert!(missing.report.is_none());
        assert!(logs.contains("no report for org.acme#missing;1.0"));
    }

    #[test]
    fn test_missing_mandatory_import() {
        let tmp = TempDir::new().unwrap();
        let resolver = repo(&tmp);
        let options = ResolveOptions::default();
        let path = app(
            &tmp,
            "[[plugin]]\nmodule = \"org.acme#missing;1.0\"\nmandatory = true\n",
        );

        let err = ReportBuilder::new(&resolver, &options)
            .descriptor_report(&path)
            .unwrap_err();
        assert!(err.to_string().contains("failed to build the report of org.acme#missing;1.0"));
    }

    #[test]
    fn test_cyclic_imports_fail_fast() {
        let tmp = TempDir::new().unwrap();
        let repo = RepoBuilder::new(tmp.path().join("repo"));
        repo.module("org.acme", "a", "1.0")
            .script("[[import]]\nmodule = \"org.acme#b;1.0\"\n")
            .publish();
        repo.module("org.acme", "b", "1.0")
            .script("[[import]]\nmodule = \"org.acme#a;1.0\"\n")
            .publish();
        let resolver = FileRepository::new(tmp.path().join("repo"), tmp.path().join("cache"));
        let options = ResolveOptions::default();

        let err = ReportBuilder::new(&resolver, &options)
            .module_report(&"org.acme#a;1.0".parse().unwrap())
            .unwrap_err();
        assert!(is_cycle(&err));
        assert!(format!("{:#}", err).contains("org.acme#a -> org.acme#b -> org.acme#a"));
    }
}
