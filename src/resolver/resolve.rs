//! ResolveReport - the outcome of one resolution.
//!
//! Once returned by a resolver a report is read-only. The module loader
//! shares one report between all deferred imports of a load pass.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::core::module_id::{ModuleId, ModuleRevisionId};
use crate::resolver::ResolveError;

/// Artifact type of build scripts.
pub const SCRIPT_TYPE: &str = "script";

/// A resolved artifact and where it lives locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Module that published the artifact
    pub module: ModuleRevisionId,
    /// Artifact type (`script`, `jar`, ...)
    pub kind: String,
    /// File extension
    pub ext: String,
    /// Artifact name
    pub name: String,
    /// Local file
    pub local_file: PathBuf,
}

impl ResolvedArtifact {
    /// Module ID of the publishing module.
    pub fn module_id(&self) -> &ModuleId {
        self.module.module_id()
    }

    /// Check if this artifact is a build script.
    pub fn is_script(&self) -> bool {
        self.kind == SCRIPT_TYPE
    }
}

/// The single script artifact `id` publishes among `artifacts`.
pub fn find_script<'a>(
    artifacts: impl IntoIterator<Item = &'a ResolvedArtifact>,
    id: &ModuleId,
) -> Result<&'a ResolvedArtifact, ResolveError> {
    let scripts: Vec<&ResolvedArtifact> = artifacts
        .into_iter()
        .filter(|a| a.is_script() && a.module_id() == id)
        .collect();
    match scripts.as_slice() {
        [script] => Ok(*script),
        [] => Err(ResolveError::NoScript {
            module: id.to_string(),
        }),
        many => Err(ResolveError::AmbiguousScript {
            module: id.to_string(),
            count: many.len(),
        }),
    }
}

/// The modules and artifacts produced by a resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    /// Module dependency graph
    graph: DiGraph<ModuleRevisionId, ()>,

    /// Map from module ID to node index
    nodes: HashMap<ModuleId, NodeIndex>,

    /// Artifacts in resolution order
    artifacts: Vec<ResolvedArtifact>,
}

impl ResolveReport {
    /// Create an empty report.
    pub fn new() -> Self {
        ResolveReport::default()
    }

    /// Add a resolved module. Returns `false` if its module ID is already present.
    pub fn add_module(&mut self, mrid: ModuleRevisionId) -> bool {
        if self.nodes.contains_key(mrid.module_id()) {
            return false;
        }
        let id = mrid.module_id().clone();
        let node = self.graph.add_node(mrid);
        self.nodes.insert(id, node);
        true
    }

    /// Record that `from` depends on `to`.
    pub fn add_edge(&mut self, from: &ModuleId, to: &ModuleId) {
        if let (Some(&from), Some(&to)) = (self.nodes.get(from), self.nodes.get(to)) {
            if !self.graph.contains_edge(from, to) {
                self.graph.add_edge(from, to, ());
            }
        }
    }

    /// Add an artifact.
    pub fn add_artifact(&mut self, artifact: ResolvedArtifact) {
        self.artifacts.push(artifact);
    }

    /// Get the resolved coordinate of a module.
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleRevisionId> {
        self.nodes.get(id).map(|&n| &self.graph[n])
    }

    /// Check if a module was resolved.
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All resolved modules.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRevisionId> {
        self.graph.node_weights()
    }

    /// All artifacts.
    pub fn artifacts(&self) -> &[ResolvedArtifact] {
        &self.artifacts
    }

    /// Artifacts published by one module.
    pub fn artifacts_of<'a>(
        &'a self,
        id: &'a ModuleId,
    ) -> impl Iterator<Item = &'a ResolvedArtifact> + 'a {
        self.artifacts.iter().filter(move |a| a.module_id() == id)
    }

    /// The module and everything it transitively depends on.
    pub fn transitive_closure(&self, id: &ModuleId) -> HashSet<ModuleId> {
        let mut closure = HashSet::new();
        if let Some(&start) = self.nodes.get(id) {
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(node) = dfs.next(&self.graph) {
                closure.insert(self.graph[node].module_id().clone());
            }
        }
        closure
    }

    /// Artifacts of a module and of its transitive dependencies.
    pub fn closure_artifacts(&self, id: &ModuleId) -> Vec<&ResolvedArtifact> {
        let closure = self.transitive_closure(id);
        self.artifacts
            .iter()
            .filter(|a| closure.contains(a.module_id()))
            .collect()
    }

    /// Number of resolved modules.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(mrid: &ModuleRevisionId, kind: &str, name: &str) -> ResolvedArtifact {
        ResolvedArtifact {
            module: mrid.clone(),
            kind: kind.to_string(),
            ext: kind.to_string(),
            name: name.to_string(),
            local_file: PathBuf::from(format!("/cache/{}.{}", name, kind)),
        }
    }

    #[test]
    fn test_closure_follows_edges() {
        let docs = ModuleRevisionId::new("org", "docs", "1.0");
        let engine = ModuleRevisionId::new("org", "engine", "2.0");
        let other = ModuleRevisionId::new("org", "other", "1.0");

        let mut report = ResolveReport::new();
        assert!(report.add_module(docs.clone()));
        assert!(report.add_module(engine.clone()));
        assert!(report.add_module(other.clone()));
        assert!(!report.add_module(docs.with_revision("9.9")));
        report.add_edge(docs.module_id(), engine.module_id());

        report.add_artifact(artifact(&docs, "script", "docs"));
        report.add_artifact(artifact(&engine, "jar", "engine"));
        report.add_artifact(artifact(&other, "jar", "other"));

        let names: Vec<_> = report
            .closure_artifacts(docs.module_id())
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["docs", "engine"]);
        assert_eq!(report.artifacts_of(engine.module_id()).count(), 1);
        assert_eq!(report.module(docs.module_id()), Some(&docs));
    }

    #[test]
    fn test_find_script() {
        let docs = ModuleRevisionId::new("org", "docs", "1.0");
        let engine = ModuleRevisionId::new("org", "engine", "2.0");
        let mut artifacts = vec![
            artifact(&docs, "jar", "docs"),
            artifact(&engine, "script", "engine"),
        ];

        let err = find_script(&artifacts, docs.module_id()).unwrap_err();
        assert!(matches!(err, ResolveError::NoScript { .. }));

        artifacts.push(artifact(&docs, "script", "docs"));
        assert_eq!(find_script(&artifacts, docs.module_id()).unwrap().name, "docs");

        artifacts.push(artifact(&docs, "script", "extra"));
        let err = find_script(&artifacts, docs.module_id()).unwrap_err();
        assert!(matches!(err, ResolveError::AmbiguousScript { count: 2, .. }));
    }

    #[test]
    fn test_unknown_module_has_empty_closure() {
        let report = ResolveReport::new();
        assert!(report.transitive_closure(&ModuleId::new("org", "x")).is_empty());
        assert!(report.is_empty());
    }
}
