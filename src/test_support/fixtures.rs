//! Test fixtures for common test scenarios.
//!
//! [`RepoBuilder`] publishes modules into a directory laid out the way
//! [`FileRepository`](crate::resolver::FileRepository) reads it.
//! [`ScriptFixture`] writes loose scripts and artifacts and hands back the
//! [`ResolvedArtifact`]s a resolver would report for them.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::module_id::ModuleRevisionId;
use crate::resolver::{ResolvedArtifact, SCRIPT_TYPE};

/// Write `content` to `dir/rel`, creating parent directories.
pub fn write_file(dir: &Path, rel: impl AsRef<Path>, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// A file repository under construction.
#[derive(Debug, Clone)]
pub struct RepoBuilder {
    root: PathBuf,
}

impl RepoBuilder {
    /// Create a builder publishing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        std::fs::create_dir_all(&root).unwrap();
        RepoBuilder { root }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a module revision.
    pub fn module(&self, organisation: &str, name: &str, revision: &str) -> ModuleBuilder {
        ModuleBuilder {
            dir: self.root.join(organisation).join(name).join(revision),
            organisation: organisation.to_string(),
            name: name.to_string(),
            revision: revision.to_string(),
            sections: String::new(),
            artifacts: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct ArtifactFixture {
    name: String,
    kind: String,
    ext: String,
    file: String,
    content: String,
}

/// One module revision to publish.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    dir: PathBuf,
    organisation: String,
    name: String,
    revision: String,
    sections: String,
    artifacts: Vec<ArtifactFixture>,
    dependencies: Vec<String>,
}

impl ModuleBuilder {
    /// Publish a build script named after the module.
    pub fn script(mut self, content: &str) -> Self {
        self.artifacts.push(ArtifactFixture {
            name: self.name.clone(),
            kind: SCRIPT_TYPE.to_string(),
            ext: "toml".to_string(),
            file: format!("{}.script.toml", self.name),
            content: content.to_string(),
        });
        self
    }

    /// Publish a jar.
    pub fn jar(self, name: &str) -> Self {
        self.artifact(name, "jar", "jar")
    }

    /// Publish an artifact of any type.
    pub fn artifact(mut self, name: &str, kind: &str, ext: &str) -> Self {
        self.artifacts.push(ArtifactFixture {
            name: name.to_string(),
            kind: kind.to_string(),
            ext: ext.to_string(),
            file: format!("{}.{}", name, ext),
            content: format!("{} {}", kind, name),
        });
        self
    }

    /// Add a dependency (`org#name;rev`).
    pub fn depends_on(mut self, mrid: &str) -> Self {
        self.dependencies.push(mrid.to_string());
        self
    }

    /// Add raw descriptor sections (`[build]`, `[[property]]`, ...).
    pub fn descriptor(mut self, sections: &str) -> Self {
        self.sections.push_str(sections);
        self.sections.push('\n');
        self
    }

    /// Write the module and return its directory.
    pub fn publish(self) -> PathBuf {
        let mut toml = format!(
            "[module]\norganisation = \"{}\"\nname = \"{}\"\nrevision = \"{}\"\n\n{}",
            self.organisation, self.name, self.revision, self.sections
        );

        for artifact in &self.artifacts {
            toml.push_str(&format!(
                "\n[[artifact]]\nname = \"{}\"\ntype = \"{}\"\next = \"{}\"\nfile = \"{}\"\n",
                artifact.name, artifact.kind, artifact.ext, artifact.file
            ));
            write_file(&self.dir, &artifact.file, &artifact.content);
        }
        for dep in &self.dependencies {
            toml.push_str(&format!("\n[[dependency]]\nmodule = \"{}\"\n", dep));
        }

        write_file(&self.dir, "module.toml", &toml);
        self.dir
    }
}

/// Loose scripts and artifacts in a temporary directory.
#[derive(Debug)]
pub struct ScriptFixture {
    dir: TempDir,
}

impl ScriptFixture {
    pub fn new() -> Self {
        ScriptFixture {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn module_dir(&self, mrid: &ModuleRevisionId) -> PathBuf {
        self.dir.path().join(mrid.organisation()).join(mrid.name())
    }

    /// Write a build script published by `mrid`.
    pub fn script(&self, mrid: &ModuleRevisionId, name: &str, content: &str) -> ResolvedArtifact {
        let local_file = write_file(
            &self.module_dir(mrid),
            format!("{}.script.toml", name),
            content,
        );
        ResolvedArtifact {
            module: mrid.clone(),
            kind: SCRIPT_TYPE.to_string(),
            ext: "toml".to_string(),
            name: name.to_string(),
            local_file,
        }
    }

    /// Write an artifact whose type equals its extension.
    pub fn artifact(&self, mrid: &ModuleRevisionId, name: &str, ext: &str) -> ResolvedArtifact {
        let local_file = write_file(
            &self.module_dir(mrid),
            format!("{}.{}", name, ext),
            name,
        );
        ResolvedArtifact {
            module: mrid.clone(),
            kind: ext.to_string(),
            ext: ext.to_string(),
            name: name.to_string(),
            local_file,
        }
    }
}

impl Default for ScriptFixture {
    fn default() -> Self {
        Self::new()
    }
}
