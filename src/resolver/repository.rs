//! File repository - modules published as directories.
//!
//! Layout: `<root>/<organisation>/<module>/<revision>/module.toml`. Besides
//! the build sections, a published `module.toml` lists the module's
//! artifacts and dependencies:
//!
//! ```toml
//! [module]
//! organisation = "org.acme"
//! name = "docs"
//! revision = "1.0"
//!
//! [[artifact]]
//! name = "docs"
//! type = "script"
//! ext = "toml"
//! file = "docs.script.toml"   # defaults to <name>.<ext>
//!
//! [[dependency]]
//! module = "org.acme#markdown;2.0"
//! ```
//!
//! Resolved artifacts are copied into a cache with the same layout. In
//! cache-only mode the repository root is never read.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::descriptor::DESCRIPTOR_NAME;
use crate::core::module_id::{ModuleId, ModuleRevisionId};
use crate::resolver::{
    DependencySpec, ModuleResolver, ResolveError, ResolveLogLevel, ResolveOptions, ResolveReport,
    ResolveRequest, ResolvedArtifact,
};

/// A repository rooted at a directory, with a download cache.
#[derive(Debug, Clone)]
pub struct FileRepository {
    /// Repository root
    root: PathBuf,

    /// Cache directory
    cache: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    module: RawMetadataModule,

    #[serde(default, rename = "artifact")]
    artifacts: Vec<RawArtifact>,

    #[serde(default, rename = "dependency")]
    dependencies: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawMetadataModule {
    organisation: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawArtifact {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    file: Option<String>,
}

impl RawArtifact {
    fn ext(&self) -> String {
        match &self.ext {
            Some(ext) => ext.clone(),
            None if self.kind == crate::resolver::SCRIPT_TYPE => "toml".to_string(),
            None => self.kind.clone(),
        }
    }

    fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.name, self.ext()))
    }
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    module: ModuleRevisionId,
    #[serde(default = "default_true")]
    transitive: bool,
}

fn default_true() -> bool {
    true
}

impl FileRepository {
    /// Create a repository over `root`, caching into `cache`.
    pub fn new(root: impl Into<PathBuf>, cache: impl Into<PathBuf>) -> Self {
        FileRepository {
            root: root.into(),
            cache: cache.into(),
        }
    }

    /// Get the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the cache directory.
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    /// Find the directory of a module revision.
    fn locate(
        &self,
        mrid: &ModuleRevisionId,
        options: &ResolveOptions,
    ) -> Result<(ModuleRevisionId, PathBuf), ResolveError> {
        let base = if options.use_cache_only {
            &self.cache
        } else {
            &self.root
        };
        let module_dir = base.join(mrid.organisation()).join(mrid.name());

        let revision = match mrid.revision() {
            Some(rev) => Some(rev.to_string()),
            None => latest_revision(&module_dir)?,
        };

        let found = revision
            .map(|rev| (mrid.with_revision(&rev), module_dir.join(rev)))
            .filter(|(_, dir)| dir.join(DESCRIPTOR_NAME).is_file());

        match found {
            Some(found) => Ok(found),
            None if options.use_cache_only => Err(ResolveError::NotInCache {
                module: mrid.to_string(),
            }),
            None => Err(ResolveError::ModuleNotFound {
                module: mrid.to_string(),
                location: module_dir,
            }),
        }
    }

    fn cache_dir(&self, mrid: &ModuleRevisionId) -> PathBuf {
        let mut dir = self.cache.join(mrid.organisation()).join(mrid.name());
        if let Some(rev) = mrid.revision() {
            dir = dir.join(rev);
        }
        dir
    }

    /// Copy a file into the cache unless the cache is the source.
    fn cache_file(
        &self,
        mrid: &ModuleRevisionId,
        src: &Path,
        file_name: &str,
        options: &ResolveOptions,
    ) -> Result<PathBuf, ResolveError> {
        if options.use_cache_only {
            return Ok(src.to_path_buf());
        }

        let dest = self.cache_dir(mrid).join(file_name);
        if dest == src {
            return Ok(dest);
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ResolveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(src, &dest).map_err(|source| ResolveError::Io {
            path: src.to_path_buf(),
            source,
        })?;

        if options.log != ResolveLogLevel::Quiet {
            tracing::info!("  copied {} [{}]", file_name, mrid);
        }
        Ok(dest)
    }

    fn read_metadata(
        &self,
        mrid: &ModuleRevisionId,
        dir: &Path,
    ) -> Result<RawMetadata, ResolveError> {
        let path = dir.join(DESCRIPTOR_NAME);
        let content = std::fs::read_to_string(&path).map_err(|source| ResolveError::Io {
            path: path.clone(),
            source,
        })?;
        let meta: RawMetadata =
            toml::from_str(&content).map_err(|e| ResolveError::InvalidMetadata {
                path: path.clone(),
                message: e.message().to_string(),
            })?;

        if meta.module.organisation != mrid.organisation() || meta.module.name != mrid.name() {
            return Err(ResolveError::InvalidMetadata {
                path,
                message: format!(
                    "expected module {}, found {}#{}",
                    mrid.module_id(),
                    meta.module.organisation,
                    meta.module.name
                ),
            });
        }
        Ok(meta)
    }

    fn fetch(
        &self,
        mrid: &ModuleRevisionId,
        dir: &Path,
        meta: &RawMetadata,
        options: &ResolveOptions,
    ) -> Result<Vec<ResolvedArtifact>, ResolveError> {
        let descriptor = dir.join(DESCRIPTOR_NAME);
        self.cache_file(mrid, &descriptor, DESCRIPTOR_NAME, options)?;

        let mut artifacts = Vec::with_capacity(meta.artifacts.len());
        for raw in &meta.artifacts {
            let file_name = raw.file_name();
            let src = dir.join(&file_name);
            if !src.is_file() {
                return Err(ResolveError::MissingArtifact {
                    module: mrid.to_string(),
                    artifact: raw.name.clone(),
                    path: src,
                });
            }

            let local_file = self.cache_file(mrid, &src, &file_name, options)?;
            artifacts.push(ResolvedArtifact {
                module: mrid.clone(),
                kind: raw.kind.clone(),
                ext: raw.ext(),
                name: raw.name.clone(),
                local_file,
            });
        }
        Ok(artifacts)
    }
}

impl ModuleResolver for FileRepository {
    fn resolve(
        &self,
        request: &ResolveRequest,
        options: &ResolveOptions,
    ) -> Result<ResolveReport, ResolveError> {
        let mut report = ResolveReport::new();
        let mut queue: VecDeque<(Option<ModuleId>, DependencySpec)> = request
            .dependencies
            .iter()
            .map(|dep| (None, dep.clone()))
            .collect();

        if options.log == ResolveLogLevel::Default {
            tracing::info!("resolving {}", request.caller);
        }

        while let Some((parent, dep)) = queue.pop_front() {
            let mrid = request.pin(&dep.module);
            let id = mrid.module_id().clone();

            if parent.is_some() && request.is_excluded(&id) {
                tracing::debug!("excluding {} from {}", mrid, request.caller);
                continue;
            }

            if let Some(existing) = report.module(&id).cloned() {
                if mrid.revision().is_some() && mrid.revision() != existing.revision() {
                    tracing::warn!(
                        "{} requested, keeping already resolved {}",
                        mrid,
                        existing
                    );
                }
                if let Some(parent) = &parent {
                    report.add_edge(parent, &id);
                }
                continue;
            }

            let (resolved, dir) = self.locate(&mrid, options)?;
            let meta = self.read_metadata(&resolved, &dir)?;
            let artifacts = self.fetch(&resolved, &dir, &meta, options)?;

            if options.log == ResolveLogLevel::Default {
                tracing::info!("  found {}", resolved);
            } else {
                tracing::debug!("found {}", resolved);
            }

            report.add_module(resolved);
            if let Some(parent) = &parent {
                report.add_edge(parent, &id);
            }
            for artifact in artifacts {
                report.add_artifact(artifact);
            }

            if dep.transitive {
                for child in meta.dependencies {
                    queue.push_back((
                        Some(id.clone()),
                        DependencySpec {
                            module: child.module,
                            transitive: child.transitive,
                        },
                    ));
                }
            }
        }

        Ok(report)
    }

    fn find_descriptor(
        &self,
        mrid: &ModuleRevisionId,
        options: &ResolveOptions,
    ) -> Result<PathBuf, ResolveError> {
        let (resolved, dir) = self.locate(mrid, options)?;
        self.cache_file(&resolved, &dir.join(DESCRIPTOR_NAME), DESCRIPTOR_NAME, options)
    }
}

/// Pick the highest revision directory of a module.
fn latest_revision(module_dir: &Path) -> Result<Option<String>, ResolveError> {
    if !module_dir.is_dir() {
        return Ok(None);
    }
    let entries = std::fs::read_dir(module_dir).map_err(|source| ResolveError::Io {
        path: module_dir.to_path_buf(),
        source,
    })?;

    let mut revisions: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    revisions.sort_by(|a, b| compare_revisions(a, b));
    Ok(revisions.pop())
}

/// Compare revisions segment by segment, numerically where possible.
fn compare_revisions(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        s.split(['.', '-'])
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    let (a, b) = (split(a), split(b));

    for (x, y) in a.iter().zip(b.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
