//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error raised by a module resolution service.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("module not found: `{module}`")]
    ModuleNotFound { module: String, location: PathBuf },

    #[error("module `{module}` is not in the cache and offline mode is on")]
    NotInCache { module: String },

    #[error("artifact `{artifact}` of `{module}` is missing at {}", path.display())]
    MissingArtifact {
        module: String,
        artifact: String,
        path: PathBuf,
    },

    #[error("invalid module metadata at {}: {message}", path.display())]
    InvalidMetadata { path: PathBuf, message: String },

    #[error("no script artifact found for `{module}`")]
    NoScript { module: String },

    #[error("`{module}` publishes {count} script artifacts, expected exactly one")]
    AmbiguousScript { module: String, count: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resolution failed: {0}")]
    Failed(String),
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ModuleNotFound { module, location } => {
                Diagnostic::error(format!("could not find module `{}`", module))
                    .with_context(format!("searched {}", location.display()))
                    .with_suggestion("Check that the organisation, name and revision are spelled correctly")
                    .with_suggestion("Check the `[repository] path` setting")
            }

            ResolveError::NotInCache { module } => {
                Diagnostic::error(format!("`{}` is not available offline", module))
                    .with_suggestion("Run once without `--offline` to populate the cache")
            }

            ResolveError::MissingArtifact {
                module,
                artifact,
                path,
            } => Diagnostic::error(format!("artifact `{}` of `{}` is missing", artifact, module))
                .with_location(path)
                .with_suggestion("Republish the module or fix its `[[artifact]]` list"),

            ResolveError::NoScript { module } | ResolveError::AmbiguousScript { module, .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(format!(
                    "Publish exactly one artifact with type = \"script\" in `{}`",
                    module
                ))
            }

            ResolveError::InvalidMetadata { path, .. } => {
                Diagnostic::error(self.to_string()).with_location(path)
            }

            ResolveError::Io { .. } | ResolveError::Failed(_) => Diagnostic::error(self.to_string()),
        }
    }
}
