//! Error taxonomy for module loading.
//!
//! Every kind here is fatal to the current load. Operations in `ops` return
//! `anyhow::Result` and attach context; use `downcast_ref::<BuildError>()` to
//! recover the kind.

use std::path::Path;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::resolver::ResolveError;
use crate::util::diagnostic::Diagnostic;

/// A fatal error raised while composing a project.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Unknown or undeclared build configuration, or missing coordinate.
    #[error("{0}")]
    Configuration(String),

    /// Invalid operation on the target graph.
    #[error("{0}")]
    Graph(String),

    /// The resolution service failed or returned nothing usable.
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// Malformed descriptor or build script.
    #[error(transparent)]
    Parse(Box<ParseError>),

    /// A module coordinate repeats on the active import path.
    #[error("cyclic import detected: {}", chain.join(" -> "))]
    CyclicImport { chain: Vec<String> },
}

impl From<ParseError> for BuildError {
    fn from(err: ParseError) -> Self {
        BuildError::Parse(Box::new(err))
    }
}

impl BuildError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::Configuration(message) => Diagnostic::error(message.clone())
                .with_suggestion(
                    "Declare the configuration in `[build] configurations` of module.toml",
                )
                .with_suggestion("Check the `--conf` flag or `build.configurations` property"),

            BuildError::Graph(message) => Diagnostic::error(message.clone())
                .with_suggestion("Run `easyant describe` to see available targets and phases"),

            BuildError::Resolution(err) => err.to_diagnostic(),

            BuildError::Parse(err) => {
                let mut diag = Diagnostic::error(err.to_string()).with_location(&err.path);
                if let Some(span) = err.span {
                    diag = diag.with_context(format!("at byte offset {}", span.offset()));
                }
                diag
            }

            BuildError::CyclicImport { chain } => {
                Diagnostic::error("cyclic import detected")
                    .with_context(format!("cycle: {}", chain.join(" -> ")))
                    .with_suggestion("Remove one of the imports to break the cycle")
            }
        }
    }
}

/// A descriptor or script could not be parsed.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to parse {path}: {message}")]
#[diagnostic(code(easyant::parse))]
pub struct ParseError {
    pub path: String,
    pub message: String,
    #[source_code]
    pub src: Option<NamedSource<String>>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl ParseError {
    /// Create a parse error without source information.
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        ParseError {
            path: path.display().to_string(),
            message: message.into(),
            src: None,
            span: None,
        }
    }

    /// Wrap a TOML error, keeping the offending span for rendering.
    pub fn from_toml(path: &Path, content: &str, err: &toml::de::Error) -> Self {
        let name = path.display().to_string();
        ParseError {
            path: name.clone(),
            message: err.message().to_string(),
            src: Some(NamedSource::new(name, content.to_string())),
            span: err.span().map(SourceSpan::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_keeps_span() {
        let content = "[module]\nname = \n";
        let err = toml::from_str::<toml::Value>(content).unwrap_err();
        let parse = ParseError::from_toml(Path::new("module.toml"), content, &err);

        assert!(parse.span.is_some());
        assert!(parse.to_string().contains("module.toml"));
    }

    #[test]
    fn test_configuration_diagnostic() {
        let err = BuildError::Configuration("unknown build configuration named qa".to_string());
        let output = err.to_diagnostic().format(false);

        assert!(output.contains("error: unknown build configuration named qa"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_cycle_message() {
        let err = BuildError::CyclicImport {
            chain: vec!["a#a".into(), "b#b".into(), "a#a".into()],
        };
        assert_eq!(err.to_string(), "cyclic import detected: a#a -> b#b -> a#a");
    }
}
