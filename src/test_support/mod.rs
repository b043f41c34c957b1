//! Test utilities and mocks for easyant unit tests.
//!
//! This module provides a recording mock of the resolution service, log
//! capture for asserting on `tracing` output, and fixture writers for
//! repositories, scripts and artifacts.
//!
//! # Example
//!
//! ```rust,ignore
//! use easyant::test_support::{capture_logs, RecordingResolver};
//!
//! #[test]
//! fn test_example() {
//!     let resolver = RecordingResolver::new().with_report(report);
//!     let calls = resolver.calls();
//!     let mut ctx = BuildContext::new(Project::new("/work"), Arc::new(resolver));
//!
//!     let (outcome, logs) = capture_logs(|| import_module(&mut ctx, &spec));
//!     assert_eq!(calls.lock().unwrap().len(), 1);
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::core::module_id::{ModuleId, ModuleRevisionId};
use crate::resolver::{ModuleResolver, ResolveError, ResolveOptions, ResolveReport, ResolveRequest};

pub use fixtures::*;

/// Mock resolution service.
///
/// Every request is recorded and answered with the same configured report
/// (or the configured failure). Descriptors are looked up in a fixed map.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    report: ResolveReport,
    failure: Option<String>,
    descriptors: HashMap<ModuleId, PathBuf>,
    calls: Arc<Mutex<Vec<ResolveRequest>>>,
}

impl RecordingResolver {
    /// Create a resolver answering every request with an empty report.
    pub fn new() -> Self {
        RecordingResolver::default()
    }

    /// Create a resolver failing every request.
    pub fn failing(message: impl Into<String>) -> Self {
        RecordingResolver {
            failure: Some(message.into()),
            ..RecordingResolver::default()
        }
    }

    /// Answer every request with `report`.
    pub fn with_report(mut self, report: ResolveReport) -> Self {
        self.report = report;
        self
    }

    /// Register the descriptor file of a module.
    pub fn with_descriptor(mut self, mrid: &ModuleRevisionId, path: impl Into<PathBuf>) -> Self {
        self.descriptors.insert(mrid.module_id().clone(), path.into());
        self
    }

    /// Handle on the recorded requests, usable after the resolver is moved.
    pub fn calls(&self) -> Arc<Mutex<Vec<ResolveRequest>>> {
        Arc::clone(&self.calls)
    }
}

impl ModuleResolver for RecordingResolver {
    fn resolve(
        &self,
        request: &ResolveRequest,
        _options: &ResolveOptions,
    ) -> Result<ResolveReport, ResolveError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.failure {
            Some(message) => Err(ResolveError::Failed(message.clone())),
            None => Ok(self.report.clone()),
        }
    }

    fn find_descriptor(
        &self,
        mrid: &ModuleRevisionId,
        _options: &ResolveOptions,
    ) -> Result<PathBuf, ResolveError> {
        self.descriptors
            .get(mrid.module_id())
            .cloned()
            .ok_or_else(|| ResolveError::ModuleNotFound {
                module: mrid.to_string(),
                location: PathBuf::from("<mock>"),
            })
    }
}

/// Shared in-memory log sink.
#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a debug-level subscriber and return what it logged.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_resolver() {
        let resolver = RecordingResolver::new();
        let calls = resolver.calls();
        let request = ResolveRequest::for_module(&ModuleRevisionId::new("org", "a", "1"));

        let report = resolver.resolve(&request, &ResolveOptions::default()).unwrap();
        assert!(report.is_empty());
        assert_eq!(calls.lock().unwrap().as_slice(), &[request]);
    }

    #[test]
    fn test_failing_resolver() {
        let resolver = RecordingResolver::failing("boom");
        let request = ResolveRequest::for_module(&ModuleRevisionId::new("org", "a", "1"));
        let err = resolver.resolve(&request, &ResolveOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "resolution failed: boom");
    }

    #[test]
    fn test_capture_logs() {
        let (value, logs) = capture_logs(|| {
            tracing::debug!("hidden detail");
            tracing::warn!("visible warning");
            42
        });
        assert_eq!(value, 42);
        assert!(logs.contains("hidden detail"));
        assert!(logs.contains("WARN"));
    }
}
