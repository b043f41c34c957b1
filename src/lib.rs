//! easyant - plugin and build-type composition for a target-based build tool
//!
//! This crate loads a module descriptor into a project: it gates items on
//! build configurations, resolves and imports build types and plugins, binds
//! targets to phases, and builds introspection reports of the result.

pub mod core;
pub mod ops;
pub mod report;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for easyant unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording resolver, log capture and
/// repository fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{BuildError, ModuleDescriptor, ModuleId, ModuleRevisionId, Project};
pub use ops::{BuildContext, ModuleLoader};
pub use report::{EasyAntReport, ReportBuilder};
pub use resolver::{FileRepository, ModuleResolver};
pub use util::context::GlobalContext;
