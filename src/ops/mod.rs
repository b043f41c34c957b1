//! High-level operations.
//!
//! This module contains the composition steps the CLI commands drive:
//! loading a module, importing plugins and binding targets to phases.

pub mod bind;
pub mod context;
pub mod import;
pub mod load_module;

pub use bind::{apply_mapping, bind_target};
pub use context::BuildContext;
pub use import::{
    artifact_property, classpath_reference, declare_script, import_deferred, import_module,
    skip_requested, ImportOutcome, ImportSpec,
};
pub use load_module::ModuleLoader;
