//! Core data structures.
//!
//! This module contains the foundational types of module composition:
//! - Module coordinates (ModuleId, ModuleRevisionId)
//! - The build-configuration gate
//! - Module descriptors and build scripts
//! - The live project graph

pub mod buildconf;
pub mod descriptor;
pub mod error;
pub mod module_id;
pub mod project;
pub mod script;
pub mod target;

pub use descriptor::{
    can_inherit, ExtensionPointMapping, ImportMode, InheritScope, InheritableItem,
    ModuleDescriptor, PluginDescriptor, PropertyDeclaration, DESCRIPTOR_NAME,
};
pub use error::{BuildError, ParseError};
pub use module_id::{ModuleId, ModuleRevisionId};
pub use project::Project;
pub use script::BuildScript;
pub use target::Target;
