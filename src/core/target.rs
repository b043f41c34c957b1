//! Targets and phases of the live target graph.
//!
//! A phase (extension point) is a target that exists to aggregate other
//! targets through its `depends` list. Plain targets do the work.

use serde::Serialize;

/// Whether a target is a plain target or a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Target,
    Phase,
}

/// A target definition as declared in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Target name (prefixed with `alias.` when included)
    pub name: String,

    /// Plain target or phase
    pub kind: TargetKind,

    /// Targets that must run before this one
    pub depends: Vec<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Only run when this property is set
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_guard: Option<String>,

    /// Skip when this property is set
    #[serde(rename = "unless", skip_serializing_if = "Option::is_none")]
    pub unless_guard: Option<String>,

    /// Module that declared it (`org#name`), if imported from a script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Target {
    /// Create a plain target.
    pub fn new(name: impl Into<String>) -> Self {
        Target {
            name: name.into(),
            kind: TargetKind::Target,
            depends: Vec::new(),
            description: None,
            if_guard: None,
            unless_guard: None,
            owner: None,
        }
    }

    /// Create a phase.
    pub fn phase(name: impl Into<String>) -> Self {
        Target {
            kind: TargetKind::Phase,
            ..Target::new(name)
        }
    }

    /// Set the dependency list.
    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the `if` guard.
    pub fn with_if(mut self, property: impl Into<String>) -> Self {
        self.if_guard = Some(property.into());
        self
    }

    /// Set the `unless` guard.
    pub fn with_unless(mut self, property: impl Into<String>) -> Self {
        self.unless_guard = Some(property.into());
        self
    }

    /// Set the owning module.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Check if this target is a phase.
    pub fn is_phase(&self) -> bool {
        self.kind == TargetKind::Phase
    }

    /// Check if this target depends directly on `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.depends.iter().any(|d| d == name)
    }

    /// Copy of this definition with `name` removed from `depends`.
    ///
    /// The remaining dependencies keep their relative order.
    pub fn without_dependency(&self, name: &str) -> Target {
        Target {
            depends: self
                .depends
                .iter()
                .filter(|d| d.as_str() != name)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Copy of this definition with `name` appended to `depends`.
    pub fn with_dependency(&self, name: &str) -> Target {
        let mut target = self.clone();
        target.depends.push(name.to_string());
        target
    }
}
