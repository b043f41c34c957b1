//! Module identification - WHICH module (organisation + name + revision).
//!
//! A `ModuleRevisionId` is written `org#name;revision`. The revision may be
//! left out (`org#name`), in which case the repository picks the latest one.
//! A `ModuleId` is the `org#name` pair, used to match resolved artifacts and
//! to build `skip.*` property keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::BuildError;

/// Organisation and module name, without a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    organisation: String,
    name: String,
}

impl ModuleId {
    /// Create a new module ID.
    pub fn new(organisation: impl Into<String>, name: impl Into<String>) -> Self {
        ModuleId {
            organisation: organisation.into(),
            name: name.into(),
        }
    }

    /// Get the organisation.
    pub fn organisation(&self) -> &str {
        &self.organisation
    }

    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.organisation, self.name)
    }
}

/// A module coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRevisionId {
    module_id: ModuleId,
    revision: Option<String>,
}

impl ModuleRevisionId {
    /// Create a coordinate with an explicit revision.
    pub fn new(
        organisation: impl Into<String>,
        name: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        ModuleRevisionId {
            module_id: ModuleId::new(organisation, name),
            revision: Some(revision.into()),
        }
    }

    /// Create a coordinate that accepts whatever revision the repository has.
    pub fn latest(organisation: impl Into<String>, name: impl Into<String>) -> Self {
        ModuleRevisionId {
            module_id: ModuleId::new(organisation, name),
            revision: None,
        }
    }

    /// Build a coordinate from separate attributes, as found on import entries.
    ///
    /// Either `mrid` or both `organisation` and `module` must be present.
    pub fn from_parts(
        mrid: Option<&str>,
        organisation: Option<&str>,
        module: Option<&str>,
        revision: Option<&str>,
    ) -> Result<Self, BuildError> {
        if let Some(mrid) = mrid {
            return mrid.parse();
        }
        match (organisation, module) {
            (Some(org), Some(module)) => Ok(ModuleRevisionId {
                module_id: ModuleId::new(org, module),
                revision: revision.map(str::to_string),
            }),
            _ => Err(BuildError::Configuration(
                "the module coordinate must be given either as `module = \"org#name;rev\"` \
                 or with `organisation`, `name` and `revision`"
                    .to_string(),
            )),
        }
    }

    /// Get the module ID (organisation + name).
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Get the organisation.
    pub fn organisation(&self) -> &str {
        self.module_id.organisation()
    }

    /// Get the module name.
    pub fn name(&self) -> &str {
        self.module_id.name()
    }

    /// Get the revision, if pinned.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Copy of this coordinate pinned to `revision`.
    pub fn with_revision(&self, revision: impl Into<String>) -> Self {
        ModuleRevisionId {
            module_id: self.module_id.clone(),
            revision: Some(revision.into()),
        }
    }
}

impl fmt::Display for ModuleRevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{};{}", self.module_id, rev),
            None => write!(f, "{}", self.module_id),
        }
    }
}

impl FromStr for ModuleRevisionId {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            BuildError::Configuration(format!(
                "invalid module coordinate `{}` (expected `org#name;revision`)",
                s
            ))
        };

        let s = s.trim();
        let (module_part, revision) = match s.split_once(';') {
            Some((m, r)) => (m, Some(r.trim())),
            None => (s, None),
        };
        let (org, name) = module_part.split_once('#').ok_or_else(invalid)?;
        let (org, name) = (org.trim(), name.trim());

        if org.is_empty() || name.is_empty() || revision == Some("") {
            return Err(invalid());
        }

        Ok(ModuleRevisionId {
            module_id: ModuleId::new(org, name),
            revision: revision.map(str::to_string),
        })
    }
}

impl Serialize for ModuleRevisionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ModuleRevisionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_coordinate() {
        let mrid: ModuleRevisionId = "org.acme#docs;1.2".parse().unwrap();
        assert_eq!(mrid.organisation(), "org.acme");
        assert_eq!(mrid.name(), "docs");
        assert_eq!(mrid.revision(), Some("1.2"));
        assert_eq!(mrid.to_string(), "org.acme#docs;1.2");
        assert_eq!(mrid.module_id().to_string(), "org.acme#docs");
    }

    #[test]
    fn test_parse_without_revision() {
        let mrid: ModuleRevisionId = "org.acme#docs".parse().unwrap();
        assert_eq!(mrid.revision(), None);
        assert_eq!(mrid.to_string(), "org.acme#docs");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("docs".parse::<ModuleRevisionId>().is_err());
        assert!("#docs;1.0".parse::<ModuleRevisionId>().is_err());
        assert!("org#docs;".parse::<ModuleRevisionId>().is_err());
    }

    #[test]
    fn test_from_parts_requires_coordinate() {
        let err = ModuleRevisionId::from_parts(None, Some("org"), None, None).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));

        let mrid =
            ModuleRevisionId::from_parts(None, Some("org"), Some("docs"), Some("2.0")).unwrap();
        assert_eq!(mrid, ModuleRevisionId::new("org", "docs", "2.0"));
    }
}
