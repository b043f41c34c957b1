//! Build configuration ("buildconf") activation.
//!
//! Properties, imports and extension-point mappings may be gated on a
//! comma-separated list of build configurations. A gated item is active when
//! one of its configurations is active in the project. The names it uses must
//! all be declared by the module.

use crate::core::error::BuildError;

/// Property holding the module's declared (available) configurations.
pub const AVAILABLE_CONFS_PROPERTY: &str = "available.build.configurations";

/// Property holding the configurations requested for this build.
pub const ACTIVE_CONFS_PROPERTY: &str = "build.configurations";

/// Property holding the active configurations the module actually declares.
pub const MAIN_CONFS_PROPERTY: &str = "main.confs";

/// Split a comma-separated configuration list.
///
/// Whitespace is trimmed and empty segments are dropped.
pub fn split_confs(csv: &str) -> Vec<&str> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Return the first configuration of `a`, in declaration order, that is also in `b`.
pub fn first_match<'a>(a: &'a str, b: &str) -> Option<&'a str> {
    let b = split_confs(b);
    split_confs(a).into_iter().find(|conf| b.contains(conf))
}

/// Check whether an item gated on `requested` is active.
///
/// `requested == None` means the item is unconstrained.
pub fn is_active(
    requested: Option<&str>,
    available: Option<&str>,
    active: Option<&str>,
) -> Result<bool, BuildError> {
    let Some(requested) = requested else {
        return Ok(true);
    };

    let Some(available) = available else {
        return Err(BuildError::Configuration(format!(
            "no available build configuration declared, but `{}` was requested",
            requested
        )));
    };

    let declared = split_confs(available);
    for conf in split_confs(requested) {
        if !declared.contains(&conf) {
            return Err(BuildError::Configuration(format!(
                "unknown build configuration named {}",
                conf
            )));
        }
    }

    Ok(active.is_some_and(|active| first_match(requested, active).is_some()))
}

/// Check that every name in `requested` is declared in `available`.
///
/// Used at parse time so a typo in a `conf` attribute fails early even when
/// the item would have been gated off.
pub fn validate(requested: &str, available: Option<&str>) -> Result<(), BuildError> {
    is_active(Some(requested), available, None).map(|_| ())
}

/// Intersection of `active` with `available`, in `active` order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MainConfs {
    /// Active configurations the module declares.
    pub confs: Vec<String>,
    /// Active configurations the module does not declare.
    pub missing: Vec<String>,
}

impl MainConfs {
    /// Compute the main configurations of a module.
    pub fn compute(available: &str, active: &str) -> Self {
        let declared = split_confs(available);
        let mut result = MainConfs::default();

        for conf in split_confs(active) {
            if declared.contains(&conf) {
                if !result.confs.iter().any(|c| c == conf) {
                    result.confs.push(conf.to_string());
                }
            } else {
                result.missing.push(conf.to_string());
            }
        }

        result
    }

    /// The configurations as a comma-separated list.
    pub fn to_csv(&self) -> String {
        self.confs.join(",")
    }
}
