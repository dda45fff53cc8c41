use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::error;

/// Normalized package name to resolved version for one environment.
pub type PackageTable = BTreeMap<String, String>;

/// Version recorded for a package inherited from a referenced environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "version")]
pub enum IgnoredVersion {
    /// Present upstream, but any version proposed downstream is accepted.
    Unconstrained,
    /// Present upstream at this exact version. An empty string is a real
    /// value (source-controlled entries) and is compared like any other.
    Pinned(String),
}

/// One package resolved to two different versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, thiserror::Error)]
pub struct VersionConflict {
    pub package: String,
    pub version: String,
    pub other: String,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} vs {})", self.package, self.version, self.other)
    }
}

/// Every conflict found in one merge or transform pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct VersionConflicts {
    pub conflicts: Vec<VersionConflict>,
}

impl VersionConflicts {
    #[must_use]
    pub fn packages(&self) -> Vec<&str> {
        self.conflicts.iter().map(|c| c.package.as_str()).collect()
    }

    pub(crate) fn log(&self) {
        for conflict in &self.conflicts {
            error!(
                "Package {} was resolved to different versions in different environments: {} and {}",
                conflict.package, conflict.version, conflict.other
            );
        }
    }
}

impl fmt::Display for VersionConflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed = self
            .conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "packages resolved to different versions in different environments: {listed}; \
             add constraints for the package versions listed"
        )
    }
}

/// Packages an environment inherits from everything it references. These are
/// left out of the environment's own output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IgnoreSet {
    entries: BTreeMap<String, IgnoredVersion>,
}

impl IgnoreSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pinned(&mut self, package: impl Into<String>, version: impl Into<String>) {
        self.entries
            .insert(package.into(), IgnoredVersion::Pinned(version.into()));
    }

    #[cfg(test)]
    pub(crate) fn insert_unconstrained(&mut self, package: impl Into<String>) {
        self.entries
            .insert(package.into(), IgnoredVersion::Unconstrained);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IgnoredVersion)> {
        self.entries.iter().map(|(name, version)| (name.as_str(), version))
    }

    /// Decide whether `package` at `version` is already provided upstream.
    ///
    /// Returns `Ok(true)` when the package is ignored and `Ok(false)` when it
    /// belongs in this environment's output. An empty `version` never
    /// conflicts.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionConflict`] when upstream pinned the package to a
    /// different version.
    pub fn check(&self, package: &str, version: &str) -> Result<bool, VersionConflict> {
        match self.entries.get(package) {
            None => Ok(false),
            Some(IgnoredVersion::Unconstrained) => Ok(true),
            Some(IgnoredVersion::Pinned(expected)) => {
                if !version.is_empty() && version != expected {
                    return Err(VersionConflict {
                        package: package.to_string(),
                        version: version.to_string(),
                        other: expected.clone(),
                    });
                }
                Ok(true)
            }
        }
    }
}

/// Union the package tables of `names`.
///
/// Names without a published table contribute nothing.
///
/// # Errors
///
/// Returns every package recorded at more than one version across the merged
/// tables.
pub fn merge_packages<'a>(
    tables: &BTreeMap<String, PackageTable>,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<IgnoreSet, VersionConflicts> {
    let mut combined: Vec<(&str, &str)> = names
        .into_iter()
        .filter_map(|name| tables.get(name))
        .flat_map(|table| table.iter().map(|(p, v)| (p.as_str(), v.as_str())))
        .collect();
    combined.sort_unstable();

    let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
    let mut conflicts = BTreeSet::new();
    for (package, version) in combined {
        match merged.get(package) {
            Some(existing) if *existing != version => {
                conflicts.insert(VersionConflict {
                    package: package.to_string(),
                    version: version.to_string(),
                    other: (*existing).to_string(),
                });
            }
            Some(_) => {}
            None => {
                merged.insert(package, version);
            }
        }
    }

    if !conflicts.is_empty() {
        let conflicts = VersionConflicts {
            conflicts: conflicts.into_iter().collect(),
        };
        conflicts.log();
        return Err(conflicts);
    }

    let mut ignore = IgnoreSet::new();
    for (package, version) in merged {
        ignore.insert_pinned(package, version);
    }
    Ok(ignore)
}
