use glob::Pattern;
use tracing::debug;

use super::continuation::{join_continuations, MalformedArtifact};
use super::line::{parse_line, ParsedLine, PinStrength};
use super::normalize_package_name;
use crate::environment::{IgnoreSet, PackageTable, VersionConflict, VersionConflicts};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Malformed(#[from] MalformedArtifact),
    #[error(transparent)]
    Conflict(#[from] VersionConflicts),
}

/// Per-environment pin rules.
#[derive(Debug, Clone, Default)]
pub struct PinPolicy {
    soft_patterns: Vec<Pattern>,
    forbid_post: bool,
}

impl PinPolicy {
    #[must_use]
    pub fn new(soft_patterns: Vec<Pattern>, forbid_post: bool) -> Self {
        Self {
            soft_patterns,
            forbid_post,
        }
    }

    /// Soft pin when the lower-cased package name matches any soft pattern.
    #[must_use]
    pub fn strength(&self, package: &str) -> PinStrength {
        let lowered = package.to_lowercase();
        if self
            .soft_patterns
            .iter()
            .any(|pattern| pattern.matches(&lowered))
        {
            PinStrength::Soft
        } else {
            PinStrength::Hard
        }
    }

    #[must_use]
    pub fn forbids_post(&self) -> bool {
        self.forbid_post
    }
}

/// Rewrites the resolver output of one environment and records the
/// packages it ends up owning.
pub struct LineTransformer<'a> {
    policy: &'a PinPolicy,
    ignore: &'a IgnoreSet,
    packages: PackageTable,
}

impl<'a> LineTransformer<'a> {
    #[must_use]
    pub fn new(policy: &'a PinPolicy, ignore: &'a IgnoreSet) -> Self {
        Self {
            policy,
            ignore,
            packages: PackageTable::new(),
        }
    }

    /// Rewrite one logical line.
    ///
    /// Returns `Ok(None)` when the package is already provided by a referenced
    /// environment. Lines outside the dependency grammar are returned trimmed
    /// and otherwise untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionConflict`] when a referenced environment pinned the
    /// package to a different version.
    pub fn transform(&mut self, line: &str) -> Result<Option<String>, VersionConflict> {
        let parsed = parse_line(line);
        let Some((package, version)) = parsed.package_version() else {
            return Ok(Some(line.trim().to_string()));
        };
        let key = normalize_package_name(package);
        if self.ignore.check(&key, version)? {
            debug!(package = %key, "provided by a referenced environment");
            return Ok(None);
        }
        self.packages.insert(key, version.to_string());

        let rendered = match parsed {
            ParsedLine::Pinned(mut pin) => {
                let strength = self.policy.strength(&pin.package);
                if self.policy.forbids_post() || strength == PinStrength::Soft {
                    pin.drop_post();
                }
                pin.render(strength)
            }
            ParsedLine::SourceControlled(vcs) => vcs.render(),
            ParsedLine::Unrecognized => line.trim().to_string(),
        };
        Ok(Some(rendered))
    }

    /// Join continuations in `contents` and rewrite every logical line,
    /// dropping the ones provided upstream.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Malformed`] when the output ends inside a
    /// continuation, or [`TransformError::Conflict`] listing every package
    /// that disagrees with a referenced environment.
    pub fn transform_all(&mut self, contents: &str) -> Result<Vec<String>, TransformError> {
        let mut lines = Vec::new();
        let mut conflicts = Vec::new();
        for line in join_continuations(contents)? {
            match self.transform(&line) {
                Ok(Some(rendered)) => lines.push(rendered),
                Ok(None) => {}
                Err(conflict) => conflicts.push(conflict),
            }
        }
        if !conflicts.is_empty() {
            let conflicts = VersionConflicts { conflicts };
            conflicts.log();
            return Err(conflicts.into());
        }
        Ok(lines)
    }

    #[must_use]
    pub fn packages(&self) -> &PackageTable {
        &self.packages
    }

    #[must_use]
    pub fn into_packages(self) -> PackageTable {
        self.packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soft(patterns: &[&str], forbid_post: bool) -> PinPolicy {
        PinPolicy::new(
            patterns
                .iter()
                .map(|p| Pattern::new(p).expect("valid pattern"))
                .collect(),
            forbid_post,
        )
    }

    #[test]
    fn forbidden_post_release_is_stripped_but_recorded_in_full() -> anyhow::Result<()> {
        let policy = soft(&[], true);
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let line = transformer.transform("pkg==1.0.post5")?;
        assert_eq!(line.as_deref(), Some("pkg==1.0"));
        assert_eq!(
            transformer.packages().get("pkg").map(String::as_str),
            Some("1.0.post5")
        );
        Ok(())
    }

    #[test]
    fn post_release_kept_when_allowed() -> anyhow::Result<()> {
        let policy = soft(&[], false);
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        assert_eq!(
            transformer.transform("pkg==1.0.post5")?.as_deref(),
            Some("pkg==1.0.post5")
        );
        Ok(())
    }

    #[test]
    fn soft_pinned_packages_use_compatible_release_without_post() -> anyhow::Result<()> {
        let policy = soft(&["mycorp-*"], false);
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        assert_eq!(
            transformer.transform("MyCorp-Utils==2.1.post3")?.as_deref(),
            Some("MyCorp-Utils~=2.1")
        );
        assert_eq!(
            transformer.transform("requests==2.31.0")?.as_deref(),
            Some("requests==2.31.0")
        );
        Ok(())
    }

    #[test]
    fn ignored_package_at_same_version_is_dropped() -> anyhow::Result<()> {
        let policy = PinPolicy::default();
        let mut ignore = IgnoreSet::new();
        ignore.insert_pinned("pkg", "2.0");
        let mut transformer = LineTransformer::new(&policy, &ignore);
        assert_eq!(transformer.transform("pkg==2.0  # via test")?, None);
        assert!(transformer.packages().is_empty());
        Ok(())
    }

    #[test]
    fn ignored_package_matches_across_spellings() -> anyhow::Result<()> {
        let policy = PinPolicy::default();
        let mut ignore = IgnoreSet::new();
        ignore.insert_pinned("zope-interface", "5.0");
        let mut transformer = LineTransformer::new(&policy, &ignore);
        assert_eq!(transformer.transform("Zope.Interface==5.0")?, None);
        Ok(())
    }

    #[test]
    fn ignored_package_at_other_version_conflicts() {
        let policy = PinPolicy::default();
        let mut ignore = IgnoreSet::new();
        ignore.insert_pinned("pkg", "2.0");
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let err = transformer
            .transform_all("flask==2.0\npkg==3.0\n")
            .expect_err("conflict");
        let TransformError::Conflict(conflicts) = err else {
            panic!("expected a version conflict");
        };
        assert_eq!(
            conflicts.conflicts,
            vec![VersionConflict {
                package: "pkg".into(),
                version: "3.0".into(),
                other: "2.0".into(),
            }]
        );
    }

    #[test]
    fn every_disagreeing_line_is_reported() {
        let policy = PinPolicy::default();
        let mut ignore = IgnoreSet::new();
        ignore.insert_pinned("pkg", "2.0");
        ignore.insert_pinned("six", "1.15.0");
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let err = transformer
            .transform_all("pkg==3.0\nflask==2.0\nsix==1.16.0\n")
            .expect_err("conflicts");
        let TransformError::Conflict(conflicts) = err else {
            panic!("expected version conflicts");
        };
        assert_eq!(conflicts.packages(), vec!["pkg", "six"]);
        assert_eq!(
            conflicts.conflicts[1],
            VersionConflict {
                package: "six".into(),
                version: "1.16.0".into(),
                other: "1.15.0".into(),
            }
        );
    }

    #[test]
    fn unconstrained_ignore_entry_disables_conflict_detection() -> anyhow::Result<()> {
        let policy = PinPolicy::default();
        let mut ignore = IgnoreSet::new();
        ignore.insert_unconstrained("pkg");
        let mut transformer = LineTransformer::new(&policy, &ignore);
        assert_eq!(transformer.transform("pkg==3.0")?, None);
        Ok(())
    }

    #[test]
    fn vcs_entries_record_empty_version_and_drop_editable() -> anyhow::Result<()> {
        let policy = soft(&["*"], true);
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let line = transformer
            .transform("-e git+https://github.com/org/tool.git@main#egg=tool  # via app")?;
        assert_eq!(
            line.as_deref(),
            Some("git+https://github.com/org/tool.git@main#egg=tool  # via app")
        );
        assert_eq!(transformer.packages().get("tool").map(String::as_str), Some(""));
        Ok(())
    }

    #[test]
    fn unrecognized_lines_pass_through_trimmed() -> anyhow::Result<()> {
        let policy = PinPolicy::default();
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let out = transformer.transform_all("#\n  # via -r base.in\n\n--index-url https://x\n")?;
        assert_eq!(out, vec!["#", "# via -r base.in", "", "--index-url https://x"]);
        assert!(transformer.into_packages().is_empty());
        Ok(())
    }

    #[test]
    fn hashed_output_is_joined_and_rerendered() -> anyhow::Result<()> {
        let policy = PinPolicy::default();
        let ignore = IgnoreSet::new();
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let out = transformer.transform_all(
            "six==1.16.0 \\\n    --hash=sha256:aaa \\\n    --hash=sha256:bbb\n    # via app\n",
        )?;
        assert_eq!(
            out,
            vec![
                "six==1.16.0 \\\n    --hash=sha256:aaa \\\n    --hash=sha256:bbb".to_string(),
                "# via app".to_string(),
            ]
        );
        Ok(())
    }
}
