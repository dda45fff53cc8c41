//! Check that every output artifact was locked from its current input.

use std::fs;
use std::path::{Path, PathBuf};

use pcm_domain::{digest_tag, find_digest_tag};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Layout;
use crate::discover::discover;
use crate::error::LockError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestCheck {
    pub name: String,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub expected: Option<String>,
    pub found: Option<String>,
    pub matches: bool,
}

/// Compare the digest of `infile` with the tag stamped into `outfile`.
///
/// Never fails: an unreadable input, a missing output or a missing tag is
/// reported as a mismatch.
#[must_use]
pub fn verify_digest(name: &str, infile: &Path, outfile: &Path) -> DigestCheck {
    let expected = fs::read(infile).ok().map(|input| digest_tag(&input));
    let found = fs::read_to_string(outfile)
        .ok()
        .and_then(|contents| find_digest_tag(&contents).map(str::to_string));
    let matches = expected.is_some() && expected == found;
    DigestCheck {
        name: name.to_string(),
        infile: infile.to_path_buf(),
        outfile: outfile.to_path_buf(),
        expected,
        found,
        matches,
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub checks: Vec<DigestCheck>,
}

impl VerifyReport {
    #[must_use]
    pub fn all_match(&self) -> bool {
        self.checks.iter().all(|check| check.matches)
    }

    pub fn mismatched(&self) -> impl Iterator<Item = &DigestCheck> {
        self.checks.iter().filter(|check| !check.matches)
    }
}

/// Check every discovered environment, in reference order.
///
/// # Errors
///
/// Only discovery can fail: an unreadable directory, a reference to a missing
/// input or a reference cycle. Digest mismatches are part of the report.
pub fn verify_environments(layout: &Layout) -> Result<VerifyReport, LockError> {
    let graph = discover(layout)?;
    let mut report = VerifyReport::default();
    for name in graph.topological_order()? {
        let infile = layout.infile(&name);
        let outfile = layout.outfile(&name);
        info!(
            "Verifying that {} was generated from {}.",
            outfile.display(),
            infile.display()
        );
        let check = verify_digest(&name, &infile, &outfile);
        if check.matches {
            info!("Success - digests match.");
        } else {
            error!("FAILURE!");
            error!("Expecting: {}", check.expected.as_deref().unwrap_or("<unreadable input>"));
            error!("Found:     {}", check.found.as_deref().unwrap_or("<no digest>"));
        }
        report.checks.push(check);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcm_domain::{render_artifact, DEFAULT_HEADER};
    use tempfile::tempdir;

    fn lock_stub(dir: &Path, name: &str, input: &str) -> anyhow::Result<()> {
        fs::write(dir.join(format!("{name}.in")), input)?;
        let rendered = render_artifact(
            DEFAULT_HEADER,
            &digest_tag(input.as_bytes()),
            &[],
            &["six==1.16.0"],
        );
        fs::write(dir.join(format!("{name}.txt")), rendered)?;
        Ok(())
    }

    #[test]
    fn modified_input_fails_only_its_environment() -> anyhow::Result<()> {
        let dir = tempdir()?;
        lock_stub(dir.path(), "base", "six\n")?;
        lock_stub(dir.path(), "test", "-r base.in\npytest\n")?;
        let layout = Layout::new(dir.path(), "in", "txt");
        assert!(verify_environments(&layout)?.all_match());

        fs::write(dir.path().join("test.in"), "-r base.in\npytest\nmock\n")?;
        let report = verify_environments(&layout)?;
        assert!(!report.all_match());
        let failed: Vec<&str> = report.mismatched().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["test"]);
        Ok(())
    }

    #[test]
    fn whitespace_only_edits_still_match() -> anyhow::Result<()> {
        let dir = tempdir()?;
        lock_stub(dir.path(), "base", "six\n")?;
        fs::write(dir.path().join("base.in"), "\n\nsix\n   \n")?;
        let check = verify_digest(
            "base",
            &dir.path().join("base.in"),
            &dir.path().join("base.txt"),
        );
        assert!(check.matches);
        Ok(())
    }

    #[test]
    fn missing_output_or_tag_is_a_mismatch() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let infile = dir.path().join("base.in");
        let outfile = dir.path().join("base.txt");
        fs::write(&infile, "six\n")?;

        let check = verify_digest("base", &infile, &outfile);
        assert!(!check.matches);
        assert!(check.expected.is_some());
        assert_eq!(check.found, None);

        fs::write(&outfile, "six==1.16.0\n")?;
        assert!(!verify_digest("base", &infile, &outfile).matches);

        let check = verify_digest("gone", &dir.path().join("gone.in"), &outfile);
        assert!(!check.matches);
        assert_eq!(check.expected, None);
        Ok(())
    }
}
