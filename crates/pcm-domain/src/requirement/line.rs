use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Column the trailing comment of an unhashed pin is padded to.
pub const COMMENT_COLUMN: usize = 26;

const CONTINUATION_JOINER: &str = " \\\n    ";

/// Constraint operator emitted for a pinned requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinStrength {
    /// `==`, used for externally maintained packages.
    Hard,
    /// `~=`, used for packages matching the soft-pin patterns.
    Soft,
}

impl PinStrength {
    #[must_use]
    pub fn operator(self) -> &'static str {
        match self {
            Self::Hard => "==",
            Self::Soft => "~=",
        }
    }
}

/// `<package>==<version> [--hash=... ...] [# comment]`, or `~=` for a soft pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedLine {
    pub package: String,
    pub version: String,
    pub hashes: Vec<String>,
    pub comment: Option<String>,
}

impl PinnedLine {
    /// Remove a `.postNNN` release suffix from the version, if present.
    pub fn drop_post(&mut self) {
        self.version = strip_post_release(&self.version).to_string();
    }

    #[must_use]
    pub fn render(&self, strength: PinStrength) -> String {
        let pin = format!("{}{}{}", self.package, strength.operator(), self.version);
        if self.hashes.is_empty() {
            let padded = format!("{:<width$}", format!("{pin}  "), width = COMMENT_COLUMN);
            let comment = self.comment.as_deref().unwrap_or_default();
            return format!("{padded}{comment}").trim_end().to_string();
        }
        let mut parts = Vec::with_capacity(self.hashes.len() + 2);
        parts.push(pin);
        parts.extend(self.hashes.iter().cloned());
        if let Some(comment) = &self.comment {
            parts.push(comment.clone());
        }
        parts.join(CONTINUATION_JOINER)
    }
}

/// An editable or VCS locator ending in `#egg=<package>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceControlledLine {
    pub package: String,
    pub comment: Option<String>,
    raw: String,
}

impl SourceControlledLine {
    /// The raw locator with the editable flag removed, unless the locator uses
    /// the `git+git@` transport which pip can only install in editable mode.
    #[must_use]
    pub fn render(&self) -> String {
        if self.raw.contains("git+git@") {
            return self.raw.trim().to_string();
        }
        self.raw
            .strip_prefix("-e ")
            .unwrap_or(&self.raw)
            .trim()
            .to_string()
    }
}

/// Classification of one logical line of resolver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Pinned(PinnedLine),
    SourceControlled(SourceControlledLine),
    Unrecognized,
}

impl ParsedLine {
    /// Package name and version of a dependency entry. Source-controlled
    /// entries report an empty version.
    #[must_use]
    pub fn package_version(&self) -> Option<(&str, &str)> {
        match self {
            Self::Pinned(pin) => Some((pin.package.as_str(), pin.version.as_str())),
            Self::SourceControlled(vcs) => Some((vcs.package.as_str(), "")),
            Self::Unrecognized => None,
        }
    }
}

fn pinned_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<package>\S+?)(?:==|~=)(?P<version>\S+)\s*(?P<hashes>(?:--hash=\S+\s*)+)?(?P<comment>#.*)?$",
        )
        .expect("regex for pinned requirements")
    })
}

fn source_controlled_pattern() -> &'static Regex {
    // -e git+https://github.com/ansible/docutils.git@master#egg=docutils
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:-e)?\s*\S+#egg=(?P<package>[a-z0-9._-]+)\S*\s*(?P<comment>#.*)?$",
        )
        .expect("regex for source-controlled requirements")
    })
}

/// Classify a single logical (continuation-joined) line.
#[must_use]
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if let Some(caps) = pinned_pattern().captures(line) {
        let hashes = caps
            .name("hashes")
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        return ParsedLine::Pinned(PinnedLine {
            package: caps["package"].to_string(),
            version: caps["version"].trim().to_string(),
            hashes,
            comment: non_empty_comment(caps.name("comment").map(|m| m.as_str())),
        });
    }
    if let Some(caps) = source_controlled_pattern().captures(line) {
        return ParsedLine::SourceControlled(SourceControlledLine {
            package: caps["package"].to_string(),
            comment: non_empty_comment(caps.name("comment").map(|m| m.as_str())),
            raw: line.to_string(),
        });
    }
    ParsedLine::Unrecognized
}

fn non_empty_comment(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|comment| !comment.is_empty())
        .map(str::to_string)
}

/// Truncate a version at its first `.post` marker.
#[must_use]
pub fn strip_post_release(version: &str) -> &str {
    match version.find(".post") {
        Some(idx) => &version[..idx],
        None => version,
    }
}
