//! Resolver output lines: parsing, continuation joining and pin rewriting.

mod continuation;
mod line;
mod policy;

pub use continuation::{join_continuations, MalformedArtifact};
pub use line::{
    parse_line, strip_post_release, ParsedLine, PinStrength, PinnedLine, SourceControlledLine,
    COMMENT_COLUMN,
};
pub use policy::{LineTransformer, PinPolicy, TransformError};

/// Canonical key for a distribution name: lower-cased, with every run of
/// `-`, `_` and `.` collapsed to a single `-`.
#[must_use]
pub fn normalize_package_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.extend(ch.to_lowercase());
            in_separator = false;
        }
    }
    normalized
}
