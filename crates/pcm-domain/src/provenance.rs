//! Provenance stamps tying an output artifact to the input it was locked from.

use sha1::{Digest, Sha1};

pub const DIGEST_PREFIX: &str = "# SHA1:";

pub const DEFAULT_HEADER: &str = "\
#
# This file is autogenerated by pip-compile-multi
# To update, run:
#
#    pip-compile-multi
#
";

/// `# SHA1:<hex>` over the input contents with surrounding whitespace
/// trimmed.
#[must_use]
pub fn digest_tag(contents: &[u8]) -> String {
    let digest = Sha1::digest(contents.trim_ascii());
    format!("{DIGEST_PREFIX}{}", hex::encode(digest))
}

/// The first digest tag in an output artifact, if any.
#[must_use]
pub fn find_digest_tag(contents: &str) -> Option<&str> {
    contents
        .lines()
        .find(|line| line.starts_with(DIGEST_PREFIX))
        .map(str::trim_end)
}

/// Split lines into the leading run of comment lines and everything after it.
pub fn split_header_body<S: AsRef<str>>(lines: &[S]) -> (&[S], &[S]) {
    let header_len = lines
        .iter()
        .take_while(|line| line.as_ref().starts_with('#'))
        .count();
    lines.split_at(header_len)
}

/// Render a complete output artifact: header text, digest tag, one
/// inclusion directive per reference, then the body with its own header
/// removed.
#[must_use]
pub fn render_artifact<S: AsRef<str>>(
    header: &str,
    digest_tag: &str,
    references: &[String],
    lines: &[S],
) -> String {
    let (_, body) = split_header_body(lines);
    let mut out = String::with_capacity(header.len() + digest_tag.len() + lines.len() * 32);
    out.push_str(header);
    if !header.is_empty() && !header.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(digest_tag);
    out.push('\n');
    for reference in references {
        out.push_str(reference);
        out.push('\n');
    }
    for line in body {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
