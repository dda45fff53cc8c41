/// Resolver output ended while a line continuation (`\`) was still open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resolver output ends with a line continuation: '{pending}'")]
pub struct MalformedArtifact {
    pub pending: String,
}

/// Split `contents` into logical lines, joining physical lines that end in a
/// backslash with the line that follows them.
///
/// Every returned line is trimmed; joined parts are separated by a single
/// space.
///
/// # Errors
///
/// Returns [`MalformedArtifact`] when the final physical line still carries a
/// continuation marker.
pub fn join_continuations(contents: &str) -> Result<Vec<String>, MalformedArtifact> {
    let mut logical = Vec::new();
    let mut parts: Vec<&str> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if let Some(head) = line.strip_suffix('\\') {
            parts.push(head.trim_end());
        } else {
            parts.push(line);
            logical.push(parts.join(" "));
            parts.clear();
        }
    }
    if !parts.is_empty() {
        return Err(MalformedArtifact {
            pending: parts.join(" "),
        });
    }
    Ok(logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_backslash_continued_lines() -> anyhow::Result<()> {
        let contents = "six==1.16.0 \\\n    --hash=sha256:aaa \\\n    --hash=sha256:bbb\nflask==2.0\n";
        assert_eq!(
            join_continuations(contents)?,
            vec![
                "six==1.16.0 --hash=sha256:aaa --hash=sha256:bbb".to_string(),
                "flask==2.0".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn keeps_blank_lines_as_empty_entries() -> anyhow::Result<()> {
        assert_eq!(
            join_continuations("a==1\n\n  # via b  \n")?,
            vec!["a==1".to_string(), String::new(), "# via b".to_string()]
        );
        Ok(())
    }

    #[test]
    fn trailing_continuation_is_malformed() {
        let err = join_continuations("six==1.16.0 \\\n    --hash=sha256:aaa \\\n")
            .expect_err("dangling continuation");
        assert_eq!(err.pending, "six==1.16.0 --hash=sha256:aaa");
    }
}
