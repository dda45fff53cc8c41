//! Subprocess capture for the resolver.
//!
//! pip-compile reports the reason for a failure at the end of its output, so
//! each stream keeps its last [`CAPTURE_LIMIT`] bytes and earlier output is
//! replaced by a marker.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};

pub const CAPTURE_LIMIT: usize = 1024 * 1024;

const TRUNCATED: &str = "[...earlier output truncated...]\n";

/// Exit code and captured streams of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug)]
struct Tail {
    bytes: VecDeque<u8>,
    limit: usize,
    dropped: bool,
}

impl Tail {
    fn new(limit: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            limit,
            dropped: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend(chunk);
        let excess = self.bytes.len().saturating_sub(self.limit);
        if excess > 0 {
            self.bytes.drain(..excess);
            self.dropped = true;
        }
    }

    fn into_text(self) -> String {
        let bytes: Vec<u8> = self.bytes.into();
        let text = String::from_utf8_lossy(&bytes);
        if self.dropped {
            format!("{TRUNCATED}{text}")
        } else {
            text.into_owned()
        }
    }
}

fn drain(mut reader: impl Read, limit: usize) -> io::Result<String> {
    let mut tail = Tail::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(tail.into_text()),
            Ok(read) => tail.push(&chunk[..read]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

/// Run `program` in `cwd` with stdin closed and wait for it to exit.
///
/// # Errors
///
/// Fails when the program cannot be started or its output cannot be read.
/// A non-zero exit is not an error; callers inspect [`Captured::code`].
pub fn capture(program: &str, args: &[String], cwd: &Path) -> Result<Captured> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let (Some(out_pipe), Some(err_pipe)) = (child.stdout.take(), child.stderr.take()) else {
        bail!("{program} started without output pipes");
    };

    // Both pipes are drained concurrently so a chatty stderr cannot block
    // the child while stdout is being read.
    let (stdout, stderr) = thread::scope(|scope| {
        let stdout = scope.spawn(move || drain(out_pipe, CAPTURE_LIMIT));
        let stderr = drain(err_pipe, CAPTURE_LIMIT);
        (stdout.join(), stderr)
    });
    let stdout = stdout
        .map_err(|_| anyhow!("stdout reader for {program} panicked"))?
        .with_context(|| format!("failed to read stdout of {program}"))?;
    let stderr = stderr.with_context(|| format!("failed to read stderr of {program}"))?;

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    Ok(Captured {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn captures_both_streams_and_exit_code() -> Result<()> {
        let output = capture(
            "/bin/sh",
            &["-c".into(), "printf resolved; printf 'no match' >&2; exit 7".into()],
            Path::new("."),
        )?;
        assert_eq!(output.code, 7);
        assert!(!output.succeeded());
        assert_eq!(output.stdout, "resolved");
        assert_eq!(output.stderr, "no match");
        Ok(())
    }

    #[test]
    fn unknown_program_fails_to_start() {
        let err = capture("pcm-definitely-missing-binary", &[], Path::new("."))
            .expect_err("spawn should fail");
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn tail_keeps_the_most_recent_bytes() {
        let mut tail = Tail::new(4);
        tail.push(b"ab");
        tail.push(b"cdef");
        tail.push(b"gh");
        assert_eq!(tail.into_text(), format!("{TRUNCATED}efgh"));

        let mut tail = Tail::new(4);
        tail.push(b"abcd");
        assert_eq!(tail.into_text(), "abcd");
    }

    #[test]
    fn drain_reads_a_whole_stream() -> Result<()> {
        let text = drain(&b"line one\nline two\n"[..], CAPTURE_LIMIT)?;
        assert_eq!(text, "line one\nline two\n");
        Ok(())
    }
}
