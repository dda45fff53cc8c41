#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

// Stands in for pip-compile: copies `<input stem>.resolved` next to the input
// into the `--output-file` path and records each call in `calls.log`.
const FAKE_PIP_COMPILE: &str = r#"#!/bin/sh
out=""
infile=""
flags=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-file) out="$2"; shift 2 ;;
    --*) flags="$flags $1"; shift ;;
    *) infile="$1"; shift ;;
  esac
done
dir=$(dirname "$infile")
echo "$(basename "$infile")$flags" >> "$dir/calls.log"
resolved="${infile%.*}.resolved"
if [ ! -f "$resolved" ]; then
  echo "Could not find a version that satisfies the requirement" >&2
  exit 1
fi
cp "$resolved" "$out"
"#;

pub struct Project {
    pub temp: TempDir,
    pub resolver: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("pcm-test")
            .tempdir()
            .expect("tempdir");
        fs::create_dir(temp.path().join("requirements")).expect("requirements dir");
        let resolver = temp.path().join("fake-pip-compile");
        fs::write(&resolver, FAKE_PIP_COMPILE).expect("write resolver");
        fs::set_permissions(&resolver, fs::Permissions::from_mode(0o755)).expect("chmod");
        Self { temp, resolver }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn requirements(&self) -> PathBuf {
        self.root().join("requirements")
    }

    /// Add an environment with its input file and the output the fake
    /// resolver will produce for it.
    pub fn environment(&self, name: &str, input: &str, resolved: &str) -> &Self {
        let dir = self.requirements();
        fs::write(dir.join(format!("{name}.in")), input).expect("write input");
        fs::write(dir.join(format!("{name}.resolved")), resolved).expect("write resolved");
        self
    }

    pub fn output(&self, name: &str) -> String {
        fs::read_to_string(self.requirements().join(format!("{name}.txt"))).expect("read output")
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.requirements().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("pcm");
        cmd.current_dir(self.root())
            .env("PCM_PIP_COMPILE", &self.resolver)
            .env("NO_COLOR", "1");
        cmd
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

/// Output lines after the header and digest tag.
pub fn body(output: &str) -> Vec<&str> {
    output
        .lines()
        .skip_while(|line| line.starts_with('#'))
        .collect()
}
