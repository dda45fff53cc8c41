//! Immutable run configuration shared by every command.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use pcm_domain::{PinPolicy, DEFAULT_HEADER};
use serde::{Deserialize, Serialize};

use crate::error::LockError;

pub const DEFAULT_BASE_DIR: &str = "requirements";
pub const DEFAULT_IN_EXT: &str = "in";
pub const DEFAULT_OUT_EXT: &str = "txt";
pub const DEFAULT_RESOLVER: &str = "pip-compile";

/// Options as collected from the command line, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockOptions {
    pub directory: PathBuf,
    pub in_ext: String,
    pub out_ext: String,
    pub compatible: Vec<String>,
    pub forbid_post: Vec<String>,
    pub generate_hashes: Vec<String>,
    pub header: Option<PathBuf>,
    pub only_names: Vec<String>,
    pub upgrade: bool,
    pub resolver: String,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_BASE_DIR),
            in_ext: DEFAULT_IN_EXT.to_string(),
            out_ext: DEFAULT_OUT_EXT.to_string(),
            compatible: Vec::new(),
            forbid_post: Vec::new(),
            generate_hashes: Vec::new(),
            header: None,
            only_names: Vec::new(),
            upgrade: true,
            resolver: DEFAULT_RESOLVER.to_string(),
        }
    }
}

/// Where input and output files live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    base_dir: PathBuf,
    in_ext: String,
    out_ext: String,
}

impl Layout {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, in_ext: &str, out_ext: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            in_ext: in_ext.trim_start_matches('.').to_string(),
            out_ext: out_ext.trim_start_matches('.').to_string(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn in_ext(&self) -> &str {
        &self.in_ext
    }

    #[must_use]
    pub fn infile(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.{}", self.in_ext))
    }

    #[must_use]
    pub fn outfile(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.{}", self.out_ext))
    }

    /// Inclusion directive pointing at another environment's output.
    #[must_use]
    pub fn reference_line(&self, name: &str) -> String {
        format!("-r {name}.{}", self.out_ext)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR, DEFAULT_IN_EXT, DEFAULT_OUT_EXT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSource {
    Default,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverCommand {
    pub program: String,
}

#[derive(Debug, Clone)]
pub struct LockConfig {
    layout: Layout,
    soft_pin_patterns: Vec<Pattern>,
    forbid_post: BTreeSet<String>,
    add_hashes: BTreeSet<String>,
    include_names: BTreeSet<String>,
    upgrade: bool,
    header: HeaderSource,
    resolver: ResolverCommand,
}

impl LockConfig {
    /// Validate raw options into a configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidPattern`] for a soft-pin pattern that is
    /// not a valid glob.
    pub fn from_options(options: &LockOptions) -> Result<Self, LockError> {
        let soft_pin_patterns = options
            .compatible
            .iter()
            .map(|raw| {
                Pattern::new(raw).map_err(|source| LockError::InvalidPattern {
                    pattern: raw.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let header = match &options.header {
            Some(path) if !path.as_os_str().is_empty() => HeaderSource::File(path.clone()),
            _ => HeaderSource::Default,
        };
        Ok(Self {
            layout: Layout::new(&options.directory, &options.in_ext, &options.out_ext),
            soft_pin_patterns,
            forbid_post: options.forbid_post.iter().cloned().collect(),
            add_hashes: options.generate_hashes.iter().cloned().collect(),
            include_names: options.only_names.iter().cloned().collect(),
            upgrade: options.upgrade,
            header,
            resolver: ResolverCommand {
                program: options.resolver.clone(),
            },
        })
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn forbid_post(&self) -> &BTreeSet<String> {
        &self.forbid_post
    }

    #[must_use]
    pub fn add_hashes(&self) -> &BTreeSet<String> {
        &self.add_hashes
    }

    #[must_use]
    pub fn include_names(&self) -> &BTreeSet<String> {
        &self.include_names
    }

    #[must_use]
    pub fn upgrade(&self) -> bool {
        self.upgrade
    }

    #[must_use]
    pub fn resolver(&self) -> &ResolverCommand {
        &self.resolver
    }

    #[must_use]
    pub fn pin_policy(&self, environment: &str) -> PinPolicy {
        PinPolicy::new(
            self.soft_pin_patterns.clone(),
            self.forbid_post.contains(environment),
        )
    }

    /// Header text placed above the digest tag of every output file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when a custom header file cannot be read.
    pub fn header_text(&self) -> Result<String, LockError> {
        match &self.header {
            HeaderSource::Default => Ok(DEFAULT_HEADER.to_string()),
            HeaderSource::File(path) => {
                fs::read_to_string(path).map_err(|source| LockError::io("read header", path, source))
            }
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            soft_pin_patterns: Vec::new(),
            forbid_post: BTreeSet::new(),
            add_hashes: BTreeSet::new(),
            include_names: BTreeSet::new(),
            upgrade: true,
            header: HeaderSource::Default,
            resolver: ResolverCommand {
                program: DEFAULT_RESOLVER.to_string(),
            },
        }
    }
}
