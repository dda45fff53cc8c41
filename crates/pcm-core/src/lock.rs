//! The lock pipeline: resolve every environment in reference order and write
//! its pinned output artifact.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use pcm_domain::{
    digest_tag, merge_packages, render_artifact, EnvironmentGraph, LineTransformer, PackageTable,
    TransformError,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::{read_text, write_atomic};
use crate::config::LockConfig;
use crate::discover::discover;
use crate::error::LockError;
use crate::resolver::{CompileRequest, Resolver};

/// What was written for one environment.
#[derive(Debug, Clone, Serialize)]
pub struct LockedEnvironment {
    pub name: String,
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub references: Vec<String>,
    pub packages: PackageTable,
    pub hashes: bool,
    pub forbid_post: bool,
    pub ignored: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LockSummary {
    pub environments: Vec<LockedEnvironment>,
}

impl LockSummary {
    #[must_use]
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LockedEnvironment> {
        self.environments.iter().find(|env| env.name == name)
    }
}

/// Lock every selected environment, referenced environments first.
///
/// Each environment's packages are published once its output is written so
/// that environments referencing it can leave them out of their own output.
///
/// # Errors
///
/// Fails on the first cycle, unknown environment, resolver failure, version
/// conflict, malformed resolver output or I/O error. No partial results are
/// reported.
pub fn lock_environments(
    config: &LockConfig,
    resolver: &dyn Resolver,
) -> Result<LockSummary, LockError> {
    let layout = config.layout();
    let graph = discover(layout)?;
    let order = graph.topological_order()?;
    let header = config.header_text()?;

    warn_unknown(&graph, config.forbid_post(), "--forbid-post");
    let hashed = hashed_environments(config, &graph);
    let selected = selected_environments(config, &graph)?;

    let mut published: BTreeMap<String, PackageTable> = BTreeMap::new();
    let mut summary = LockSummary::default();
    for name in &order {
        if selected.as_ref().is_some_and(|names| !names.contains(name)) {
            debug!(environment = %name, "not selected");
            continue;
        }

        let recursive = graph.recursive_refs(name);
        let ignore = merge_packages(&published, recursive.iter().map(String::as_str))?;
        let references: Vec<String> = graph
            .references(name)
            .map(|refs| refs.iter().cloned().collect())
            .unwrap_or_default();
        let infile = layout.infile(name);
        let outfile = layout.outfile(name);
        info!("{}", locking_message(&infile, &outfile, &recursive));

        let input = fs::read(&infile).map_err(|source| LockError::io("read", &infile, source))?;
        let generate_hashes = hashed.contains(name);
        resolver.compile(&CompileRequest {
            environment: name,
            infile: &infile,
            outfile: &outfile,
            upgrade: config.upgrade(),
            generate_hashes,
        })?;

        let raw = read_text(&outfile)?;
        let policy = config.pin_policy(name);
        let mut transformer = LineTransformer::new(&policy, &ignore);
        let lines = transformer.transform_all(&raw).map_err(|err| match err {
            TransformError::Malformed(source) => LockError::Malformed {
                environment: name.clone(),
                source,
            },
            TransformError::Conflict(conflicts) => LockError::Conflict(conflicts),
        })?;
        let packages = transformer.into_packages();

        let reference_lines: Vec<String> = references
            .iter()
            .map(|reference| layout.reference_line(reference))
            .collect();
        let rendered = render_artifact(&header, &digest_tag(&input), &reference_lines, &lines);
        write_atomic(&outfile, &rendered)?;
        debug!(
            environment = %name,
            packages = packages.len(),
            ignored = ignore.len(),
            "wrote output"
        );

        published.insert(name.clone(), packages.clone());
        summary.environments.push(LockedEnvironment {
            name: name.clone(),
            infile,
            outfile,
            references,
            packages,
            hashes: generate_hashes,
            forbid_post: policy.forbids_post(),
            ignored: ignore.len(),
        });
    }
    Ok(summary)
}

/// Names every environment whose packages feed the ignore set, not just the
/// direct references.
fn locking_message(infile: &Path, outfile: &Path, recursive: &BTreeSet<String>) -> String {
    format!(
        "Locking {} to {}. References: {:?}",
        infile.display(),
        outfile.display(),
        recursive.iter().collect::<Vec<_>>()
    )
}

fn warn_unknown(graph: &EnvironmentGraph, names: &BTreeSet<String>, option: &str) {
    for name in names.iter().filter(|name| !graph.contains(name)) {
        warn!("{option} names unknown environment '{name}'");
    }
}

// Environments that may be installed together share hashing: every member
// of a requested environment's cluster is resolved with hashes.
fn hashed_environments(config: &LockConfig, graph: &EnvironmentGraph) -> BTreeSet<String> {
    warn_unknown(graph, config.add_hashes(), "--generate-hashes");
    config
        .add_hashes()
        .iter()
        .filter(|name| graph.contains(name))
        .flat_map(|name| graph.reference_cluster(name))
        .collect()
}

fn selected_environments(
    config: &LockConfig,
    graph: &EnvironmentGraph,
) -> Result<Option<BTreeSet<String>>, LockError> {
    if config.include_names().is_empty() {
        return Ok(None);
    }
    let mut selected = BTreeSet::new();
    for name in config.include_names() {
        if !graph.contains(name) {
            return Err(LockError::UnknownEnvironment {
                name: name.clone(),
                infile: config.layout().infile(name),
            });
        }
        selected.insert(name.clone());
        selected.extend(graph.recursive_refs(name));
    }
    Ok(Some(selected))
}
