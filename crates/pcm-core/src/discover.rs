use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use pcm_domain::{environment_name, parse_references, EnvironmentGraph};
use tracing::debug;

use crate::config::Layout;
use crate::error::LockError;

/// Find every input file in the layout's base directory and build the
/// reference graph between them.
///
/// # Errors
///
/// Returns an I/O error when the directory or an input file cannot be read,
/// and a graph error when an input includes a file that is not itself an
/// input.
pub fn discover(layout: &Layout) -> Result<EnvironmentGraph, LockError> {
    let base_dir = layout.base_dir();
    let entries =
        fs::read_dir(base_dir).map_err(|source| LockError::io("read directory", base_dir, source))?;

    let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| LockError::io("read directory", base_dir, source))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches_ext = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy() == layout.in_ext());
        if !matches_ext {
            continue;
        }
        let Some(name) = environment_name(&path) else {
            continue;
        };
        let contents =
            fs::read_to_string(&path).map_err(|source| LockError::io("read", &path, source))?;
        let refs = parse_references(&contents);
        debug!(environment = %name, references = ?refs, "discovered environment");
        references.insert(name, refs);
    }

    Ok(EnvironmentGraph::from_references(references)?)
}
