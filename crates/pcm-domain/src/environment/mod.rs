//! Named environments, the references between them and the packages they
//! resolve.

mod graph;
mod packages;
mod references;

pub use graph::{EnvironmentGraph, GraphError};
pub use packages::{
    merge_packages, IgnoreSet, IgnoredVersion, PackageTable, VersionConflict, VersionConflicts,
};
pub use references::{environment_name, parse_references};
