#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod environment;
pub mod provenance;
pub mod requirement;

pub use environment::{
    environment_name, merge_packages, parse_references, EnvironmentGraph, GraphError, IgnoreSet,
    IgnoredVersion, PackageTable, VersionConflict, VersionConflicts,
};
pub use provenance::{
    digest_tag, find_digest_tag, render_artifact, split_header_body, DEFAULT_HEADER,
    DIGEST_PREFIX,
};
pub use requirement::{
    join_continuations, normalize_package_name, parse_line, strip_post_release, LineTransformer,
    MalformedArtifact, ParsedLine, PinPolicy, PinStrength, PinnedLine, SourceControlledLine,
    TransformError,
};
