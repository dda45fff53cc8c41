use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

fn inclusion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:-r|--requirement)[\s=]*(?P<path>\S+)")
            .expect("regex for inclusion directives")
    })
}

/// Environment names included by an input file through `-r <file>` or
/// `--requirement <file>` directives. The name is the included file's stem.
#[must_use]
pub fn parse_references(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .filter_map(|line| inclusion_pattern().captures(line))
        .filter_map(|caps| environment_name(Path::new(&caps["path"])))
        .collect()
}

/// Environment name for an input or output file: its stem.
#[must_use]
pub fn environment_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}
