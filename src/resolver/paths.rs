//! Include path deduplication and minimization

use std::collections::HashSet;

/// Remove exact duplicates, keeping first occurrences in order
pub fn dedup_paths(paths: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .iter()
        .filter(|path| seen.insert(path.as_str()))
        .cloned()
        .collect()
}

/// Drop every path that is a literal substring of another distinct path.
///
/// Requesting `a.b.c` already includes the entities on `a` and `a.b`, so the
/// shorter paths are redundant. Containment is plain substring matching, not
/// segment-aware: `image` is dropped next to `field_image`.
pub fn minimize_paths(paths: &[String]) -> Vec<String> {
    let unique = dedup_paths(paths);

    unique
        .iter()
        .filter(|path| {
            !unique
                .iter()
                .any(|other| other != *path && other.contains(path.as_str()))
        })
        .cloned()
        .collect()
}
