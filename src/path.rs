//! Path utilities.
//!
//! Resource paths are slash-separated and rooted at `/`. Lookups work on the
//! segment list produced by [`split`]; no `.`/`..` resolution takes place.

/// Path separator, also the name of every root node.
pub const SEPARATOR: &str = "/";

/// Split a path into its non-empty segments.
///
/// `"/resource//reports/"` yields `["resource", "reports"]`; `"/"` and `""`
/// yield no segments.
#[inline]
pub fn split(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Join a child name onto a base path.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Last segment of a path, or `/` for the root.
pub fn base_name(path: &str) -> &str {
    split(path).last().copied().unwrap_or(SEPARATOR)
}

/// Path relative to the root, without the leading separator.
#[inline]
pub fn relative(path: &str) -> &str {
    path.trim_start_matches(['/', '\\'])
}
