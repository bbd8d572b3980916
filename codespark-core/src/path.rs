//! # Canonical project paths
//!
//! Every node of a project tree is addressed by a canonical, slash-separated
//! path. The root is the empty string and every other node is
//! `parent + "/" + name`, so a top-level file reads `/index.js` and a nested
//! one `/src/utils/math.js`.
//!
//! All functions here are pure; they never touch the tree or the store.

use crate::{Error, Result};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Canonicalize a raw path.
///
/// Duplicate, leading and trailing separators are dropped. Blank segments
/// and the relative segments `.` and `..` are rejected.
///
/// # Example
///
/// ```rust
/// use codespark_core::path;
///
/// assert_eq!(path::normalize("src//utils/").unwrap(), "/src/utils");
/// assert_eq!(path::normalize("/").unwrap(), "");
/// assert!(path::normalize("/src/../etc").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<String> {
    let mut canonical = String::with_capacity(raw.len() + 1);

    for segment in raw.split(SEPARATOR).filter(|s| !s.is_empty()) {
        check_segment(raw, segment)?;
        canonical.push(SEPARATOR);
        canonical.push_str(segment);
    }

    Ok(canonical)
}

/// Append a single name to a parent path.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] if `name` is not exactly one valid segment
/// or if `parent` does not normalize.
///
/// # Example
///
/// ```rust
/// use codespark_core::path;
///
/// assert_eq!(path::join("/src", "main.rs").unwrap(), "/src/main.rs");
/// assert_eq!(path::join("", "README.md").unwrap(), "/README.md");
/// assert!(path::join("/src", "a/b").is_err());
/// ```
pub fn join(parent: &str, name: &str) -> Result<String> {
    validate_name(name)?;
    let mut joined = normalize(parent)?;
    joined.push(SEPARATOR);
    joined.push_str(name);
    Ok(joined)
}

/// Check that `name` can be used as a single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_path(name, "name cannot be empty"));
    }
    if name.contains(SEPARATOR) {
        return Err(Error::invalid_path(
            name,
            "name must be a single path segment",
        ));
    }
    check_segment(name, name)
}

/// Parent of a canonical path, `None` for the root.
///
/// # Example
///
/// ```rust
/// use codespark_core::path;
///
/// assert_eq!(path::parent_of("/src/main.rs").as_deref(), Some("/src"));
/// assert_eq!(path::parent_of("/src").as_deref(), Some(""));
/// assert_eq!(path::parent_of(""), None);
/// ```
pub fn parent_of(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let idx = path.rfind(SEPARATOR).unwrap_or(0);
    Some(path[..idx].to_string())
}

/// Last segment of a canonical path; empty for the root.
pub fn name_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Segments of a canonical path, root first.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Whether `ancestor` is a strict ancestor of `path`.
///
/// # Example
///
/// ```rust
/// use codespark_core::path;
///
/// assert!(path::is_ancestor("/src", "/src/utils/math.js"));
/// assert!(path::is_ancestor("", "/src"));
/// assert!(!path::is_ancestor("/src", "/src"));
/// assert!(!path::is_ancestor("/src", "/srcs/a.js"));
/// ```
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor.len() >= path.len() {
        return false;
    }
    path.starts_with(ancestor) && path[ancestor.len()..].starts_with(SEPARATOR)
}

/// Whether `path` is `base` itself or lies beneath it.
pub fn is_same_or_under(base: &str, path: &str) -> bool {
    base == path || is_ancestor(base, path)
}

/// Move `path` from under `from` to under `to`.
///
/// Returns `None` when `path` is neither `from` nor one of its descendants.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        Some(to.to_string())
    } else if is_ancestor(from, path) {
        Some(format!("{}{}", to, &path[from.len()..]))
    } else {
        None
    }
}

fn check_segment(raw: &str, segment: &str) -> Result<()> {
    if segment.trim().is_empty() {
        return Err(Error::invalid_path(raw, "blank path segment"));
    }
    if segment == "." || segment == ".." {
        return Err(Error::invalid_path(
            raw,
            format!("'{}' segments are not allowed", segment),
        ));
    }
    if segment.chars().any(char::is_control) {
        return Err(Error::invalid_path(raw, "control characters are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("src/index.js").unwrap(), "/src/index.js");
        assert_eq!(normalize("//src///index.js//").unwrap(), "/src/index.js");
        assert_eq!(normalize("").unwrap(), "");
        assert_eq!(normalize("///").unwrap(), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            "/",
            "a",
            "a/b/c",
            "/a//b/",
            "src/utils//math.js/",
            "  spaced name /x",
            "dir.with.dots/file.tar.gz",
        ];
        for raw in samples {
            let once = normalize(raw).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "normalize not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_rejects_bad_segments() {
        for raw in ["/a/./b", "/a/../b", "..", "/a/  /b", "/a/\tb\n"] {
            let err = normalize(raw).unwrap_err();
            assert!(err.is_invalid_path(), "{:?} gave {}", raw, err);
        }
    }

    #[test]
    fn test_join_and_parent_roundtrip() {
        let path = join("/src/utils", "math.js").unwrap();
        assert_eq!(path, "/src/utils/math.js");
        assert_eq!(parent_of(&path).as_deref(), Some("/src/utils"));
        assert_eq!(name_of(&path), "math.js");
        assert_eq!(name_of(""), "");
    }

    #[test]
    fn test_join_rejects_invalid_names() {
        assert!(join("", "").unwrap_err().is_invalid_path());
        assert!(join("", "..").unwrap_err().is_invalid_path());
        assert!(join("", "a/b").unwrap_err().is_invalid_path());
        assert!(join("", "   ").unwrap_err().is_invalid_path());
    }

    #[test]
    fn test_segments() {
        let parts: Vec<_> = segments("/src/utils/math.js").collect();
        assert_eq!(parts, vec!["src", "utils", "math.js"]);
        assert_eq!(segments("").count(), 0);
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("/src", "/src", "/lib").as_deref(), Some("/lib"));
        assert_eq!(
            rebase("/src/a/b.js", "/src", "/lib").as_deref(),
            Some("/lib/a/b.js")
        );
        assert_eq!(rebase("/srcx/b.js", "/src", "/lib"), None);
        assert!(is_same_or_under("/src", "/src"));
        assert!(is_same_or_under("/src", "/src/a"));
        assert!(!is_same_or_under("/src", "/lib"));
    }
}
