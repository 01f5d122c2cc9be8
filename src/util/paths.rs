//! Path expansion and normalization helpers.

use std::path::{Path, PathBuf};

/// Expand a leading `~` and make the path absolute.
///
/// Does not resolve symlinks and does not require the path to exist;
/// module paths are routinely checked before they are downloaded.
pub fn expand(path: impl AsRef<Path>) -> PathBuf {
    let raw = path.as_ref().to_string_lossy();
    let expanded = shellexpand::tilde(raw.as_ref()).into_owned();
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        normalize_components(&expanded)
    } else {
        match std::env::current_dir() {
            Ok(cwd) => normalize_components(&cwd.join(expanded)),
            Err(_) => expanded,
        }
    }
}

/// Lexically remove `.` and `..` components.
fn normalize_components(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether a directory exists and contains at least one entry.
pub fn is_nonempty_dir(path: &Path) -> bool {
    path.is_dir()
        && std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/a/b/../c"), PathBuf::from("/a/c"));
        assert_eq!(expand("/a/./b"), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_expand_relative_is_absolute() {
        assert!(expand("relative/path").is_absolute());
    }

    #[test]
    fn test_is_nonempty_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!is_nonempty_dir(tmp.path()));
        std::fs::write(tmp.path().join("file"), "x").unwrap();
        assert!(is_nonempty_dir(tmp.path()));
        assert!(!is_nonempty_dir(&tmp.path().join("missing")));
    }
}
