//! Build-descriptor synchronization.
//!
//! Line-oriented, idempotent rewriting of variable bindings across build
//! descriptors. A line is eligible only if it does not start with whitespace
//! or a comment marker; assignment operators are matched in the fixed
//! priority `?=`, `:=`, `=` and the original operator is preserved.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;

/// Well-known release-configuration files patched unconditionally when
/// present, in addition to the introspected makefile list.
pub const RELEASE_FILES: &[&str] = &["configure/RELEASE", "configure/RELEASE.local"];

/// Assignment operators in match priority order.
const OPERATORS: &[&str] = &["?=", ":=", "="];

/// Result of patching descriptor contents.
#[derive(Debug, Clone)]
pub struct PatchedContents {
    /// The rewritten lines.
    pub lines: Vec<String>,

    /// Every variable seen as an assignment target.
    pub seen: BTreeSet<String>,

    /// Variables whose binding changed.
    pub changed: BTreeSet<String>,
}

impl PatchedContents {
    /// Join the lines back into file contents with a trailing newline.
    pub fn to_contents(&self) -> String {
        let mut contents = self.lines.join("\n");
        contents.push('\n');
        contents
    }
}

/// Patch variable assignments in descriptor contents.
///
/// Re-patching with identical bindings never changes the output.
pub fn patch_contents(
    contents: &str,
    variables: &BTreeMap<String, String>,
) -> PatchedContents {
    let mut seen = BTreeSet::new();
    let mut changed = BTreeSet::new();

    let lines = contents
        .lines()
        .map(|line| fix_line(line, variables, &mut seen, &mut changed))
        .collect();

    PatchedContents {
        lines,
        seen,
        changed,
    }
}

fn fix_line(
    line: &str,
    variables: &BTreeMap<String, String>,
    seen: &mut BTreeSet<String>,
    changed: &mut BTreeSet<String>,
) -> String {
    let Some(first) = line.chars().next() else {
        return line.to_string();
    };
    if first == ' ' || first == '\t' || first == '#' {
        return line.to_string();
    }

    for operator in OPERATORS {
        let Some(index) = line.find(operator) else {
            continue;
        };

        let variable = line[..index].trim();
        if !variable.is_empty() {
            seen.insert(variable.to_string());
        }

        let Some(value) = variables.get(variable) else {
            return line.to_string();
        };

        let fixed = format!("{variable}{operator}{value}");
        if line.trim_end() != fixed {
            changed.insert(variable.to_string());
            return fixed;
        }
        return line.to_string();
    }

    line.to_string()
}

/// Patch a descriptor file in place; returns the set of changed variables.
///
/// The file is rewritten only when at least one binding changed, keeping
/// repeated synchronization a no-op.
pub fn patch_file(
    path: &Path,
    variables: &BTreeMap<String, String>,
    dry_run: bool,
) -> Result<BTreeSet<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let patched = patch_contents(&contents, variables);
    if patched.changed.is_empty() {
        tracing::debug!("Descriptor left unchanged: {}", path.display());
    } else if dry_run {
        tracing::debug!("Dry run, leaving descriptor unchanged: {}", path.display());
    } else {
        tracing::debug!(
            "Patched descriptor {} variables: {:?}",
            path.display(),
            patched.changed
        );
        std::fs::write(path, patched.to_contents())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(patched.changed)
}

/// Patch contents and append never-seen bindings before the anchor line.
///
/// Variables that were never an assignment target anywhere in the file are
/// inserted, in binding order, immediately before the first line matching
/// `anchor`. Fails if the anchor is absent; there is no other safe
/// insertion point.
pub fn add_missing_contents(
    contents: &str,
    variables: &BTreeMap<String, String>,
    anchor: &Regex,
) -> Result<Vec<String>> {
    let patched = patch_contents(contents, variables);
    let mut lines = patched.lines;

    let remaining: Vec<(&String, &String)> = variables
        .iter()
        .filter(|(variable, _)| !patched.seen.contains(*variable))
        .collect();
    if remaining.is_empty() {
        return Ok(lines);
    }

    let Some(anchor_index) = lines.iter().position(|line| anchor.is_match(line)) else {
        bail!("anchor pattern `{anchor}` not found; cannot add new variables");
    };

    for (offset, (variable, value)) in remaining.into_iter().enumerate() {
        lines.insert(anchor_index + offset, format!("{variable}={value}"));
    }

    Ok(lines)
}

/// Apply [`add_missing_contents`] to a file in place.
pub fn add_missing_file(
    path: &Path,
    variables: &BTreeMap<String, String>,
    anchor: &Regex,
) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut new_contents = add_missing_contents(&contents, variables, anchor)?.join("\n");
    new_contents.push('\n');

    if new_contents != contents {
        std::fs::write(path, new_contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Patch every descriptor referenced by a module tree.
///
/// Candidates are the introspected makefile list plus the conventional
/// release files; only candidates resolving to a path nested under
/// `base_path` are touched. Returns the files actually modified. Per-file
/// failures are logged and skipped so a single bad file does not abort
/// synchronization of the rest.
pub fn update_related_makefiles(
    base_path: &Path,
    makefile_list: &[PathBuf],
    variables: &BTreeMap<String, String>,
    dry_run: bool,
) -> Vec<PathBuf> {
    let mut candidates: BTreeSet<PathBuf> = makefile_list.iter().cloned().collect();
    for release_file in RELEASE_FILES {
        if base_path.join(release_file).exists() {
            candidates.insert(PathBuf::from(release_file));
        }
    }

    let mut patched = Vec::new();
    for candidate in candidates {
        let makefile_path = crate::util::paths::expand(base_path.join(&candidate));
        if makefile_path.strip_prefix(base_path).is_err() {
            tracing::debug!(
                "Skipping descriptor: {} (not relative to {})",
                makefile_path.display(),
                base_path.display()
            );
            continue;
        }

        match patch_file(&makefile_path, variables, dry_run) {
            Ok(changed) => {
                if !changed.is_empty() {
                    patched.push(makefile_path);
                }
            }
            Err(error) => {
                let permission_denied = error
                    .downcast_ref::<std::io::Error>()
                    .map(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
                    .unwrap_or(false);
                if permission_denied {
                    tracing::error!(
                        "Failed to patch descriptor due to permissions: {}",
                        makefile_path.display()
                    );
                } else {
                    tracing::error!(
                        "Failed to patch descriptor {}: {:#}",
                        makefile_path.display(),
                        error
                    );
                }
            }
        }
    }

    patched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_patch_simple() {
        let patched = patch_contents(
            "A=1\nB=2\nC=3",
            &bindings(&[("A", "1"), ("B", "5"), ("C", "7")]),
        );

        assert_eq!(patched.lines, vec!["A=1", "B=5", "C=7"]);
        assert_eq!(
            patched.changed,
            BTreeSet::from(["B".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_patch_unbound_variable_untouched() {
        let patched = patch_contents(
            "A=1\nB=2\nC=3",
            &bindings(&[("A", "1"), ("B", "5"), ("D", "7")]),
        );

        assert_eq!(patched.lines, vec!["A=1", "B=5", "C=3"]);
        assert_eq!(patched.changed, BTreeSet::from(["B".to_string()]));
        assert!(patched.seen.contains("C"));
    }

    #[test]
    fn test_patch_preserves_operator() {
        let patched = patch_contents(
            "A=1\nB:=2\nC?=3",
            &bindings(&[("A", "2"), ("B", "5"), ("C", "7")]),
        );

        assert_eq!(patched.lines, vec!["A=2", "B:=5", "C?=7"]);
        assert_eq!(
            patched.changed,
            BTreeSet::from(["A".to_string(), "B".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_patch_skips_comments_and_indented_lines() {
        let patched = patch_contents(
            "#A=1\n\tA=2\n A=3\nA=4",
            &bindings(&[("A", "9")]),
        );

        assert_eq!(patched.lines, vec!["#A=1", "\tA=2", " A=3", "A=9"]);
        assert_eq!(patched.changed, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let variables = bindings(&[("B", "5"), ("C", "7")]);
        let first = patch_contents("A=1\nB=2\nC=3", &variables);
        let second = patch_contents(&first.to_contents(), &variables);

        assert_eq!(second.lines, first.lines);
        assert!(second.changed.is_empty());
    }

    #[test]
    fn test_add_missing_before_anchor() {
        let anchor = Regex::new(r"^EPICS_BASE\s*=").unwrap();
        let lines = add_missing_contents(
            "A=1\nB=2\nC=3\nEPICS_BASE=",
            &bindings(&[("Q", "100")]),
            &anchor,
        )
        .unwrap();

        assert_eq!(lines, vec!["A=1", "B=2", "C=3", "Q=100", "EPICS_BASE="]);
    }

    #[test]
    fn test_add_missing_patches_and_adds() {
        let anchor = Regex::new(r"^EPICS_BASE\s*=").unwrap();
        let lines = add_missing_contents(
            "A=1\nB=2\nC=3\nEPICS_BASE=",
            &bindings(&[("A", "1"), ("B", "5"), ("C", "7"), ("D", "0")]),
            &anchor,
        )
        .unwrap();

        assert_eq!(lines, vec!["A=1", "B=5", "C=7", "D=0", "EPICS_BASE="]);
    }

    #[test]
    fn test_add_missing_preserves_binding_order() {
        let anchor = Regex::new(r"^EPICS_BASE\s*=").unwrap();
        let lines = add_missing_contents(
            "EPICS_BASE=",
            &bindings(&[("ALPHA", "1"), ("BETA", "2"), ("GAMMA", "3")]),
            &anchor,
        )
        .unwrap();

        assert_eq!(lines, vec!["ALPHA=1", "BETA=2", "GAMMA=3", "EPICS_BASE="]);
    }

    #[test]
    fn test_add_missing_requires_anchor() {
        let anchor = Regex::new(r"^EPICS_BASE\s*=").unwrap();
        let error =
            add_missing_contents("A=1", &bindings(&[("Q", "100")]), &anchor).unwrap_err();
        assert!(error.to_string().contains("anchor"));
    }

    #[test]
    fn test_patch_file_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let descriptor = tmp.path().join("RELEASE");
        std::fs::write(&descriptor, "A=1\nB=2\n").unwrap();

        let variables = bindings(&[("B", "5")]);
        let changed = patch_file(&descriptor, &variables, false).unwrap();
        assert_eq!(changed, BTreeSet::from(["B".to_string()]));

        let after_first = std::fs::read(&descriptor).unwrap();
        let changed = patch_file(&descriptor, &variables, false).unwrap();
        assert!(changed.is_empty());
        assert_eq!(std::fs::read(&descriptor).unwrap(), after_first);
    }

    #[test]
    fn test_patch_file_dry_run() {
        let tmp = tempfile::TempDir::new().unwrap();
        let descriptor = tmp.path().join("RELEASE");
        std::fs::write(&descriptor, "A=1\n").unwrap();

        let changed = patch_file(&descriptor, &bindings(&[("A", "2")]), true).unwrap();
        assert_eq!(changed, BTreeSet::from(["A".to_string()]));
        assert_eq!(std::fs::read_to_string(&descriptor).unwrap(), "A=1\n");
    }

    #[test]
    fn test_update_related_makefiles_stays_under_root() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("module");
        std::fs::create_dir_all(root.join("configure")).unwrap();
        std::fs::write(root.join("Makefile"), "ASYN=/old\n").unwrap();
        std::fs::write(root.join("configure/RELEASE"), "ASYN=/old\n").unwrap();

        let outside = tmp.path().join("outside.mk");
        std::fs::write(&outside, "ASYN=/old\n").unwrap();

        let variables = bindings(&[("ASYN", "/new")]);
        let patched = update_related_makefiles(
            &root,
            &[PathBuf::from("Makefile"), PathBuf::from("../outside.mk")],
            &variables,
            false,
        );

        assert_eq!(patched.len(), 2);
        assert!(std::fs::read_to_string(root.join("Makefile"))
            .unwrap()
            .contains("ASYN=/new"));
        assert!(std::fs::read_to_string(root.join("configure/RELEASE"))
            .unwrap()
            .contains("ASYN=/new"));
        // Escaping candidates are skipped.
        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "ASYN=/old\n");
    }

    #[test]
    fn test_update_related_makefiles_tolerates_missing_candidate() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("module");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("Makefile"), "A=1\n").unwrap();

        let patched = update_related_makefiles(
            &root,
            &[PathBuf::from("Makefile"), PathBuf::from("missing.mk")],
            &bindings(&[("A", "2")]),
            false,
        );

        assert_eq!(patched, vec![crate::util::paths::expand(root.join("Makefile"))]);
    }
}
