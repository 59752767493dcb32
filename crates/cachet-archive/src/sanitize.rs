use std::path::{Component, Path, PathBuf};

use crate::error::{ArchiveError, Result};

/// Resolve an archive entry path against the extraction base, rejecting
/// anything that would land outside it (absolute paths, `..` escapes).
pub fn sanitize_entry_path(entry_path: &Path, base: &Path) -> Result<PathBuf> {
    let normalized = normalize(entry_path);

    if normalized.is_absolute() || normalized.starts_with("..") {
        return Err(ArchiveError::PathEscape {
            entry: entry_path.to_path_buf(),
            resolved: normalized,
        });
    }

    Ok(base.join(normalized))
}

/// Resolve a symlink target relative to its location, rejecting absolute
/// targets and targets that escape the extraction base.
pub fn sanitize_symlink_target(
    target: &Path,
    symlink_location: &Path,
    base: &Path,
) -> Result<PathBuf> {
    if target.is_absolute() {
        return Err(ArchiveError::SymlinkEscape {
            target: target.to_path_buf(),
            resolved: target.to_path_buf(),
        });
    }

    let resolved = symlink_location
        .parent()
        .map(|p| p.join(target))
        .unwrap_or_else(|| base.join(target));
    let resolved = normalize(&resolved);

    if !resolved.starts_with(base) {
        return Err(ArchiveError::SymlinkEscape {
            target: target.to_path_buf(),
            resolved,
        });
    }

    Ok(resolved)
}

/// Lexically collapse `.` and `..` components without touching the
/// filesystem. `..` that would climb past the start of the path is kept, so
/// callers can detect escapes with a prefix check.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                let can_pop = matches!(
                    result.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    result.pop();
                } else {
                    result.push("..");
                }
            }
            Component::CurDir => {}
            Component::Normal(part) => result.push(part),
            Component::RootDir | Component::Prefix(_) => {
                result.push(component.as_os_str());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        Path::new("/cache/data.zip.unzip")
    }

    #[test]
    fn plain_entry_resolves_under_base() {
        let resolved = sanitize_entry_path(Path::new("a/b.txt"), base()).unwrap();
        assert_eq!(resolved, base().join("a/b.txt"));
    }

    #[test]
    fn dot_components_are_collapsed() {
        let resolved = sanitize_entry_path(Path::new("a/./b/../c.txt"), base()).unwrap();
        assert_eq!(resolved, base().join("a/c.txt"));
    }

    #[test]
    fn absolute_entry_rejected() {
        let err = sanitize_entry_path(Path::new("/etc/passwd"), base()).unwrap_err();
        assert!(matches!(err, ArchiveError::PathEscape { .. }));
    }

    #[test]
    fn parent_escape_rejected() {
        let err = sanitize_entry_path(Path::new("../../etc/passwd"), base()).unwrap_err();
        assert!(matches!(err, ArchiveError::PathEscape { .. }));
    }

    #[test]
    fn escape_through_nested_dirs_rejected() {
        let err = sanitize_entry_path(Path::new("a/../../../../tmp/x"), base()).unwrap_err();
        assert!(matches!(err, ArchiveError::PathEscape { .. }));
    }

    #[test]
    fn symlink_relative_target_allowed() {
        let location = base().join("bin/link");
        let resolved =
            sanitize_symlink_target(Path::new("../lib/real"), &location, base()).unwrap();
        assert!(resolved.starts_with(base()));
    }

    #[test]
    fn symlink_absolute_target_rejected() {
        let location = base().join("bin/link");
        let err =
            sanitize_symlink_target(Path::new("/etc/passwd"), &location, base()).unwrap_err();
        assert!(matches!(err, ArchiveError::SymlinkEscape { .. }));
    }

    #[test]
    fn symlink_escaping_target_rejected() {
        let location = base().join("link");
        let err =
            sanitize_symlink_target(Path::new("../../outside"), &location, base()).unwrap_err();
        assert!(matches!(err, ArchiveError::SymlinkEscape { .. }));
    }
}
