use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

mod tar;
mod zip;

pub use self::tar::extract_tar;
pub use self::zip::extract_zip;

/// Whether an archive entry belongs to a requested member.
///
/// A member may name a single entry or a directory inside the archive; for a
/// directory, everything below it matches. Trailing slashes on either side
/// are ignored.
pub(crate) fn entry_matches_member(entry_name: &str, member: &str) -> bool {
    let entry = entry_name.trim_end_matches('/');
    let member = member.trim_end_matches('/');
    entry == member || entry.starts_with(member) && entry.as_bytes().get(member.len()) == Some(&b'/')
}

/// Recursively list the files below `root`, sorted for determinism.
/// Directories themselves are not listed; symlinks are.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_matching_exact() {
        assert!(entry_matches_member("a.txt", "a.txt"));
        assert!(!entry_matches_member("a.txt.bak", "a.txt"));
        assert!(!entry_matches_member("a", "a.txt"));
    }

    #[test]
    fn member_matching_directories() {
        assert!(entry_matches_member("data/", "data"));
        assert!(entry_matches_member("data/inner.txt", "data"));
        assert!(entry_matches_member("data/sub/deep.txt", "data/"));
        assert!(!entry_matches_member("database/x.txt", "data"));
    }

    #[test]
    fn walk_files_lists_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/deep.txt"), b"x").unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b/c/deep.txt")]
        );
    }

    #[test]
    fn walk_files_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_files(dir.path()).unwrap().is_empty());
    }
}
