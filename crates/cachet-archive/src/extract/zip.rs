use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::sanitize::sanitize_entry_path;

use super::entry_matches_member;

/// Extract a zip archive (or a subset of its members) into `extract_dir`.
///
/// Returns the paths of the files written, in archive order. Every entry
/// path is validated against `extract_dir` before anything is written.
pub fn extract_zip(
    archive_path: &Path,
    extract_dir: &Path,
    members: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::Extract {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ::zip::ZipArchive::new(file).map_err(|_| ArchiveError::Corrupted {
        path: archive_path.to_path_buf(),
    })?;

    let selected = select_indices(&archive, archive_path, members)?;

    tracing::info!(
        archive = %archive_path.display(),
        dir = %extract_dir.display(),
        entries = selected.len(),
        "unzipping"
    );

    let mut extracted = Vec::new();
    for index in selected {
        let mut entry = archive.by_index(index).map_err(|_| ArchiveError::Corrupted {
            path: archive_path.to_path_buf(),
        })?;
        let raw_path = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::PathEscape {
                entry: PathBuf::from(entry.name()),
                resolved: PathBuf::from(entry.name()),
            })?;
        let target = sanitize_entry_path(&raw_path, extract_dir)?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target).map_err(|e| ArchiveError::Extract {
            path: target.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::Extract {
            path: target.clone(),
            source: e,
        })?;
        extracted.push(target);
    }

    Ok(extracted)
}

/// Pick the entry indices to extract. With no member list, everything; with
/// one, every entry equal to or below each member, failing if a member
/// matches nothing.
fn select_indices<R: io::Read + io::Seek>(
    archive: &::zip::ZipArchive<R>,
    archive_path: &Path,
    members: Option<&[String]>,
) -> Result<Vec<usize>> {
    let Some(members) = members else {
        return Ok((0..archive.len()).collect());
    };

    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let mut indices = Vec::new();
    for member in members {
        let matched: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, name)| entry_matches_member(name, member))
            .map(|(i, _)| i)
            .collect();
        if matched.is_empty() {
            return Err(ArchiveError::MemberNotFound {
                member: member.clone(),
                path: archive_path.to_path_buf(),
            });
        }
        indices.extend(matched);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}
