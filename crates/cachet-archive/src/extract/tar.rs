use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::{detect_from_reader, Decoder};
use crate::error::{ArchiveError, Result};
use crate::sanitize::{sanitize_entry_path, sanitize_symlink_target};

use super::entry_matches_member;

/// Extract a tar archive (or a subset of its members) into `extract_dir`.
///
/// The compression codec (plain, gzip, bzip2, xz) is sniffed from the
/// archive's magic bytes. Returns the paths of the files written, in archive
/// order.
pub fn extract_tar(
    archive_path: &Path,
    extract_dir: &Path,
    members: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    let mut file = File::open(archive_path).map_err(|e| ArchiveError::Extract {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let reader = match detect_from_reader(&mut file)? {
        Some(codec) => codec.decoder(file),
        None => Decoder::Passthrough(file),
    };
    let mut archive = tar::Archive::new(reader);

    tracing::info!(
        archive = %archive_path.display(),
        dir = %extract_dir.display(),
        "untarring"
    );

    let mut matched = vec![false; members.map_or(0, |m| m.len())];
    let mut extracted = Vec::new();

    for entry in archive.entries().map_err(|_| ArchiveError::Corrupted {
        path: archive_path.to_path_buf(),
    })? {
        let mut entry = entry.map_err(|_| ArchiveError::Corrupted {
            path: archive_path.to_path_buf(),
        })?;
        let raw_path = entry
            .path()
            .map_err(|_| ArchiveError::Corrupted {
                path: archive_path.to_path_buf(),
            })?
            .into_owned();

        if let Some(members) = members {
            let entry_name = raw_path.to_string_lossy();
            let mut wanted = false;
            for (i, member) in members.iter().enumerate() {
                if entry_matches_member(&entry_name, member) {
                    matched[i] = true;
                    wanted = true;
                }
            }
            if !wanted {
                continue;
            }
        }

        let target = sanitize_entry_path(&raw_path, extract_dir)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry_type.is_symlink() {
            let link_target = entry
                .link_name()
                .map_err(|_| ArchiveError::Corrupted {
                    path: archive_path.to_path_buf(),
                })?
                .ok_or_else(|| ArchiveError::Corrupted {
                    path: archive_path.to_path_buf(),
                })?;
            let resolved = sanitize_symlink_target(&link_target, &target, extract_dir)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            create_symlink(&resolved, &target)?;
            extracted.push(target);
        } else if entry_type.is_file() {
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
        } else {
            tracing::debug!(entry = %raw_path.display(), "skipping special tar entry");
        }
    }

    if let Some(members) = members {
        for (i, member) in members.iter().enumerate() {
            if !matched[i] {
                return Err(ArchiveError::MemberNotFound {
                    member: member.clone(),
                    path: archive_path.to_path_buf(),
                });
            }
        }
    }

    Ok(extracted)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    if link.exists() || link.is_symlink() {
        fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link).map_err(|e| ArchiveError::Extract {
        path: link.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    // Symlink creation needs elevated rights on Windows; fall back to
    // copying the resolved target when it exists.
    if target.exists() {
        fs::copy(target, link).map_err(|e| ArchiveError::Extract {
            path: link.to_path_buf(),
            source: e,
        })?;
        return Ok(());
    }
    Err(ArchiveError::Extract {
        path: link.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symlink entries are not supported on this platform",
        ),
    })
}
