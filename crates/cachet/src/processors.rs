use std::fs;
use std::path::{Path, PathBuf};

use cachet_archive::{decompress_to, extract_tar, extract_zip, walk_files, CompressionMethod};
use uuid::Uuid;

use crate::action::FetchAction;
use crate::error::ProcessorError;
use crate::manager::{native_relative, Cachet};

type ProcResult = std::result::Result<Processed, ProcessorError>;

/// What a fetch hands back: the file itself, or the paths a processor
/// produced in its place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Processed {
    Path(PathBuf),
    Paths(Vec<PathBuf>),
}

impl Processed {
    /// The single path, when there is exactly one.
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path),
            Self::Paths(paths) if paths.len() == 1 => paths.into_iter().next(),
            Self::Paths(_) => None,
        }
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            Self::Path(path) => vec![path],
            Self::Paths(paths) => paths,
        }
    }
}

/// A strategy for deriving artifacts from a fetched file.
///
/// Invoked by the fetch with the local path and what the fetch did to it;
/// the returned paths replace the original in the fetch's result. Derived
/// artifacts live beside the original, which is never modified.
///
/// Implementations must be idempotent: when `action` is
/// [`FetchAction::Fetched`] and the derived artifacts already exist, they
/// only recompute the return value.
pub trait Processor {
    fn process(
        &self,
        path: &Path,
        action: FetchAction,
        manager: &Cachet,
    ) -> std::result::Result<Processed, ProcessorError>;
}

/// How [`Decompress`] picks its codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecompressMethod {
    /// Infer from the file suffix (`.gz`, `.bz2`, `.xz`, `.lzma`).
    Auto,
    Gzip,
    Bzip2,
    Xz,
}

/// Decompress a fetched file into a sibling, `{name}.decomp` by default.
///
/// For zip and tar archives use [`Unzip`] and [`Untar`] instead.
pub struct Decompress {
    method: DecompressMethod,
    name: Option<String>,
}

impl Decompress {
    /// Auto-detect the codec from the file suffix.
    pub fn auto() -> Self {
        Self::new(DecompressMethod::Auto)
    }

    pub fn new(method: DecompressMethod) -> Self {
        Self { method, name: None }
    }

    /// Name the decompressed file (inside the fetched file's directory)
    /// instead of appending `.decomp`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn resolve_method(&self, path: &Path) -> std::result::Result<CompressionMethod, ProcessorError> {
        match self.method {
            DecompressMethod::Auto => CompressionMethod::from_extension(path).ok_or_else(|| {
                ProcessorError::UnknownSuffix {
                    path: path.to_path_buf(),
                }
            }),
            DecompressMethod::Gzip => Ok(CompressionMethod::Gzip),
            DecompressMethod::Bzip2 => Ok(CompressionMethod::Bzip2),
            DecompressMethod::Xz => Ok(CompressionMethod::Xz),
        }
    }
}

impl Processor for Decompress {
    fn process(&self, path: &Path, action: FetchAction, _manager: &Cachet) -> ProcResult {
        let output = match &self.name {
            Some(name) => path.parent().unwrap_or_else(|| Path::new(".")).join(name),
            None => append_suffix(path, ".decomp"),
        };

        if action.downloaded() || !output.exists() {
            let method = self.resolve_method(path)?;
            tracing::info!(
                src = %path.display(),
                dest = %output.display(),
                method = method.name(),
                "decompressing"
            );
            let tmp = output
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(format!(".tmp.{}.cachet", Uuid::new_v4()));
            if let Err(error) = decompress_to(path, &tmp, method) {
                let _ = fs::remove_file(&tmp);
                return Err(error.into());
            }
            fs::rename(&tmp, &output).map_err(|e| {
                let _ = fs::remove_file(&tmp);
                ProcessorError::Io {
                    path: output.clone(),
                    source: e,
                }
            })?;
        }

        Ok(Processed::Path(output))
    }
}

/// Unpack a fetched zip archive and return the extracted paths.
///
/// Extracts into `{name}.unzip` beside the archive unless `extract_dir`
/// names another sibling directory. With a member list, only those members
/// (files or whole directories) are extracted, and members that went missing
/// since an earlier call are re-extracted.
#[derive(Default)]
pub struct Unzip {
    members: Option<Vec<String>>,
    extract_dir: Option<String>,
}

impl Unzip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(mut self, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn extract_dir(mut self, dir: impl Into<String>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }
}

impl Processor for Unzip {
    fn process(&self, path: &Path, action: FetchAction, _manager: &Cachet) -> ProcResult {
        run_extractor(
            path,
            action,
            ".unzip",
            self.extract_dir.as_deref(),
            self.members.as_deref(),
            extract_zip,
        )
    }
}

/// Unpack a fetched tar archive (plain or gzip/bzip2/xz compressed) and
/// return the extracted paths. Mirrors [`Unzip`]; the default extraction
/// directory is `{name}.untar`.
#[derive(Default)]
pub struct Untar {
    members: Option<Vec<String>>,
    extract_dir: Option<String>,
}

impl Untar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(mut self, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn extract_dir(mut self, dir: impl Into<String>) -> Self {
        self.extract_dir = Some(dir.into());
        self
    }
}

impl Processor for Untar {
    fn process(&self, path: &Path, action: FetchAction, _manager: &Cachet) -> ProcResult {
        run_extractor(
            path,
            action,
            ".untar",
            self.extract_dir.as_deref(),
            self.members.as_deref(),
            extract_tar,
        )
    }
}

/// Shared engine behind [`Unzip`] and [`Untar`].
///
/// After a download everything requested is (re-)extracted. On a cached
/// fetch only members missing from the extraction directory are extracted,
/// so repeated calls with growing member lists never redo finished work and
/// never trust that an earlier call extracted a superset.
fn run_extractor(
    path: &Path,
    action: FetchAction,
    suffix: &str,
    extract_dir: Option<&str>,
    members: Option<&[String]>,
    extract: fn(&Path, &Path, Option<&[String]>) -> cachet_archive::Result<Vec<PathBuf>>,
) -> ProcResult {
    let dir = match extract_dir {
        Some(name) => path.parent().unwrap_or_else(|| Path::new(".")).join(name),
        None => append_suffix(path, suffix),
    };

    // `None` as a subset means "everything in the archive".
    let (should_extract, subset): (bool, Option<Vec<String>>) = if action.downloaded() {
        (true, members.map(<[String]>::to_vec))
    } else {
        match members {
            None => (!dir.exists(), None),
            Some(members) => {
                let missing: Vec<String> = members
                    .iter()
                    .filter(|member| !member_target(&dir, member).exists())
                    .cloned()
                    .collect();
                (!missing.is_empty(), Some(missing))
            }
        }
    };

    if should_extract {
        fs::create_dir_all(&dir).map_err(|e| ProcessorError::Io {
            path: dir.clone(),
            source: e,
        })?;
        extract(path, &dir, subset.as_deref())?;
    }

    let paths = match members {
        None => walk_files(&dir)?,
        Some(members) => {
            let mut paths = Vec::new();
            for member in members {
                let target = member_target(&dir, member);
                if target.is_dir() {
                    paths.extend(walk_files(&target)?);
                } else {
                    paths.push(target);
                }
            }
            paths
        }
    };
    Ok(Processed::Paths(paths))
}

/// Where a member lands below the extraction directory.
fn member_target(dir: &Path, member: &str) -> PathBuf {
    dir.join(native_relative(member.trim_end_matches('/')))
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_suffix_keeps_full_name() {
        assert_eq!(
            append_suffix(Path::new("/c/data.txt.gz"), ".decomp"),
            PathBuf::from("/c/data.txt.gz.decomp")
        );
        assert_eq!(
            append_suffix(Path::new("/c/archive.zip"), ".unzip"),
            PathBuf::from("/c/archive.zip.unzip")
        );
    }

    #[test]
    fn member_target_maps_separators() {
        let target = member_target(Path::new("/x"), "sub/dir/");
        let expected: PathBuf = ["/x", "sub", "dir"].iter().collect();
        assert_eq!(target, expected);
    }

    #[test]
    fn processed_into_path() {
        assert_eq!(
            Processed::Path(PathBuf::from("/a")).into_path(),
            Some(PathBuf::from("/a"))
        );
        assert_eq!(
            Processed::Paths(vec![PathBuf::from("/a")]).into_path(),
            Some(PathBuf::from("/a"))
        );
        assert_eq!(
            Processed::Paths(vec![PathBuf::from("/a"), PathBuf::from("/b")]).into_path(),
            None
        );
    }

    #[test]
    fn processed_into_paths_flattens() {
        assert_eq!(
            Processed::Path(PathBuf::from("/a")).into_paths(),
            vec![PathBuf::from("/a")]
        );
    }
}
