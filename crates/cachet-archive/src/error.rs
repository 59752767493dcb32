use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive entry '{entry}' resolves outside the extraction directory ('{resolved}')")]
    PathEscape { entry: PathBuf, resolved: PathBuf },

    #[error("symlink target escapes extraction directory: '{target}' -> '{resolved}'")]
    SymlinkEscape { target: PathBuf, resolved: PathBuf },

    #[error("archive '{path}' is corrupted or not in the expected format")]
    Corrupted { path: PathBuf },

    #[error("member '{member}' not found in archive '{path}'")]
    MemberNotFound { member: String, path: PathBuf },

    #[error("unrecognized compression for '{path}': expected a gzip, bzip2, or xz suffix")]
    UnknownCompression { path: PathBuf },

    #[error("failed to extract '{path}': {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
