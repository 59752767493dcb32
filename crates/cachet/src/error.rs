use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use cachet_archive::ArchiveError;
pub use cachet_fetch::TransportError;
pub use cachet_verify::VerifyError;

/// Errors surfaced by fetching and the retrieve façade.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file '{name}' is not in the registry")]
    UnknownFile { name: String },

    #[error("no URL for '{name}': entry has no per-file URL and no base URL is configured")]
    NoUrl { name: String },

    #[error("malformed registry '{source_name}' at line {line}: {reason}")]
    MalformedRegistry {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// Transport-level failure, including unsupported schemes and DOI
    /// resolution problems. Only the retryable subset re-enters the
    /// download loop.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(
        "hash mismatch for downloaded file '{name}': expected {expected}, got {actual}"
    )]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error(
        "existing file '{path}' does not match the registered hash \
         (expected {expected}, got {actual}) and updates are disabled"
    )]
    HashMismatchLocal {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("cache path '{path}' is unusable: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl Error {
    /// Whether the fetch loop may retry after this error. Transient
    /// transport failures and freshly-downloaded hash mismatches qualify;
    /// everything else surfaces immediately.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(t) => t.is_retryable(),
            Self::HashMismatch { .. } => true,
            _ => false,
        }
    }
}

/// A post-processor could not produce its derived artifact. The fetched
/// original is left in place.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("cannot infer the compression of '{path}' from its suffix")]
    UnknownSuffix { path: PathBuf },

    #[error("failed to write derived artifact '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
