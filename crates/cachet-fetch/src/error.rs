use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no transport for URL scheme '{scheme}' in '{url}'")]
    UnsupportedScheme { scheme: String, url: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {message}")]
    Client { message: String },

    #[error("HTTP {status} while fetching '{url}'")]
    HttpStatus { status: u16, url: String },

    #[error("network error for '{url}': {message}")]
    Network { url: String, message: String },

    #[error("FTP error for '{url}': {message}")]
    Ftp { url: String, message: String },

    #[error("SFTP error for '{url}': {message}")]
    Sftp { url: String, message: String },

    #[error("doi:{doi} resolves to '{host}', which is not a supported data repository")]
    DoiUnsupported { doi: String, host: String },

    #[error("doi:{doi} names a collection, not a dataset; fetch the member dataset's DOI instead")]
    DoiNotDataset { doi: String },

    #[error("file '{filename}' not found in doi:{doi}; available files: {available:?}")]
    DoiFileNotFound {
        doi: String,
        filename: String,
        available: Vec<String>,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Whether the failure is transient enough that the fetch loop should
    /// try again. Bad URLs, unknown schemes, unusable DOIs, and local write
    /// failures never heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. }
                | Self::Network { .. }
                | Self::Ftp { .. }
                | Self::Sftp { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
