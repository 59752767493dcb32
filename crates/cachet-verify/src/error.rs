use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("unknown hash algorithm '{name}'")]
    UnknownAlgorithm { name: String },

    #[error("hash algorithm '{name}' requires the 'xxhash' feature")]
    MissingCapability { name: String },

    #[error("malformed hash specifier '{spec}': {reason}")]
    MalformedSpec { spec: String, reason: String },

    #[error("failed to hash '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, VerifyError>;
