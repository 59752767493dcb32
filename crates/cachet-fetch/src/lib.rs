//! Download transports for the cachet fetcher.
//!
//! A [`Transport`] moves bytes from a remote URL into exactly the local path
//! it is given and can probe a URL for availability without transferring the
//! body. Concrete implementations cover HTTP(S), FTP, SFTP, and
//! DOI-resolved data repositories; [`for_url`] selects one by URL scheme.
//!
//! Transports perform blocking I/O on the calling thread and own their
//! network handles for the duration of a single call. Temporary-file
//! placement, hash verification, and atomic renames belong to the caller.

pub use self::doi::{DoiTransport, RepositoryFile};
pub use self::error::{Result, TransportError};
pub use self::ftp::FtpTransport;
pub use self::http::HttpTransport;
pub use self::progress::{ProgressSink, TerminalProgress};
pub use self::retry::retry_delay;
pub use self::sftp::SftpTransport;
pub use self::transport::{for_url, for_url_with_progress, CredentialProvider, Transport};

mod doi;
mod error;
mod ftp;
mod http;
mod progress;
mod retry;
mod sftp;
mod transport;
