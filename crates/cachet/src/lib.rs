//! Declarative download, caching, and verification of remote data files.
//!
//! A [`Cachet`] binds a registry of logical file names (each with an
//! expected hash and optionally its own URL) to a local cache directory and
//! a remote base URL. [`Cachet::fetch`] returns the absolute path of a
//! verified local copy, downloading and post-processing only when needed:
//!
//! ```no_run
//! use cachet::{Cachet, HashSpec};
//!
//! # fn main() -> cachet::Result<()> {
//! let data = Cachet::builder(cachet::os_cache("myproject"))
//!     .base_url("https://example.org/data/{version}/")
//!     .version("v1.2.0")
//!     .record(
//!         "tiny-data.txt",
//!         HashSpec::parse("sha256:baee0894dba14b12085eacb204284b97e362f4f3e5a5807693cc90ef415c1b2d")?,
//!         None,
//!     )
//!     .build();
//!
//! let path = data.fetch("tiny-data.txt")?;
//! # let _ = path;
//! # Ok(())
//! # }
//! ```
//!
//! For a single ad-hoc file, [`retrieve`] skips the registry setup. Remote
//! sources can be HTTP(S), FTP, SFTP, or DOI-referenced data repositories
//! (figshare, Zenodo, Dataverse); fetched archives can be decompressed or
//! unpacked in place through [`Decompress`], [`Unzip`], and [`Untar`].
//!
//! Files are verified against the registry hash before use, downloads go
//! through a temporary sibling and an atomic rename, and nothing global is
//! touched: loggers and progress bars are injected, never ambient.

pub use cachet_fetch::{
    for_url, for_url_with_progress, CredentialProvider, DoiTransport, FtpTransport,
    HttpTransport, ProgressSink, SftpTransport, TerminalProgress, Transport,
};
pub use cachet_verify::{hash_file, HashAlgorithm, HashSpec};

pub use self::action::FetchAction;
pub use self::error::{Error, ProcessorError, Result, TransportError, VerifyError};
pub use self::location::{expand_user, os_cache};
pub use self::manager::{Cachet, CachetBuilder, FetchOptions};
pub use self::processors::{
    Decompress, DecompressMethod, Processed, Processor, Untar, Unzip,
};
pub use self::registry::{Registry, RegistryEntry};
pub use self::retrieve::{retrieve, RetrieveOptions};
pub use self::urls::{is_dev_version, substitute_version};

mod action;
mod error;
mod location;
mod manager;
mod processors;
mod registry;
mod retrieve;
mod urls;
