//! Content hashing for downloaded artifacts.
//!
//! Provides streaming file digests under a closed set of algorithms and the
//! `algorithm:hexdigest` specifier grammar used by registries. Digests are
//! always lowercase hex; comparison is case-insensitive. The `unknown`
//! sentinel disables verification for an entry without disabling the entry.

pub use self::algorithm::{hash_file, HashAlgorithm, Hasher};
pub use self::error::{Result, VerifyError};
pub use self::spec::HashSpec;

mod algorithm;
mod error;
mod spec;
