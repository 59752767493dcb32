//! Archive extraction and decompression primitives.
//!
//! Everything here works on already-downloaded files: sniffing compression
//! codecs, streaming single-file decompression, and member-selective zip/tar
//! extraction. Entry paths are validated before any write, so a hostile
//! archive cannot place files outside its extraction directory.

pub use self::codec::{decompress_to, detect_from_reader, CompressionMethod, Decoder};
pub use self::error::{ArchiveError, Result};
pub use self::extract::{extract_tar, extract_zip, walk_files};
pub use self::sanitize::{sanitize_entry_path, sanitize_symlink_target};

mod codec;
mod error;
mod extract;
mod sanitize;
