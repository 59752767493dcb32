use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use crate::error::{ArchiveError, Result};

/// Compression codecs understood by the decompressor and by tar archives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    Gzip,
    Bzip2,
    Xz,
}

impl CompressionMethod {
    /// Map a file suffix to its codec (`.gz`, `.bz2`, `.xz`, `.lzma`).
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "gz" => Some(Self::Gzip),
            "bz2" => Some(Self::Bzip2),
            "xz" | "lzma" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Sniff a codec from a file's magic bytes.
    pub fn detect(header: &[u8]) -> Option<Self> {
        match header {
            [0x1F, 0x8B, ..] => Some(Self::Gzip),
            [b'B', b'Z', b'h', ..] => Some(Self::Bzip2),
            [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(Self::Xz),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }

    /// Wrap a reader in the matching streaming decoder.
    pub fn decoder<R: Read>(self, reader: R) -> Decoder<R> {
        match self {
            Self::Gzip => Decoder::Gzip(Box::new(flate2::read::GzDecoder::new(reader))),
            Self::Bzip2 => Decoder::Bzip2(Box::new(bzip2::read::BzDecoder::new(reader))),
            Self::Xz => Decoder::Xz(Box::new(xz2::read::XzDecoder::new(reader))),
        }
    }
}

/// Streaming decoder wrapper, including a passthrough for plain tar.
pub enum Decoder<R: Read> {
    Passthrough(R),
    Gzip(Box<flate2::read::GzDecoder<R>>),
    Bzip2(Box<bzip2::read::BzDecoder<R>>),
    Xz(Box<xz2::read::XzDecoder<R>>),
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            Self::Gzip(d) => d.read(buf),
            Self::Bzip2(d) => d.read(buf),
            Self::Xz(d) => d.read(buf),
        }
    }
}

/// Sniff the codec of a seekable stream and rewind it.
pub fn detect_from_reader<R: Read + Seek>(reader: &mut R) -> io::Result<Option<CompressionMethod>> {
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    reader.rewind()?;
    Ok(CompressionMethod::detect(&header[..filled]))
}

/// Stream-decompress `src` into `dest` with the given codec.
///
/// `dest` is written directly; callers that need atomicity pass a temporary
/// sibling and rename afterwards.
pub fn decompress_to(src: &Path, dest: &Path, method: CompressionMethod) -> Result<()> {
    let input = File::open(src).map_err(|e| ArchiveError::Extract {
        path: src.to_path_buf(),
        source: e,
    })?;
    let mut decoder = method.decoder(input);
    let mut output = File::create(dest).map_err(|e| ArchiveError::Extract {
        path: dest.to_path_buf(),
        source: e,
    })?;
    io::copy(&mut decoder, &mut output).map_err(|e| {
        if e.kind() == io::ErrorKind::InvalidData {
            ArchiveError::Corrupted {
                path: src.to_path_buf(),
            }
        } else {
            ArchiveError::Extract {
                path: dest.to_path_buf(),
                source: e,
            }
        }
    })?;
    Ok(())
}
