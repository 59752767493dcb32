use std::fs::File;
use std::io::Read;
use std::path::Path;

use digest::Digest;

use crate::error::{Result, VerifyError};

/// Read buffer for streaming file hashes. Keeps memory constant for
/// arbitrarily large files.
const CHUNK_SIZE: usize = 65_536;

/// Digest algorithms understood by hash specifiers.
///
/// Construction from a name fails for algorithms this build does not carry,
/// so an unusable algorithm is rejected before any file is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha1,
    Md5,
    Sha512,
    #[cfg(feature = "xxhash")]
    Xxh64,
    #[cfg(feature = "xxhash")]
    Xxh128,
}

impl HashAlgorithm {
    /// Look up an algorithm by its specifier name (`sha256`, `md5`, ...).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha1" => Ok(Self::Sha1),
            "md5" => Ok(Self::Md5),
            "sha512" => Ok(Self::Sha512),
            #[cfg(feature = "xxhash")]
            "xxh64" => Ok(Self::Xxh64),
            #[cfg(feature = "xxhash")]
            "xxh128" => Ok(Self::Xxh128),
            #[cfg(not(feature = "xxhash"))]
            "xxh64" | "xxh128" => Err(VerifyError::MissingCapability {
                name: name.to_string(),
            }),
            _ => Err(VerifyError::UnknownAlgorithm {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
            Self::Sha512 => "sha512",
            #[cfg(feature = "xxhash")]
            Self::Xxh64 => "xxh64",
            #[cfg(feature = "xxhash")]
            Self::Xxh128 => "xxh128",
        }
    }

    /// Length of this algorithm's digest in lowercase hex characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha1 => 40,
            Self::Md5 => 32,
            Self::Sha512 => 128,
            #[cfg(feature = "xxhash")]
            Self::Xxh64 => 16,
            #[cfg(feature = "xxhash")]
            Self::Xxh128 => 32,
        }
    }

    pub fn hasher(&self) -> Hasher {
        match self {
            Self::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            Self::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            Self::Md5 => Hasher::Md5(md5::Md5::new()),
            Self::Sha512 => Hasher::Sha512(sha2::Sha512::new()),
            #[cfg(feature = "xxhash")]
            Self::Xxh64 => Hasher::Xxh64(xxhash_rust::xxh64::Xxh64::new(0)),
            #[cfg(feature = "xxhash")]
            Self::Xxh128 => Hasher::Xxh128(xxhash_rust::xxh3::Xxh3::new()),
        }
    }
}

/// Incremental hash state, tagged by algorithm.
///
/// The `digest`-family algorithms share one update path; the xxhash variants
/// carry their own state types since they do not implement `digest::Digest`.
pub enum Hasher {
    Sha256(sha2::Sha256),
    Sha1(sha1::Sha1),
    Md5(md5::Md5),
    Sha512(sha2::Sha512),
    #[cfg(feature = "xxhash")]
    Xxh64(xxhash_rust::xxh64::Xxh64),
    #[cfg(feature = "xxhash")]
    Xxh128(xxhash_rust::xxh3::Xxh3),
}

impl Hasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Md5(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            #[cfg(feature = "xxhash")]
            Self::Xxh64(h) => h.update(data),
            #[cfg(feature = "xxhash")]
            Self::Xxh128(h) => h.update(data),
        }
    }

    /// Finalize and return the digest as lowercase hex. Consumes self to
    /// prevent reuse.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
            #[cfg(feature = "xxhash")]
            Self::Xxh64(h) => format!("{:016x}", h.digest()),
            #[cfg(feature = "xxhash")]
            Self::Xxh128(h) => format!("{:032x}", h.digest128()),
        }
    }
}

/// Compute the digest of a file under the given algorithm.
///
/// Streams the file in bounded chunks; the result is always lowercase hex.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let mut file = File::open(path).map_err(|e| VerifyError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| VerifyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize_hex())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn from_name_known_algorithms() {
        assert_eq!(HashAlgorithm::from_name("sha256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_name("SHA256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_name("sha1").unwrap(), HashAlgorithm::Sha1);
        assert_eq!(HashAlgorithm::from_name("md5").unwrap(), HashAlgorithm::Md5);
        assert_eq!(HashAlgorithm::from_name("sha512").unwrap(), HashAlgorithm::Sha512);
    }

    #[test]
    fn from_name_unknown_algorithm() {
        let err = HashAlgorithm::from_name("crc32").unwrap_err();
        assert!(matches!(err, VerifyError::UnknownAlgorithm { .. }));
    }

    #[cfg(not(feature = "xxhash"))]
    #[test]
    fn from_name_xxhash_without_feature() {
        let err = HashAlgorithm::from_name("xxh64").unwrap_err();
        assert!(matches!(err, VerifyError::MissingCapability { .. }));
    }

    #[cfg(feature = "xxhash")]
    #[test]
    fn from_name_xxhash_with_feature() {
        assert_eq!(HashAlgorithm::from_name("xxh64").unwrap(), HashAlgorithm::Xxh64);
        assert_eq!(HashAlgorithm::from_name("xxh128").unwrap(), HashAlgorithm::Xxh128);
    }

    #[test]
    fn hash_file_sha256_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"content of the file").unwrap();
        drop(f);
        assert_eq!(
            hash_file(&path, HashAlgorithm::Sha256).unwrap(),
            "0fc74468e6a9a829f103d069aeb2bb4f8646bad58bf146bb0e3379b759ec4a00"
        );
    }

    #[test]
    fn hash_file_md5_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(
            hash_file(&path, HashAlgorithm::Md5).unwrap(),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    #[test]
    fn hash_file_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let streamed = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        let mut hasher = HashAlgorithm::Sha256.hasher();
        hasher.update(&data);
        assert_eq!(streamed, hasher.finalize_hex());
    }

    #[test]
    fn hash_file_missing_file() {
        let err = hash_file(Path::new("/no/such/file"), HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, VerifyError::Io { .. }));
    }

    #[test]
    fn digests_are_lowercase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"ABC").unwrap();
        let digest = hash_file(&path, HashAlgorithm::Sha1).unwrap();
        assert_eq!(digest, digest.to_lowercase());
        assert_eq!(digest.len(), HashAlgorithm::Sha1.hex_len());
    }
}
