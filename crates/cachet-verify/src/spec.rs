use std::fmt;
use std::path::Path;

use crate::algorithm::{hash_file, HashAlgorithm};
use crate::error::{Result, VerifyError};

/// The expected digest of a registry entry.
///
/// Text forms: `<algorithm>:<hex>`, bare `<hex>` (implies sha256), or the
/// literal `unknown`, which disables verification for the entry entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashSpec {
    /// Never verify; a mismatch is not observable for this entry.
    Unknown,
    Digest {
        algorithm: HashAlgorithm,
        /// Lowercase hex, length matching `algorithm.hex_len()`.
        digest: String,
    },
}

impl HashSpec {
    /// Parse a hash specifier. Digests compare case-insensitively and are
    /// stored lowercase; a bare digest implies sha256.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("unknown") {
            return Ok(Self::Unknown);
        }
        let (algorithm, digest) = match spec.split_once(':') {
            Some((name, digest)) => (HashAlgorithm::from_name(name)?, digest),
            None => (HashAlgorithm::Sha256, spec),
        };
        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VerifyError::MalformedSpec {
                spec: spec.to_string(),
                reason: "digest is not a hex string".to_string(),
            });
        }
        if digest.len() != algorithm.hex_len() {
            return Err(VerifyError::MalformedSpec {
                spec: spec.to_string(),
                reason: format!(
                    "{} digests are {} hex characters, got {}",
                    algorithm.name(),
                    algorithm.hex_len(),
                    digest.len()
                ),
            });
        }
        Ok(Self::Digest {
            algorithm,
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// Whether `spec` would parse; used by the registry line grammar to pick
    /// out the hash token without committing to an error.
    pub fn is_valid(spec: &str) -> bool {
        Self::parse(spec).is_ok()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            Self::Unknown => None,
            Self::Digest { algorithm, .. } => Some(*algorithm),
        }
    }

    /// Compare against an already-computed hex digest. The sentinel matches
    /// everything.
    pub fn matches_hex(&self, actual: &str) -> bool {
        match self {
            Self::Unknown => true,
            Self::Digest { digest, .. } => digest.eq_ignore_ascii_case(actual.trim()),
        }
    }

    /// Hash the file at `path` and compare. The sentinel returns `true`
    /// without touching the file.
    pub fn matches_path(&self, path: &Path) -> Result<bool> {
        match self {
            Self::Unknown => Ok(true),
            Self::Digest { algorithm, digest } => {
                let actual = hash_file(path, *algorithm)?;
                Ok(digest == &actual)
            }
        }
    }
}

impl fmt::Display for HashSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Digest { algorithm, digest } => {
                write!(f, "{}:{}", algorithm.name(), digest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256_OF_EMPTY: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn parse_bare_digest_defaults_to_sha256() {
        let spec = HashSpec::parse(SHA256_OF_EMPTY).unwrap();
        assert_eq!(spec.algorithm(), Some(HashAlgorithm::Sha256));
        assert_eq!(spec.to_string(), format!("sha256:{SHA256_OF_EMPTY}"));
    }

    #[test]
    fn parse_prefixed_digest() {
        let spec = HashSpec::parse("md5:70e2afd3fd7e336ae478b1e740a5f08e").unwrap();
        assert_eq!(spec.algorithm(), Some(HashAlgorithm::Md5));
    }

    #[test]
    fn parse_uppercase_digest_stored_lowercase() {
        let spec = HashSpec::parse(&SHA256_OF_EMPTY.to_uppercase()).unwrap();
        match &spec {
            HashSpec::Digest { digest, .. } => assert_eq!(digest, SHA256_OF_EMPTY),
            _ => panic!("expected digest"),
        }
    }

    #[test]
    fn parse_unknown_sentinel() {
        assert!(HashSpec::parse("unknown").unwrap().is_unknown());
        assert!(HashSpec::parse("UNKNOWN").unwrap().is_unknown());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let err = HashSpec::parse("sha256:nothexatall").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedSpec { .. }));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = HashSpec::parse("sha256:abcd").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedSpec { .. }));
    }

    #[test]
    fn parse_rejects_unknown_algorithm() {
        let err = HashSpec::parse("whirlpool:abcd").unwrap_err();
        assert!(matches!(err, VerifyError::UnknownAlgorithm { .. }));
    }

    #[test]
    fn matches_hex_is_case_insensitive() {
        let spec = HashSpec::parse(SHA256_OF_EMPTY).unwrap();
        assert!(spec.matches_hex(&SHA256_OF_EMPTY.to_uppercase()));
        assert!(!spec.matches_hex("deadbeef"));
    }

    #[test]
    fn sentinel_matches_everything_without_io() {
        let spec = HashSpec::Unknown;
        assert!(spec.matches_hex("anything"));
        // No file at this path; the sentinel must not try to read it.
        assert!(spec.matches_path(Path::new("/no/such/file")).unwrap());
    }

    #[test]
    fn matches_path_against_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        let spec = HashSpec::parse(SHA256_OF_EMPTY).unwrap();
        assert!(spec.matches_path(&path).unwrap());

        std::fs::write(&path, b"changed").unwrap();
        assert!(!spec.matches_path(&path).unwrap());
    }

    #[test]
    fn is_valid_filters_filename_lookalikes() {
        assert!(HashSpec::is_valid(SHA256_OF_EMPTY));
        assert!(HashSpec::is_valid("unknown"));
        assert!(!HashSpec::is_valid("cafe"));
        assert!(!HashSpec::is_valid("data.txt"));
        assert!(!HashSpec::is_valid("http://example.org/x"));
    }
}
