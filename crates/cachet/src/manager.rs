use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use cachet_fetch::{for_url, retry_delay, Transport};
use cachet_verify::{hash_file, HashAlgorithm, HashSpec};
use uuid::Uuid;

use crate::action::FetchAction;
use crate::error::{Error, Result};
use crate::location::resolve_cache_root;
use crate::processors::{Processed, Processor};
use crate::registry::{Registry, RegistryEntry};
use crate::urls::full_url;

/// Optional per-call collaborators for [`Cachet::fetch_with`].
#[derive(Default)]
pub struct FetchOptions<'a> {
    /// Overrides the scheme-based transport selection.
    pub transport: Option<&'a dyn Transport>,
    /// Transforms the fetched file and substitutes the returned paths.
    pub processor: Option<&'a dyn Processor>,
}

/// Manager for a local cache of remote data files.
///
/// Holds the cache descriptor (root, base URL, version, overrides) and the
/// registry, and guarantees that [`fetch`](Self::fetch) returns the absolute
/// path of a verified local copy, downloading only when needed.
///
/// Construction never touches the filesystem; the cache directory is created
/// lazily by the first fetch. Instances are not internally synchronized
/// across processes: two concurrent fetches of the same verified file both
/// succeed and the last atomic rename wins with identical bytes.
pub struct Cachet {
    cache_root: PathBuf,
    base_url: Option<String>,
    version: Option<String>,
    version_dev: String,
    env_override: Option<String>,
    retry_count: u32,
    allow_updates: bool,
    registry: Registry,
}

impl Cachet {
    pub fn builder(cache_root: impl Into<PathBuf>) -> CachetBuilder {
        CachetBuilder::new(cache_root)
    }

    /// The effective cache root for a fetch issued now: environment
    /// override, `~` expansion, and version segment applied.
    pub fn cache_root(&self) -> PathBuf {
        resolve_cache_root(
            &self.cache_root,
            self.env_override.as_deref(),
            self.version.as_deref(),
            &self.version_dev,
        )
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Load additional registry entries from a file on disk.
    pub fn load_registry(&mut self, path: &Path) -> Result<()> {
        self.registry.load_path(path)
    }

    /// The full remote URL a fetch of `name` would use.
    pub fn get_url(&self, name: &str) -> Result<String> {
        let entry = self.entry(name)?;
        self.url_for(name, entry)
    }

    /// Get the absolute path to a verified local copy of `name`, downloading
    /// it first if it is absent or stale.
    pub fn fetch(&self, name: &str) -> Result<PathBuf> {
        Ok(self.fetch_inner(name, None)?.0)
    }

    /// [`fetch`](Self::fetch) with a custom transport and/or post-processor.
    pub fn fetch_with(&self, name: &str, options: &FetchOptions<'_>) -> Result<Processed> {
        let (path, action) = self.fetch_inner(name, options.transport)?;
        match options.processor {
            Some(processor) => Ok(processor.process(&path, action, self)?),
            None => Ok(Processed::Path(path)),
        }
    }

    /// Probe whether `name` can currently be downloaded, without
    /// transferring it.
    pub fn is_available(&self, name: &str, transport: Option<&dyn Transport>) -> Result<bool> {
        let entry = self.entry(name)?;
        let url = self.url_for(name, entry)?;
        let available = match transport {
            Some(transport) => transport.is_available(&url)?,
            None => for_url(&url)?.is_available(&url)?,
        };
        Ok(available)
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry> {
        self.registry.get(name).ok_or_else(|| Error::UnknownFile {
            name: name.to_string(),
        })
    }

    fn url_for(&self, name: &str, entry: &RegistryEntry) -> Result<String> {
        full_url(
            name,
            entry,
            self.base_url.as_deref(),
            self.version.as_deref(),
            &self.version_dev,
        )
        .ok_or_else(|| Error::NoUrl {
            name: name.to_string(),
        })
    }

    fn fetch_inner(
        &self,
        name: &str,
        transport: Option<&dyn Transport>,
    ) -> Result<(PathBuf, FetchAction)> {
        let entry = self.entry(name)?;
        let url = self.url_for(name, entry)?;

        let root = self.cache_root();
        fs::create_dir_all(&root).map_err(|e| Error::Path {
            path: root.clone(),
            source: e,
        })?;
        let local_path = root.join(native_relative(name));
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Path {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let action = self.classify(&local_path, &entry.hash)?;
        if action.downloaded() {
            tracing::info!(name, url = %url, path = %local_path.display(), %action, "fetching remote file");
            self.download(name, &url, &local_path, &entry.hash, transport)?;
        } else {
            tracing::debug!(name, path = %local_path.display(), "local file is up to date");
        }

        Ok((local_path, action))
    }

    /// Step 2 of a fetch: decide whether the local file can be used as-is.
    fn classify(&self, local_path: &Path, expected: &HashSpec) -> Result<FetchAction> {
        if !local_path.exists() {
            return Ok(FetchAction::Downloaded);
        }
        let Some(algorithm) = expected.algorithm() else {
            // Sentinel entry: an existing file is always acceptable.
            return Ok(FetchAction::Fetched);
        };
        let actual = hash_file(local_path, algorithm)?;
        if expected.matches_hex(&actual) {
            Ok(FetchAction::Fetched)
        } else if self.allow_updates {
            Ok(FetchAction::Updated)
        } else {
            Err(Error::HashMismatchLocal {
                path: local_path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            })
        }
    }

    /// Steps 3-5: download to a sibling temporary, verify, retry transient
    /// failures with backoff, then atomically publish.
    fn download(
        &self,
        name: &str,
        url: &str,
        local_path: &Path,
        expected: &HashSpec,
        transport: Option<&dyn Transport>,
    ) -> Result<()> {
        let selected;
        let transport: &dyn Transport = match transport {
            Some(transport) => transport,
            None => {
                selected = for_url(url)?;
                selected.as_ref()
            }
        };

        let tmp = temp_sibling(local_path);
        let mut attempt = 0u32;
        let outcome = loop {
            match self.attempt(name, url, transport, &tmp, expected) {
                Ok(()) => break Ok(()),
                Err(error) if attempt < self.retry_count && error.is_retryable() => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        name,
                        url = %url,
                        attempt,
                        ?delay,
                        %error,
                        "download failed, retrying"
                    );
                    let _ = fs::remove_file(&tmp);
                    thread::sleep(delay);
                }
                Err(error) => break Err(error),
            }
        };
        if let Err(error) = outcome {
            let _ = fs::remove_file(&tmp);
            return Err(error);
        }

        publish(&tmp, local_path)
    }

    /// One download attempt: stream into the temporary and verify it.
    fn attempt(
        &self,
        name: &str,
        url: &str,
        transport: &dyn Transport,
        tmp: &Path,
        expected: &HashSpec,
    ) -> Result<()> {
        transport.download(url, tmp)?;
        match expected.algorithm() {
            Some(algorithm) => {
                let actual = hash_file(tmp, algorithm)?;
                if !expected.matches_hex(&actual) {
                    return Err(Error::HashMismatch {
                        name: name.to_string(),
                        expected: expected.to_string(),
                        actual,
                    });
                }
            }
            None => {
                // Unverified download; log the digest so the caller can pin it.
                let digest = hash_file(tmp, HashAlgorithm::Sha256)?;
                tracing::info!(
                    name,
                    sha256 = %digest,
                    "downloaded without a known hash; record this digest to verify future downloads"
                );
            }
        }
        Ok(())
    }
}

/// Map a forward-slash registry name onto the native path separator.
pub(crate) fn native_relative(name: &str) -> PathBuf {
    name.split('/').collect()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".tmp.{}.cachet", Uuid::new_v4()))
}

/// Atomically move the verified temporary over the final path. The
/// temporary lives in the destination directory, so the rename is
/// filesystem-local; the copy fallback only runs on exotic setups where it
/// is not, and is not atomic.
fn publish(tmp: &Path, local_path: &Path) -> Result<()> {
    if fs::rename(tmp, local_path).is_ok() {
        return Ok(());
    }
    fs::copy(tmp, local_path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        Error::Path {
            path: local_path.to_path_buf(),
            source: e,
        }
    })?;
    fs::remove_file(tmp).map_err(|e| Error::Path {
        path: tmp.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Builder for [`Cachet`]. Only the cache root is mandatory.
pub struct CachetBuilder {
    cache_root: PathBuf,
    base_url: Option<String>,
    version: Option<String>,
    version_dev: String,
    env_override: Option<String>,
    retry_count: u32,
    allow_updates: bool,
    registry: Registry,
}

impl CachetBuilder {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            base_url: None,
            version: None,
            version_dev: "main".to_string(),
            env_override: None,
            retry_count: 0,
            allow_updates: true,
            registry: Registry::new(),
        }
    }

    /// Base URL that file names are appended to. Should end in `/`; a
    /// `{version}` placeholder is substituted with the version segment.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Version the cache and the base URL. A version containing `+` is
    /// treated as a development version and replaced by the dev label.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Label substituted for development versions (default `main`).
    pub fn version_dev(mut self, label: impl Into<String>) -> Self {
        self.version_dev = label.into();
        self
    }

    /// Environment variable that overrides the cache root when set.
    pub fn env_override(mut self, variable: impl Into<String>) -> Self {
        self.env_override = Some(variable.into());
        self
    }

    /// How many times to retry transient download failures (default 0).
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// When disabled, a local file that fails verification is an error
    /// instead of triggering a re-download. Useful on CI.
    pub fn allow_updates(mut self, allow: bool) -> Self {
        self.allow_updates = allow;
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Add one registry entry.
    pub fn record(mut self, name: impl Into<String>, hash: HashSpec, url: Option<String>) -> Self {
        self.registry.insert(name, hash, url);
        self
    }

    pub fn build(self) -> Cachet {
        Cachet {
            cache_root: self.cache_root,
            base_url: self.base_url,
            version: self.version,
            version_dev: self.version_dev,
            env_override: self.env_override,
            retry_count: self.retry_count,
            allow_updates: self.allow_updates,
            registry: self.registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_relative_splits_on_forward_slash() {
        let path = native_relative("a/b/c.dat");
        let expected: PathBuf = ["a", "b", "c.dat"].iter().collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn temp_sibling_stays_in_parent_dir() {
        let tmp = temp_sibling(Path::new("/cache/sub/data.bin"));
        assert_eq!(tmp.parent(), Some(Path::new("/cache/sub")));
        assert!(tmp.file_name().unwrap().to_string_lossy().starts_with(".tmp."));
    }

    #[test]
    fn temp_siblings_are_unique() {
        let a = temp_sibling(Path::new("/cache/data.bin"));
        let b = temp_sibling(Path::new("/cache/data.bin"));
        assert_ne!(a, b);
    }

    #[test]
    fn builder_defaults() {
        let cachet = Cachet::builder("/data").build();
        assert_eq!(cachet.cache_root(), PathBuf::from("/data"));
        assert_eq!(cachet.retry_count, 0);
        assert!(cachet.allow_updates);
        assert!(cachet.registry().is_empty());
    }

    #[test]
    fn builder_version_segments_cache_root() {
        let cachet = Cachet::builder("/data").version("v1.0").build();
        assert_eq!(cachet.cache_root(), PathBuf::from("/data/v1.0"));

        let dev = Cachet::builder("/data")
            .version("v1.0+7.gabc")
            .version_dev("main")
            .build();
        assert_eq!(dev.cache_root(), PathBuf::from("/data/main"));
    }

    #[test]
    fn get_url_composes_and_overrides() {
        let cachet = Cachet::builder("/data")
            .base_url("https://example.org/{version}/")
            .version("v2")
            .record("plain.txt", HashSpec::Unknown, None)
            .record(
                "override.bin",
                HashSpec::Unknown,
                Some("ftp://mirror.example.org/override.bin".to_string()),
            )
            .build();

        assert_eq!(
            cachet.get_url("plain.txt").unwrap(),
            "https://example.org/v2/plain.txt"
        );
        assert_eq!(
            cachet.get_url("override.bin").unwrap(),
            "ftp://mirror.example.org/override.bin"
        );
    }

    #[test]
    fn get_url_unknown_file() {
        let cachet = Cachet::builder("/data").build();
        assert!(matches!(
            cachet.get_url("missing"),
            Err(Error::UnknownFile { .. })
        ));
    }

    #[test]
    fn get_url_without_base_url() {
        let cachet = Cachet::builder("/data")
            .record("a.txt", HashSpec::Unknown, None)
            .build();
        assert!(matches!(cachet.get_url("a.txt"), Err(Error::NoUrl { .. })));
    }

    #[test]
    fn construction_does_not_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("never/created");
        let cachet = Cachet::builder(&root).version("v1").build();
        let _ = cachet.cache_root();
        assert!(!root.exists());
    }
}
