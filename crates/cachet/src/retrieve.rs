use std::path::PathBuf;

use cachet_fetch::{for_url_with_progress, TerminalProgress, Transport};
use cachet_verify::{HashAlgorithm, HashSpec};

use crate::error::Result;
use crate::location::os_cache;
use crate::manager::{Cachet, FetchOptions};
use crate::processors::{Processed, Processor};

/// Optional knobs for [`retrieve`].
#[derive(Default)]
pub struct RetrieveOptions<'a> {
    /// Name for the cached file. Derived from the URL when absent, with a
    /// hash of the URL prepended so distinct URLs never collide.
    pub filename: Option<String>,
    /// Cache directory. Defaults to the per-OS cache dir for `app_name`.
    pub cache_path: Option<PathBuf>,
    /// Application name for the default cache location (default `cachet`).
    pub app_name: Option<String>,
    pub transport: Option<&'a dyn Transport>,
    pub processor: Option<&'a dyn Processor>,
    /// Show a terminal progress bar (ignored with a custom transport).
    pub progressbar: bool,
}

/// Download and cache a single file by URL.
///
/// One-shot counterpart of [`Cachet`]: synthesizes a single-entry registry
/// with a per-file URL override and fetches it. Pass `None` as `known_hash`
/// to skip verification; the computed SHA-256 is then logged so it can be
/// pinned for future calls.
pub fn retrieve(
    url: &str,
    known_hash: Option<&str>,
    options: RetrieveOptions<'_>,
) -> Result<Processed> {
    let hash = match known_hash {
        Some(spec) => HashSpec::parse(spec)?,
        None => HashSpec::Unknown,
    };
    let filename = options
        .filename
        .unwrap_or_else(|| unique_file_name(url));
    let cache_path = options.cache_path.unwrap_or_else(|| {
        os_cache(options.app_name.as_deref().unwrap_or("cachet"))
    });

    let manager = Cachet::builder(cache_path)
        .record(filename.clone(), hash, Some(url.to_string()))
        .build();

    let progress_transport;
    let transport = match (options.transport, options.progressbar) {
        (Some(transport), _) => Some(transport),
        (None, true) => {
            progress_transport =
                for_url_with_progress(url, Box::new(TerminalProgress::new(&filename)))?;
            Some(progress_transport.as_ref())
        }
        (None, false) => None,
    };

    manager.fetch_with(
        &filename,
        &FetchOptions {
            transport,
            processor: options.processor,
        },
    )
}

/// A collision-free cache name for a bare URL: the URL's MD5 followed by its
/// basename.
fn unique_file_name(url: &str) -> String {
    let base = url.rsplit('/').next().unwrap_or(url);
    let base = base.split(['?', '#']).next().unwrap_or(base);
    let base = if base.is_empty() { "download" } else { base };

    let mut hasher = HashAlgorithm::Md5.hasher();
    hasher.update(url.as_bytes());
    format!("{}-{}", hasher.finalize_hex(), base)
}
