use std::env;
use std::path::{Path, PathBuf};

use crate::urls::version_segment;

/// Default cache location for a project, based on the operating system.
///
/// macOS: `~/Library/Caches/<project>`; Windows: `%LOCALAPPDATA%\<project>\cache`
/// (falling back to `~\AppData\Local`); elsewhere: `$XDG_CACHE_HOME/<project>`
/// or `~/.cache/<project>`. The directory is not created.
pub fn os_cache(project: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_or_cwd().join("Library/Caches").join(project)
    }
    #[cfg(target_os = "windows")]
    {
        env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_or_cwd().join("AppData").join("Local"))
            .join(project)
            .join("cache")
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var_os("XDG_CACHE_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_or_cwd().join(".cache"))
            .join(project)
    }
}

fn home_or_cwd() -> PathBuf {
    home::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_user(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    if text == "~" {
        return home_or_cwd();
    }
    if let Some(rest) = text.strip_prefix("~/").or_else(|| text.strip_prefix("~\\")) {
        return home_or_cwd().join(rest);
    }
    path.to_path_buf()
}

/// Derive the effective cache root for a fetch.
///
/// The environment variable named by `env_override` wins when set and
/// non-empty; a leading `~` is expanded; a version segment is appended using
/// the dev-label rule. Never touches the filesystem — directories are
/// created lazily by the fetch itself.
pub fn resolve_cache_root(
    cache_root: &Path,
    env_override: Option<&str>,
    version: Option<&str>,
    version_dev: &str,
) -> PathBuf {
    let base = env_override
        .filter(|name| !name.is_empty())
        .and_then(|name| env::var(name).ok())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| cache_root.to_path_buf());

    let mut resolved = expand_user(&base);
    if let Some(version) = version {
        resolved.push(version_segment(version, version_dev));
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_cache_ends_with_project() {
        let path = os_cache("myproject");
        assert!(path.to_string_lossy().contains("myproject"));
    }

    #[test]
    fn expand_user_leading_tilde() {
        if let Some(home) = home::home_dir() {
            assert_eq!(expand_user(Path::new("~/data")), home.join("data"));
            assert_eq!(expand_user(Path::new("~")), home);
        }
    }

    #[test]
    fn expand_user_leaves_plain_paths() {
        assert_eq!(expand_user(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        assert_eq!(
            expand_user(Path::new("relative/dir")),
            PathBuf::from("relative/dir")
        );
    }

    #[test]
    fn resolve_appends_release_version() {
        let root = resolve_cache_root(Path::new("/data/cache"), None, Some("v1.2.0"), "main");
        assert_eq!(root, PathBuf::from("/data/cache/v1.2.0"));
    }

    #[test]
    fn resolve_substitutes_dev_label() {
        let root = resolve_cache_root(
            Path::new("/data/cache"),
            None,
            Some("v1.2.0+12.gabcdef"),
            "main",
        );
        assert_eq!(root, PathBuf::from("/data/cache/main"));
    }

    #[test]
    fn resolve_without_version() {
        let root = resolve_cache_root(Path::new("/data/cache"), None, None, "main");
        assert_eq!(root, PathBuf::from("/data/cache"));
    }

    #[test]
    fn env_override_wins_when_set() {
        env::set_var("CACHET_TEST_DATA_DIR", "/from/env");
        let root = resolve_cache_root(
            Path::new("/data/cache"),
            Some("CACHET_TEST_DATA_DIR"),
            Some("v2"),
            "main",
        );
        env::remove_var("CACHET_TEST_DATA_DIR");
        assert_eq!(root, PathBuf::from("/from/env/v2"));
    }

    #[test]
    fn unset_or_empty_env_override_is_ignored() {
        env::remove_var("CACHET_TEST_UNSET_DIR");
        let root = resolve_cache_root(
            Path::new("/data/cache"),
            Some("CACHET_TEST_UNSET_DIR"),
            None,
            "main",
        );
        assert_eq!(root, PathBuf::from("/data/cache"));

        env::set_var("CACHET_TEST_EMPTY_DIR", "");
        let root = resolve_cache_root(
            Path::new("/data/cache"),
            Some("CACHET_TEST_EMPTY_DIR"),
            None,
            "main",
        );
        env::remove_var("CACHET_TEST_EMPTY_DIR");
        assert_eq!(root, PathBuf::from("/data/cache"));
    }
}
