use crate::registry::RegistryEntry;

/// A version is a development version when it carries a `+` local segment
/// (the convention used by setuptools-scm/versioneer style version strings).
pub fn is_dev_version(version: &str) -> bool {
    version.contains('+')
}

/// The path/URL segment standing in for a version: the version itself for a
/// release, the dev label (e.g. `main`) for a development version.
pub fn version_segment<'a>(version: &'a str, dev_label: &'a str) -> &'a str {
    if is_dev_version(version) {
        dev_label
    } else {
        version
    }
}

/// Substitute `{version}` in a base URL using the dev-label rule.
pub fn substitute_version(base_url: &str, version: Option<&str>, dev_label: &str) -> String {
    match version {
        Some(version) => base_url.replace("{version}", version_segment(version, dev_label)),
        None => base_url.to_string(),
    }
}

/// Compute the effective remote URL for a registry entry.
///
/// A per-file URL wins and is used verbatim. Otherwise the base URL gets
/// `{version}` substituted, a trailing slash ensured, and the name appended.
pub fn full_url(
    name: &str,
    entry: &RegistryEntry,
    base_url: Option<&str>,
    version: Option<&str>,
    dev_label: &str,
) -> Option<String> {
    if let Some(url) = &entry.url {
        return Some(url.clone());
    }
    let base = substitute_version(base_url?, version, dev_label);
    let mut url = base;
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(name);
    Some(url)
}

#[cfg(test)]
mod tests {
    use cachet_verify::HashSpec;

    use super::*;
    use crate::registry::Registry;

    fn entry(url: Option<&str>) -> RegistryEntry {
        let mut registry = Registry::new();
        registry.insert("x", HashSpec::Unknown, url.map(String::from));
        registry.get("x").unwrap().clone()
    }

    #[test]
    fn dev_detection_is_plus_marker() {
        assert!(!is_dev_version("v1.2.0"));
        assert!(!is_dev_version("1.0a3"));
        assert!(is_dev_version("v1.2.0+12.gabcdef"));
        assert!(is_dev_version("0.1+dirty"));
    }

    #[test]
    fn version_segment_picks_label_for_dev() {
        assert_eq!(version_segment("v1.2.0", "main"), "v1.2.0");
        assert_eq!(version_segment("v1.2.0+3.gf00", "main"), "main");
    }

    #[test]
    fn substitute_version_in_base_url() {
        assert_eq!(
            substitute_version("https://example.org/{version}/", Some("v2"), "main"),
            "https://example.org/v2/"
        );
        assert_eq!(
            substitute_version("https://example.org/{version}/", Some("v2+1.gf00"), "main"),
            "https://example.org/main/"
        );
        assert_eq!(
            substitute_version("https://example.org/data/", None, "main"),
            "https://example.org/data/"
        );
    }

    #[test]
    fn full_url_appends_name_to_base() {
        let url = full_url(
            "tiny-data.txt",
            &entry(None),
            Some("https://example.org/v1/"),
            None,
            "main",
        );
        assert_eq!(url.as_deref(), Some("https://example.org/v1/tiny-data.txt"));
    }

    #[test]
    fn full_url_adds_missing_trailing_slash() {
        let url = full_url("a/b.dat", &entry(None), Some("https://example.org/v1"), None, "main");
        assert_eq!(url.as_deref(), Some("https://example.org/v1/a/b.dat"));
    }

    #[test]
    fn per_file_url_wins_verbatim() {
        let url = full_url(
            "x.bin",
            &entry(Some("ftp://mirror.example.org/{version}/x.bin")),
            Some("https://primary.example.org/"),
            Some("v9"),
            "main",
        );
        // No substitution, no appending: the override is literal.
        assert_eq!(
            url.as_deref(),
            Some("ftp://mirror.example.org/{version}/x.bin")
        );
    }

    #[test]
    fn no_base_and_no_override_yields_none() {
        assert_eq!(full_url("x", &entry(None), None, None, "main"), None);
    }
}
