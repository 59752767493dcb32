use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Component, Path};

use cachet_verify::{hash_file, HashAlgorithm, HashSpec};

use crate::error::{Error, Result};

/// What the registry knows about one file.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub hash: HashSpec,
    /// Per-file URL override. Used verbatim: no version substitution, no
    /// name appending.
    pub url: Option<String>,
    /// The hash token as it appeared in the source (lowercased), so dumping
    /// a loaded registry reproduces it byte for byte.
    hash_text: String,
}

impl RegistryEntry {
    fn new(hash: HashSpec, url: Option<String>) -> Self {
        let hash_text = hash.to_string();
        Self {
            hash,
            url,
            hash_text,
        }
    }
}

/// Mapping of logical file names to hash specifiers and optional URLs.
///
/// Names are forward-slash relative paths, unique within one registry.
/// Iteration follows insertion order, which is also the serialization order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    order: Vec<String>,
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. A replaced name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, hash: HashSpec, url: Option<String>) {
        let name = name.into();
        if self.entries.insert(name.clone(), RegistryEntry::new(hash, url)).is_none() {
            self.order.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// File names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Parse registry lines from a reader, appending to this registry.
    ///
    /// One entry per line: file name, hash specifier, optional URL, separated
    /// by spaces. Blank lines and `#` comments are ignored. File names may
    /// contain spaces; the hash token is found positionally as the last token
    /// that parses as a hash specifier, tokens before it form the name and
    /// tokens after it form the URL.
    ///
    /// `source_name` is only used in error messages.
    pub fn load(&mut self, reader: impl BufRead, source_name: &str) -> Result<()> {
        for (index, line) in reader.lines().enumerate() {
            let lineno = index + 1;
            let line = line.map_err(|e| Error::MalformedRegistry {
                source_name: source_name.to_string(),
                line: lineno,
                reason: e.to_string(),
            })?;
            if let Some((name, hash, url)) = parse_line(&line, lineno, source_name)? {
                if self.contains(&name) {
                    return Err(Error::MalformedRegistry {
                        source_name: source_name.to_string(),
                        line: lineno,
                        reason: format!("duplicate entry for '{name}'"),
                    });
                }
                let mut entry = RegistryEntry::new(hash, url);
                // Preserve the source spelling (bare vs. prefixed digest).
                entry.hash_text = hash_token(&line).to_ascii_lowercase();
                self.entries.insert(name.clone(), entry);
                self.order.push(name);
            }
        }
        Ok(())
    }

    /// Load registry entries from a file on disk.
    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|e| Error::Path {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load(BufReader::new(file), &path.display().to_string())
    }

    /// Serialize in the text format, one entry per line, LF endings.
    pub fn dump(&self, mut writer: impl Write) -> std::io::Result<()> {
        for name in &self.order {
            let entry = &self.entries[name];
            match &entry.url {
                Some(url) => writeln!(writer, "{name} {} {url}", entry.hash_text)?,
                None => writeln!(writer, "{name} {}", entry.hash_text)?,
            }
        }
        Ok(())
    }

    /// Build a registry by hashing every file below `directory` (sha256).
    /// Names are relative forward-slash paths, sorted for determinism.
    pub fn from_directory(directory: &Path) -> Result<Self> {
        let files = cachet_archive::walk_files(directory).map_err(|e| Error::Path {
            path: directory.to_path_buf(),
            source: match e {
                cachet_archive::ArchiveError::Io(io) => io,
                other => std::io::Error::other(other.to_string()),
            },
        })?;

        let mut registry = Self::new();
        for file in files {
            let relative = file
                .strip_prefix(directory)
                .expect("walk_files yields paths below its root");
            let name = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/");
            let digest = hash_file(&file, HashAlgorithm::Sha256)?;
            registry.insert(name, HashSpec::parse(&digest)?, None);
        }
        Ok(registry)
    }
}

/// Last whitespace-separated token of a line that parses as a hash
/// specifier.
/// Only called on lines `parse_line` accepted.
fn hash_token(line: &str) -> &str {
    line.split_whitespace()
        .filter(|token| HashSpec::is_valid(token))
        .next_back()
        .unwrap_or("")
}

type ParsedLine = Option<(String, HashSpec, Option<String>)>;

fn parse_line(line: &str, lineno: usize, source_name: &str) -> Result<ParsedLine> {
    let malformed = |reason: String| Error::MalformedRegistry {
        source_name: source_name.to_string(),
        line: lineno,
        reason,
    };

    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let hash_index = tokens
        .iter()
        .rposition(|token| HashSpec::is_valid(token))
        .ok_or_else(|| malformed(format!("no hash specifier found in '{trimmed}'")))?;
    if hash_index == 0 {
        return Err(malformed(format!("entry has no file name: '{trimmed}'")));
    }

    let name = tokens[..hash_index].join(" ");
    validate_name(&name).map_err(|reason| malformed(format!("{reason}: '{trimmed}'")))?;

    let url = if tokens.len() > hash_index + 1 {
        let url = tokens[hash_index + 1..].join(" ");
        if !has_url_scheme(&url) {
            return Err(malformed(format!(
                "ambiguous hash token: trailing fields after the hash do not form a URL: '{trimmed}'"
            )));
        }
        Some(url)
    } else {
        None
    };

    // Cannot fail: is_valid already accepted this token.
    let hash = HashSpec::parse(tokens[hash_index])?;
    Ok(Some((name, hash, url)))
}

/// Registry names are relative forward-slash paths; anything that could
/// escape the cache root is rejected at parse time.
fn validate_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.starts_with('/') {
        return Err("file name must be a relative path");
    }
    if name.split('/').any(|part| part == "..") {
        return Err("file name must not contain '..'");
    }
    Ok(())
}

fn has_url_scheme(candidate: &str) -> bool {
    match candidate.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
