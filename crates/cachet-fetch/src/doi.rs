use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Result, TransportError};
use crate::http::HttpTransport;
use crate::progress::ProgressSink;
use crate::transport::Transport;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One downloadable file in a DOI-referenced dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryFile {
    pub name: String,
    pub download_url: String,
}

/// Transport for `doi:<DOI>/<filename>` URLs.
///
/// Resolves the DOI through `doi.org`, recognizes the landing repository
/// (figshare, Zenodo, or a Dataverse instance), queries its public metadata
/// API for the file listing of exactly the version the DOI names, and hands
/// the selected file's download URL to the HTTP transport.
///
/// The most recent DOI's listing is cached in memory for the lifetime of
/// this transport, so repeated fetches from one archive resolve once.
pub struct DoiTransport {
    client: reqwest::blocking::Client,
    http: HttpTransport,
    listing_cache: Mutex<Option<(String, Vec<RepositoryFile>)>>,
}

impl DoiTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            http: HttpTransport::new()?,
            listing_cache: Mutex::new(None),
        })
    }

    pub fn progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.http = self.http.progress(sink);
        self
    }

    /// Split `doi:<DOI>/<filename>` into the DOI and the file name. The DOI
    /// itself contains a slash (`10.<prefix>/<suffix>`), so the file name is
    /// everything after the last one.
    fn split(url: &str) -> Result<(&str, &str)> {
        let spec = url.strip_prefix("doi:").ok_or_else(|| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: "expected a doi: URL".to_string(),
        })?;
        let (doi, filename) = spec.rsplit_once('/').ok_or_else(|| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: "expected doi:<DOI>/<filename>".to_string(),
        })?;
        if !doi.contains('/') || filename.is_empty() {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "expected doi:<DOI>/<filename>".to_string(),
            });
        }
        Ok((doi, filename))
    }

    /// Follow the `doi.org` redirect chain to the repository landing page.
    fn landing_url(&self, doi: &str) -> Result<url::Url> {
        let resolver = format!("https://doi.org/{doi}");
        let response = self
            .client
            .get(&resolver)
            .send()
            .map_err(|e| TransportError::Network {
                url: resolver.clone(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: resolver,
            });
        }
        Ok(response.url().clone())
    }

    fn listing(&self, doi: &str) -> Result<Vec<RepositoryFile>> {
        {
            let cache = self.listing_cache.lock().unwrap();
            if let Some((cached_doi, files)) = cache.as_ref() {
                if cached_doi == doi {
                    return Ok(files.clone());
                }
            }
        }

        let landing = self.landing_url(doi)?;
        let host = landing.host_str().unwrap_or_default().to_string();
        tracing::debug!(doi, host = %host, "resolved DOI landing page");

        let files = if host == "figshare.com" || host.ends_with(".figshare.com") {
            self.figshare(doi)?
        } else if host == "zenodo.org" || host.ends_with(".zenodo.org") {
            self.zenodo(doi, &landing)?
        } else {
            match self.dataverse(doi, &landing)? {
                Some(files) => files,
                None => {
                    return Err(TransportError::DoiUnsupported {
                        doi: doi.to_string(),
                        host,
                    })
                }
            }
        };

        let mut cache = self.listing_cache.lock().unwrap();
        *cache = Some((doi.to_string(), files.clone()));
        Ok(files)
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.json().map_err(|e| TransportError::Network {
            url: url.to_string(),
            message: format!("malformed metadata response: {e}"),
        })
    }

    fn figshare(&self, doi: &str) -> Result<Vec<RepositoryFile>> {
        // Collection DOIs carry a `.c.` marker; they bundle datasets and
        // have no file listing of their own.
        if doi.contains(".c.") {
            return Err(TransportError::DoiNotDataset {
                doi: doi.to_string(),
            });
        }

        let query = format!("https://api.figshare.com/v2/articles?doi={doi}");
        let articles = self.get_json(&query)?;
        let article_id = articles
            .get(0)
            .and_then(|a| a.get("id"))
            .and_then(Value::as_u64)
            .ok_or_else(|| TransportError::Network {
                url: query,
                message: "no article matches this DOI".to_string(),
            })?;

        let files_url = format!("https://api.figshare.com/v2/articles/{article_id}/files");
        let files = self.get_json(&files_url)?;
        let entries = files.as_array().ok_or_else(|| TransportError::Network {
            url: files_url.clone(),
            message: "expected a file array".to_string(),
        })?;

        Ok(entries
            .iter()
            .filter_map(|item| {
                Some(RepositoryFile {
                    name: item.get("name")?.as_str()?.to_string(),
                    download_url: item.get("download_url")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    fn zenodo(&self, doi: &str, landing: &url::Url) -> Result<Vec<RepositoryFile>> {
        // The landing URL of a versioned DOI ends in that version's record id.
        let record_id = landing
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| TransportError::Network {
                url: landing.to_string(),
                message: format!("cannot find a Zenodo record id for doi:{doi}"),
            })?;

        let record_url = format!("https://zenodo.org/api/records/{record_id}");
        let record = self.get_json(&record_url)?;
        let entries = record
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| TransportError::Network {
                url: record_url.clone(),
                message: "record has no file listing".to_string(),
            })?;

        Ok(entries
            .iter()
            .filter_map(|item| {
                Some(RepositoryFile {
                    name: item.get("key")?.as_str()?.to_string(),
                    download_url: item.get("links")?.get("self")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    /// Probe the landing host as a Dataverse instance. `Ok(None)` means the
    /// host did not answer like one, and the caller reports an unsupported
    /// repository.
    fn dataverse(&self, doi: &str, landing: &url::Url) -> Result<Option<Vec<RepositoryFile>>> {
        let host = landing.host_str().unwrap_or_default();
        let api = format!("{}://{}/api", landing.scheme(), host);
        let dataset_url = format!("{api}/datasets/:persistentId?persistentId=doi:{doi}");

        let response = self
            .client
            .get(&dataset_url)
            .send()
            .map_err(|e| TransportError::Network {
                url: dataset_url.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let dataset: Value = response.json().map_err(|e| TransportError::Network {
            url: dataset_url.clone(),
            message: format!("malformed metadata response: {e}"),
        })?;

        let entries = dataset
            .get("data")
            .and_then(|d| d.get("latestVersion"))
            .and_then(|v| v.get("files"))
            .and_then(Value::as_array)
            .ok_or_else(|| TransportError::Network {
                url: dataset_url,
                message: "dataset has no file listing".to_string(),
            })?;

        Ok(Some(
            entries
                .iter()
                .filter_map(|item| {
                    let data_file = item.get("dataFile")?;
                    let name = data_file.get("filename")?.as_str()?.to_string();
                    let id = data_file.get("persistentId")?.as_str()?.to_string();
                    Some(RepositoryFile {
                        download_url: format!(
                            "{api}/access/datafile/:persistentId?persistentId={id}"
                        ),
                        name,
                    })
                })
                .collect(),
        ))
    }
}

impl Transport for DoiTransport {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let (doi, filename) = Self::split(url)?;
        let files = self.listing(doi)?;
        let file = files.iter().find(|f| f.name == filename).ok_or_else(|| {
            TransportError::DoiFileNotFound {
                doi: doi.to_string(),
                filename: filename.to_string(),
                available: files.iter().map(|f| f.name.clone()).collect(),
            }
        })?;
        tracing::info!(doi, filename, "delegating DOI download to HTTP");
        self.http.download(&file.download_url, dest)
    }

    fn is_available(&self, url: &str) -> Result<bool> {
        let (doi, filename) = Self::split(url)?;
        let files = self.listing(doi)?;
        Ok(files.iter().any(|f| f.name == filename))
    }
}
