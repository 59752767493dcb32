use std::path::Path;

use crate::doi::DoiTransport;
use crate::error::{Result, TransportError};
use crate::ftp::FtpTransport;
use crate::http::HttpTransport;
use crate::sftp::SftpTransport;

/// A strategy for moving bytes from a remote URL to a local destination.
///
/// `download` streams into exactly the path it is given (the caller owns
/// temporary-file placement and the final rename) and must not leave anything
/// at any other path on failure. `is_available` probes the remote side
/// without transferring the body.
pub trait Transport: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    fn is_available(&self, url: &str) -> Result<bool>;
}

/// Callback returning `(username, password)` for a host, consulted by the
/// auth-capable transports before falling back to their configured defaults.
pub type CredentialProvider = Box<dyn Fn(&str) -> Option<(String, String)> + Send + Sync>;

/// Host, port, path, and inline credentials pulled out of an `ftp://` or
/// `sftp://` URL.
pub(crate) struct RemoteLocation {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub(crate) fn parse_remote(url: &str, default_port: u16) -> Result<RemoteLocation> {
    let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?
        .to_string();
    Ok(RemoteLocation {
        host,
        port: parsed.port().unwrap_or(default_port),
        path: parsed.path().to_string(),
        username: (!parsed.username().is_empty()).then(|| parsed.username().to_string()),
        password: parsed.password().map(String::from),
    })
}

/// Pick a transport for a URL by its scheme.
pub fn for_url(url: &str) -> Result<Box<dyn Transport>> {
    select(url, None)
}

/// Like [`for_url`], with a progress sink attached to the chosen transport.
pub fn for_url_with_progress(
    url: &str,
    sink: Box<dyn crate::progress::ProgressSink>,
) -> Result<Box<dyn Transport>> {
    select(url, Some(sink))
}

fn select(url: &str, sink: Option<Box<dyn crate::progress::ProgressSink>>) -> Result<Box<dyn Transport>> {
    let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => {
            let transport = HttpTransport::new()?;
            Ok(Box::new(match sink {
                Some(sink) => transport.progress(sink),
                None => transport,
            }))
        }
        "ftp" => {
            let transport = FtpTransport::new();
            Ok(Box::new(match sink {
                Some(sink) => transport.progress(sink),
                None => transport,
            }))
        }
        "sftp" => {
            let transport = SftpTransport::new();
            Ok(Box::new(match sink {
                Some(sink) => transport.progress(sink),
                None => transport,
            }))
        }
        "doi" => {
            let transport = DoiTransport::new()?;
            Ok(Box::new(match sink {
                Some(sink) => transport.progress(sink),
                None => transport,
            }))
        }
        scheme => Err(TransportError::UnsupportedScheme {
            scheme: scheme.to_string(),
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_selection() {
        assert!(for_url("http://example.org/a").is_ok());
        assert!(for_url("https://example.org/a").is_ok());
        assert!(for_url("ftp://example.org/a").is_ok());
        assert!(for_url("sftp://example.org/a").is_ok());
        assert!(for_url("doi:10.6084/m9.figshare.14763051.v1/tiny-data.txt").is_ok());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = match for_url("gopher://example.org/a") {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, TransportError::UnsupportedScheme { .. }));
    }

    #[test]
    fn garbage_url_is_rejected() {
        let err = match for_url("not a url") {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
