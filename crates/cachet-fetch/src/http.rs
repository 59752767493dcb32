use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{Result, TransportError};
use crate::progress::ProgressSink;
use crate::transport::Transport;

/// Default connection timeout. Body streaming is deliberately unbounded:
/// large files on slow links are the normal case here.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const CHUNK_SIZE: usize = 65_536;

/// HTTP(S) transport built on the blocking `reqwest` client.
///
/// Follows redirects, supports basic auth and extra request headers, and
/// drives an optional progress sink with Content-Length information.
pub struct HttpTransport {
    client: Client,
    auth: Option<(String, String)>,
    headers: Vec<(String, String)>,
    progress: Option<Box<dyn ProgressSink>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(CONNECT_TIMEOUT)
    }

    pub fn with_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            auth: None,
            headers: Vec::new(),
            progress: None,
        })
    }

    /// Attach basic-auth credentials to every request.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Add an extra request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    fn request(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.client.get(url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        request
    }
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .request(url)
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

        if let (Some(sink), Some(total)) = (&self.progress, response.content_length()) {
            sink.set_total(total);
        }

        let mut out = File::create(dest).map_err(|e| TransportError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut done = 0u64;
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|e| TransportError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])
                .map_err(|e| TransportError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
            done += read as u64;
            if let Some(sink) = &self.progress {
                sink.update(done);
            }
        }
        if let Some(sink) = &self.progress {
            sink.close();
        }
        tracing::debug!(url, bytes = done, "HTTP download finished");
        Ok(())
    }

    fn is_available(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| TransportError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_configuration() {
        let transport = HttpTransport::new()
            .unwrap()
            .auth("user", "pass")
            .header("X-Custom", "1")
            .header("Accept", "application/octet-stream");
        assert!(transport.auth.is_some());
        assert_eq!(transport.headers.len(), 2);
    }

    #[test]
    fn download_to_unreachable_host_is_a_network_error() {
        // Reserved TEST-NET-1 address; connection refused or timed out either way.
        let transport = HttpTransport::with_timeout(Duration::from_millis(200)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = transport
            .download("http://192.0.2.1/file.bin", &dir.path().join("file.bin"))
            .unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
        assert!(err.is_retryable());
    }
}
