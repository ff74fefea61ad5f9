use crate::dashboard::error::LoadError;
use crate::dashboard::host::HostCapabilities;
use std::sync::Arc;
use url::Url;

/// Obtains the raw bytes of a remote bundle.
pub trait BundleFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Fetches `http(s)://` bundles with the host's shared HTTP client and reads
/// `file://` bundles from disk.
pub struct HttpFetcher {
    host: Arc<HostCapabilities>,
}

impl HttpFetcher {
    pub fn new(host: Arc<HostCapabilities>) -> Self {
        Self { host }
    }
}

impl BundleFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let parsed = Url::parse(url).map_err(|e| LoadError::fetch(url, e))?;
        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| LoadError::fetch(url, "not a local path"))?;
                std::fs::read(&path).map_err(|e| LoadError::fetch(url, e))
            }
            "http" | "https" => {
                let client = self
                    .host
                    .http_client()
                    .ok_or_else(|| LoadError::fetch(url, "http client unavailable"))?;
                tracing::info!(url = %url, "fetching widget bundle");
                let resp = client.get(url).send().map_err(|e| LoadError::fetch(url, e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(LoadError::fetch(url, format!("HTTP {status}")));
                }
                resp.bytes()
                    .map(|b| b.to_vec())
                    .map_err(|e| LoadError::fetch(url, e))
            }
            other => Err(LoadError::fetch(url, format!("unsupported scheme '{other}'"))),
        }
    }
}
