use crate::dashboard::config::DashboardConfig;
use crate::dashboard::host::HostCapabilities;
use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;

/// Supplies the tab/widget tree. The returned config is never mutated by the
/// dashboard.
pub trait ConfigSource: Send + Sync {
    fn fetch(&self) -> anyhow::Result<DashboardConfig>;
    fn describe(&self) -> String;
}

pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn fetch(&self) -> anyhow::Result<DashboardConfig> {
        DashboardConfig::load(&self.path)
            .with_context(|| format!("reading dashboard config {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetches the config document from the configuration service.
pub struct HttpConfigSource {
    url: String,
    host: Arc<HostCapabilities>,
}

impl HttpConfigSource {
    pub fn new(url: impl Into<String>, host: Arc<HostCapabilities>) -> Self {
        Self {
            url: url.into(),
            host,
        }
    }
}

impl ConfigSource for HttpConfigSource {
    fn fetch(&self) -> anyhow::Result<DashboardConfig> {
        let Some(client) = self.host.http_client() else {
            bail!("http client unavailable");
        };
        let resp = client
            .get(&self.url)
            .send()
            .with_context(|| format!("requesting {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("dashboard config request failed: HTTP {status}");
        }
        let body = resp.text()?;
        DashboardConfig::from_json(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_reads_and_sanitizes() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"{"tabs":[{"id":"x","widgets":[]},{"id":"x","widgets":[]}]}"#,
        )
        .unwrap();
        let cfg = FileConfigSource::new(tmp.path()).fetch().unwrap();
        assert_eq!(cfg.tabs.len(), 1);
    }

    #[test]
    fn file_source_reports_bad_json() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{ nope").unwrap();
        let err = FileConfigSource::new(tmp.path()).fetch().unwrap_err();
        assert!(format!("{err:#}").contains("reading dashboard config"));
    }
}
