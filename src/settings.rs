use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_dashboard_path() -> String {
    "dashboard.json".into()
}

fn default_http_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    format!("dashboard-shell/{}", env!("CARGO_PKG_VERSION"))
}

fn default_window_size() -> (f32, f32) {
    (1024.0, 720.0)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Local dashboard configuration file. Used when `dashboard_url` is unset.
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
    /// Configuration service endpoint returning the dashboard document.
    #[serde(default)]
    pub dashboard_url: Option<String>,
    /// Where fetched native bundles are written before being loaded. Defaults
    /// to the OS cache directory.
    #[serde(default)]
    pub plugin_cache_dir: Option<String>,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving a copy of the log output.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_window_size")]
    pub window_size: (f32, f32),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dashboard_path: default_dashboard_path(),
            dashboard_url: None,
            plugin_cache_dir: None,
            debug_logging: false,
            log_file: None,
            http_timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
            window_size: default_window_size(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn plugin_cache_dir(&self) -> PathBuf {
        match &self.plugin_cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs_next::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("dashboard_shell")
                .join("bundles"),
        }
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(PathBuf::from)
    }
}
