use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Prefix marking a widget type that is resolved from a remote bundle.
pub const DYNAMIC_PREFIX: &str = "dynamic:";

/// Opaque per-widget configuration bag handed to the renderable unit.
pub type WidgetConfig = Map<String, Value>;

fn default_version() -> u32 {
    1
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<WidgetConfig, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// One cell of a dashboard tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetDescriptor {
    #[serde(rename = "type", default)]
    pub widget_type: String,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub config: WidgetConfig,
}

impl WidgetDescriptor {
    pub fn new(widget_type: &str) -> Self {
        Self {
            widget_type: widget_type.to_string(),
            config: Map::new(),
        }
    }

    pub fn with_config(widget_type: &str, config: Value) -> Self {
        let config = match config {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            widget_type: widget_type.to_string(),
            config,
        }
    }

    /// Plugin name when the type lives in the dynamic namespace.
    pub fn plugin_name(&self) -> Option<&str> {
        self.widget_type.strip_prefix(DYNAMIC_PREFIX)
    }

    pub fn is_dynamic(&self) -> bool {
        self.plugin_name().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub widgets: Vec<WidgetDescriptor>,
}

impl Tab {
    pub fn new(id: &str, label: &str, widgets: Vec<WidgetDescriptor>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            widgets,
        }
    }

    /// Label shown in the tab strip, falling back to the id.
    pub fn title(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// Tab/widget tree for one tenant's dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            tabs: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn new(tabs: Vec<Tab>) -> Self {
        Self {
            version: default_version(),
            tabs,
        }
    }

    /// Parse a configuration document and sanitize it.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut cfg: DashboardConfig = serde_json::from_str(content)?;
        for w in cfg.sanitize() {
            tracing::warn!("{w}");
        }
        Ok(cfg)
    }

    /// Load a configuration from disk. A missing or empty file yields an empty
    /// dashboard.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).unwrap_or_default();
        Self::from_json(&content)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Drop tabs without an id, repeated tab ids and widgets without a type.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        self.tabs.retain(|tab| {
            if tab.id.trim().is_empty() {
                warnings.push(format!("tab '{}' has no id and was dropped", tab.label));
                return false;
            }
            if !seen.insert(tab.id.clone()) {
                warnings.push(format!("duplicate tab id '{}' dropped", tab.id));
                return false;
            }
            true
        });
        for tab in &mut self.tabs {
            let before = tab.widgets.len();
            tab.widgets.retain(|w| !w.widget_type.trim().is_empty());
            let dropped = before - tab.widgets.len();
            if dropped > 0 {
                warnings.push(format!(
                    "{dropped} widget(s) without a type dropped from tab '{}'",
                    tab.id
                ));
            }
        }
        warnings
    }

    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn contains_tab(&self, id: &str) -> bool {
        self.tab(id).is_some()
    }

    pub fn first_tab_id(&self) -> Option<&str> {
        self.tabs.first().map(|t| t.id.as_str())
    }

    pub fn path_for(base: &str) -> PathBuf {
        let base = Path::new(base);
        if base.is_dir() {
            base.join("dashboard.json")
        } else {
            PathBuf::from(base)
        }
    }
}
