use crate::dashboard::unit::Widget;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

fn default_format() -> String {
    "%H:%M:%S".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            label: None,
        }
    }
}

pub struct ClockWidget {
    cfg: ClockConfig,
}

impl ClockWidget {
    pub fn new(cfg: ClockConfig) -> Self {
        Self { cfg }
    }

    /// Format the current local time. Invalid format strings are an error
    /// rather than a panic inside chrono's `Display`.
    pub fn formatted_now(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        write!(out, "{}", chrono::Local::now().format(&self.cfg.format))
            .map_err(|_| anyhow::anyhow!("invalid clock format '{}'", self.cfg.format))?;
        Ok(out)
    }
}

impl Widget for ClockWidget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()> {
        let now = self.formatted_now()?;
        if let Some(label) = &self.cfg.label {
            ui.weak(label);
        }
        ui.heading(now);
        ui.ctx().request_repaint_after(Duration::from_secs(1));
        Ok(())
    }
}
