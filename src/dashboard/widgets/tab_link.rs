use crate::dashboard::signal::NavigationBus;
use crate::dashboard::unit::Widget;
use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TabLinkConfig {
    pub tab: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Button that asks the dashboard to switch tabs without knowing about it.
pub struct TabLinkWidget {
    cfg: TabLinkConfig,
    bus: NavigationBus,
}

impl TabLinkWidget {
    pub fn new(cfg: TabLinkConfig, bus: NavigationBus) -> Self {
        Self { cfg, bus }
    }

    pub fn activate(&self) {
        self.bus.emit(&self.cfg.tab);
    }
}

impl Widget for TabLinkWidget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()> {
        let label = self
            .cfg
            .label
            .clone()
            .unwrap_or_else(|| format!("Go to {}", self.cfg.tab));
        if ui.button(label).clicked() {
            self.activate();
        }
        Ok(())
    }
}
