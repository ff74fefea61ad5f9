use crate::dashboard::unit::Widget;
use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkEntry {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinksConfig {
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

pub struct LinksWidget {
    cfg: LinksConfig,
}

impl LinksWidget {
    pub fn new(cfg: LinksConfig) -> Self {
        Self { cfg }
    }
}

impl Widget for LinksWidget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()> {
        if self.cfg.links.is_empty() {
            ui.weak("No links configured.");
            return Ok(());
        }
        link_buttons(ui, &self.cfg.links);
        Ok(())
    }
}

/// One button per link; a failed open is logged and otherwise ignored.
pub(crate) fn link_buttons(ui: &mut egui::Ui, links: &[LinkEntry]) {
    for link in links {
        if ui.button(&link.label).on_hover_text(&link.url).clicked() {
            if let Err(e) = open::that(&link.url) {
                tracing::warn!(url = %link.url, error = %e, "failed to open link");
            }
        }
    }
}
