use crate::dashboard::unit::Widget;
use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TextConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub lines: Vec<String>,
}

pub struct TextWidget {
    cfg: TextConfig,
}

impl TextWidget {
    pub fn new(cfg: TextConfig) -> Self {
        Self { cfg }
    }
}

impl Widget for TextWidget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()> {
        if let Some(title) = &self.cfg.title {
            ui.strong(title);
        }
        for line in &self.cfg.lines {
            ui.label(line);
        }
        Ok(())
    }
}
