use crate::dashboard::config::DashboardConfig;
use crate::dashboard::registry::PluginRegistry;
use crate::dashboard::renderer::{RenderStateKind, WidgetRenderer};
use crate::dashboard::signal::{NavigateToTab, NavigationBus};
use eframe::egui;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Tabbed dashboard built from a [`DashboardConfig`].
///
/// Only the active tab has live renderers. Switching tabs drops them and
/// builds fresh ones, which also clears any widget that had errored.
pub struct DashboardComposer {
    config: DashboardConfig,
    active_tab: Option<String>,
    renderers: Vec<WidgetRenderer>,
    registry: Arc<PluginRegistry>,
    signals: Receiver<NavigateToTab>,
}

impl DashboardComposer {
    pub fn new(
        config: DashboardConfig,
        registry: Arc<PluginRegistry>,
        bus: &NavigationBus,
    ) -> Self {
        let active_tab = config.first_tab_id().map(str::to_string);
        let mut composer = Self {
            config,
            active_tab,
            renderers: Vec::new(),
            registry,
            signals: bus.subscribe(),
        };
        composer.rebuild_renderers();
        composer
    }

    fn rebuild_renderers(&mut self) {
        self.renderers = match self
            .active_tab
            .as_deref()
            .and_then(|id| self.config.tab(id))
        {
            Some(tab) => tab
                .widgets
                .iter()
                .cloned()
                .map(|descriptor| WidgetRenderer::new(descriptor, &self.registry))
                .collect(),
            None => Vec::new(),
        };
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active_tab.as_deref()
    }

    pub fn renderers(&self) -> &[WidgetRenderer] {
        &self.renderers
    }

    pub fn render_states(&self) -> Vec<RenderStateKind> {
        self.renderers.iter().map(|r| r.state_kind()).collect()
    }

    /// Activate `tab_id` if the current config has it. Selecting the active
    /// tab again recreates its widgets.
    pub fn select_tab(&mut self, tab_id: &str) -> bool {
        if !self.config.contains_tab(tab_id) {
            tracing::debug!(tab = %tab_id, "ignoring navigation to unknown tab");
            return false;
        }
        tracing::info!(tab = %tab_id, "switching dashboard tab");
        self.active_tab = Some(tab_id.to_string());
        self.rebuild_renderers();
        true
    }

    /// Apply pending navigation signals. Signals naming the active tab are
    /// dropped. Returns how many switched tabs.
    pub fn process_signals(&mut self) -> usize {
        let mut switched = 0;
        while let Ok(signal) = self.signals.try_recv() {
            if self.active_tab.as_deref() == Some(signal.tab_id.as_str()) {
                continue;
            }
            if self.select_tab(&signal.tab_id) {
                switched += 1;
            }
        }
        switched
    }

    /// Swap in a new configuration. The active tab is kept when it still
    /// exists, otherwise the first tab becomes active.
    pub fn replace_config(&mut self, config: DashboardConfig) {
        let keep = self
            .active_tab
            .as_deref()
            .filter(|id| config.contains_tab(id))
            .map(str::to_string);
        self.active_tab = keep.or_else(|| config.first_tab_id().map(str::to_string));
        self.config = config;
        self.rebuild_renderers();
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        self.process_signals();

        if self.config.tabs.is_empty() {
            ui.vertical_centered(|ui| {
                ui.heading("Nothing configured");
                ui.weak("This dashboard has no tabs yet.");
            });
            return;
        }

        let mut clicked = None;
        ui.horizontal(|ui| {
            for tab in &self.config.tabs {
                let selected = self.active_tab.as_deref() == Some(tab.id.as_str());
                if ui.selectable_label(selected, tab.title()).clicked() && !selected {
                    clicked = Some(tab.id.clone());
                }
            }
        });
        if let Some(id) = clicked {
            self.select_tab(&id);
        }
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for (idx, renderer) in self.renderers.iter_mut().enumerate() {
                    ui.push_id(idx, |ui| renderer.ui(ui));
                }
            });

        // Widgets rendered this frame may have asked for a tab switch.
        if self.process_signals() > 0 {
            ui.ctx().request_repaint();
        }
    }
}
