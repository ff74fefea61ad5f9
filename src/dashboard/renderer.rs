//! Per-widget mounting with suspension and fault isolation.
//!
//! A renderer owns one descriptor for the lifetime of a tab activation. While
//! its unit is being fetched it paints a skeleton; once ready it mounts the
//! unit with the descriptor's config. Any error or panic while mounting or
//! rendering is contained here and turns into an error panel that stays until
//! the renderer is recreated.

use crate::dashboard::config::WidgetDescriptor;
use crate::dashboard::error::ResolveError;
use crate::dashboard::registry::PluginRegistry;
use crate::dashboard::unit::{panic_message, UnitRef, UnitStatus, Widget};
use eframe::egui;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStateKind {
    /// Resolution returned not found; a passive placeholder is shown.
    Placeholder,
    Resolving,
    Mounted,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Load,
    Mount,
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetFailure {
    pub widget_type: String,
    pub phase: FailurePhase,
    pub message: String,
}

enum RenderState {
    Resolving,
    Mounted(Box<dyn Widget>),
    Errored(WidgetFailure),
}

pub struct WidgetRenderer {
    descriptor: WidgetDescriptor,
    resolution: Result<UnitRef, ResolveError>,
    state: RenderState,
}

/// Run `f`, turning both `Err` and panics into a message.
fn isolate<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

impl WidgetRenderer {
    pub fn new(descriptor: WidgetDescriptor, registry: &PluginRegistry) -> Self {
        let resolution = registry.resolve(&descriptor.widget_type, &descriptor.config);
        Self {
            descriptor,
            resolution,
            state: RenderState::Resolving,
        }
    }

    pub fn descriptor(&self) -> &WidgetDescriptor {
        &self.descriptor
    }

    pub fn resolve_error(&self) -> Option<&ResolveError> {
        self.resolution.as_ref().err()
    }

    pub fn state_kind(&self) -> RenderStateKind {
        if self.resolution.is_err() {
            return RenderStateKind::Placeholder;
        }
        match self.state {
            RenderState::Resolving => RenderStateKind::Resolving,
            RenderState::Mounted(_) => RenderStateKind::Mounted,
            RenderState::Errored(_) => RenderStateKind::Errored,
        }
    }

    pub fn failure(&self) -> Option<&WidgetFailure> {
        match &self.state {
            RenderState::Errored(f) => Some(f),
            _ => None,
        }
    }

    fn fail(&mut self, phase: FailurePhase, message: String) {
        tracing::error!(
            widget = %self.descriptor.widget_type,
            phase = ?phase,
            error = %message,
            "widget failed"
        );
        self.state = RenderState::Errored(WidgetFailure {
            widget_type: self.descriptor.widget_type.clone(),
            phase,
            message,
        });
    }

    /// Move from resolving to mounted or errored once the unit is known.
    fn advance(&mut self, ctx: &egui::Context) {
        if !matches!(self.state, RenderState::Resolving) {
            return;
        }
        let Ok(unit) = &self.resolution else {
            return;
        };
        match unit.poll(Some(ctx)) {
            UnitStatus::Idle | UnitStatus::Pending => {}
            UnitStatus::Failed(e) => self.fail(FailurePhase::Load, e.to_string()),
            UnitStatus::Ready(unit) => {
                let config = &self.descriptor.config;
                match isolate(|| unit.mount(config)) {
                    Ok(widget) => {
                        tracing::debug!(widget = %self.descriptor.widget_type, "widget mounted");
                        self.state = RenderState::Mounted(widget);
                    }
                    Err(message) => self.fail(FailurePhase::Mount, message),
                }
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        self.advance(ui.ctx());
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            if let Err(e) = &self.resolution {
                placeholder(ui, e);
                return;
            }
            let failed = match &mut self.state {
                RenderState::Resolving => {
                    skeleton(ui);
                    None
                }
                RenderState::Mounted(widget) => isolate(|| widget.render(ui)).err(),
                RenderState::Errored(_) => None,
            };
            if let Some(message) = failed {
                self.fail(FailurePhase::Render, message);
            }
            if let RenderState::Errored(failure) = &self.state {
                error_panel(ui, failure);
            }
        });
    }
}

fn skeleton(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.weak("Loading widget…");
    });
    let color = ui.visuals().faint_bg_color;
    for fraction in [0.9, 0.6, 0.75] {
        let width = ui.available_width() * fraction;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 10.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 3.0, color);
    }
}

fn placeholder(ui: &mut egui::Ui, err: &ResolveError) {
    match err {
        ResolveError::UnknownType { widget_type } => {
            ui.weak(format!("Unknown widget '{widget_type}'"));
        }
        ResolveError::MissingLocation { plugin } => {
            let color = ui.visuals().warn_fg_color;
            ui.colored_label(color, format!("Widget '{plugin}' has no cdn_url"));
        }
    }
}

fn error_panel(ui: &mut egui::Ui, failure: &WidgetFailure) {
    let color = ui.visuals().error_fg_color;
    ui.colored_label(color, format!("Widget '{}' failed", failure.widget_type));
    ui.small(&failure.message);
}
