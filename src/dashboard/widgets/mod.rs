use crate::dashboard::host::HostCapabilities;
use crate::dashboard::registry::PluginRegistry;
use crate::dashboard::unit::{RenderableUnit, TypedUnit};
use std::sync::Arc;

mod clock;
mod links;
mod tab_link;
mod text;

pub use clock::{ClockConfig, ClockWidget};
pub use links::{LinkEntry, LinksConfig, LinksWidget};
pub use tab_link::{TabLinkConfig, TabLinkWidget};
pub use text::{TextConfig, TextWidget};

pub(crate) use links::link_buttons;

/// Built-in widget types shipped with the shell.
pub const BUILTIN_TYPES: &[&str] = &["clock", "links", "tab_link", "text"];

/// Register the shipped widgets. Factories run on first mount only.
pub fn register_builtins(registry: &mut PluginRegistry, host: &Arc<HostCapabilities>) {
    registry.register_builtin("text", || {
        Ok(Arc::new(TypedUnit::new(TextWidget::new)) as Arc<dyn RenderableUnit>)
    });
    registry.register_builtin("clock", || {
        Ok(Arc::new(TypedUnit::new(ClockWidget::new)) as Arc<dyn RenderableUnit>)
    });
    registry.register_builtin("links", || {
        Ok(Arc::new(TypedUnit::new(LinksWidget::new)) as Arc<dyn RenderableUnit>)
    });
    let bus = host.navigation().clone();
    registry.register_builtin("tab_link", move || {
        let unit = TypedUnit::new(move |cfg: TabLinkConfig| TabLinkWidget::new(cfg, bus.clone()));
        Ok(Arc::new(unit) as Arc<dyn RenderableUnit>)
    });
}
