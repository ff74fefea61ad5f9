pub mod composer;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod registry;
pub mod renderer;
pub mod signal;
pub mod source;
pub mod unit;
pub mod widgets;

pub use composer::DashboardComposer;
pub use config::{DashboardConfig, Tab, WidgetConfig, WidgetDescriptor, DYNAMIC_PREFIX};
pub use error::{HostError, LoadError, ResolveError};
pub use host::HostCapabilities;
pub use loader::DynamicLoader;
pub use registry::PluginRegistry;
pub use renderer::{RenderStateKind, WidgetRenderer};
pub use signal::{NavigateToTab, NavigationBus};
pub use unit::{LazyUnit, RenderableUnit, Spawner, UnitRef, UnitStatus, Widget};
