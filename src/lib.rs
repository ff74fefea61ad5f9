pub mod dashboard;
pub mod gui;
pub mod logging;
pub mod settings;

pub use dashboard::{DashboardComposer, DashboardConfig, DynamicLoader, HostCapabilities, PluginRegistry};
