//! Host capability bundle shared with every widget unit.
//!
//! The host constructs one instance of each library that carries process-wide
//! state and publishes it here before any plugin is linked. Plugins receive the
//! bundle through their entry point and must use these instances instead of
//! building their own, so host and plugin code agree on a single UI context and
//! a single navigation bus. Optional libraries are registered as initializers
//! and created on first lookup; a failing initializer only makes that library
//! unavailable.

use crate::dashboard::error::HostError;
use crate::dashboard::signal::NavigationBus;
use crate::settings::Settings;
use eframe::egui;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Layout version of [`HostCapabilities`]. Native bundles export the value
/// they were built against and are rejected on mismatch.
pub const ABI_VERSION: u32 = 1;

/// Well-known library names.
pub mod names {
    pub const UI: &str = "egui";
    pub const NAVIGATION: &str = "navigation";
    pub const HTTP: &str = "http";
}

type Shared = Arc<dyn Any + Send + Sync>;
type Initializer = Box<dyn Fn() -> anyhow::Result<Shared> + Send + Sync>;

enum Entry {
    Stateful(Shared),
    Lazy {
        init: Initializer,
        cell: OnceCell<Option<Shared>>,
    },
}

pub struct HostCapabilities {
    libraries: HashMap<String, Entry>,
    ui: egui::Context,
    navigation: NavigationBus,
}

impl HostCapabilities {
    pub fn builder() -> HostCapabilitiesBuilder {
        HostCapabilitiesBuilder::default()
    }

    /// Standard bundle: the UI context and navigation bus eagerly, the HTTP
    /// client lazily.
    pub fn bootstrap(ui: egui::Context, settings: &Settings) -> anyhow::Result<Arc<Self>> {
        let timeout = Duration::from_secs(settings.http_timeout_secs.max(1));
        let user_agent = settings.user_agent.clone();
        let mut builder = Self::builder();
        builder
            .publish(names::UI, ui)?
            .publish(names::NAVIGATION, NavigationBus::new())?
            .publish_lazy(names::HTTP, move || {
                let client = reqwest::blocking::Client::builder()
                    .user_agent(user_agent.clone())
                    .timeout(timeout)
                    .build()?;
                Ok(client)
            })?;
        let host = builder.build()?;
        tracing::info!(libraries = ?host.library_names(), "host capabilities published");
        Ok(host)
    }

    pub fn ui_context(&self) -> &egui::Context {
        &self.ui
    }

    pub fn navigation(&self) -> &NavigationBus {
        &self.navigation
    }

    pub fn http_client(&self) -> Option<Arc<reqwest::blocking::Client>> {
        self.library(names::HTTP)
    }

    /// Typed lookup of a published library. Lazy libraries are created on the
    /// first call; `None` when unknown, of another type, or failed to
    /// initialise.
    pub fn library<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let shared = match self.libraries.get(name)? {
            Entry::Stateful(value) => Arc::clone(value),
            Entry::Lazy { init, cell } => cell
                .get_or_init(|| match init() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(library = %name, error = %e, "optional library unavailable");
                        None
                    }
                })
                .clone()?,
        };
        shared.downcast::<T>().ok()
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn library_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.libraries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Collects libraries during bootstrap. Once built the table is frozen.
#[derive(Default)]
pub struct HostCapabilitiesBuilder {
    libraries: HashMap<String, Entry>,
}

impl HostCapabilitiesBuilder {
    /// Publish a library instance that must be shared with every plugin.
    pub fn publish<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        instance: T,
    ) -> Result<&mut Self, HostError> {
        self.insert(name, Entry::Stateful(Arc::new(instance)))
    }

    /// Publish an optional library created on first lookup.
    pub fn publish_lazy<T, F>(&mut self, name: &str, init: F) -> Result<&mut Self, HostError>
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let init: Initializer = Box::new(move || init().map(|v| Arc::new(v) as Shared));
        self.insert(
            name,
            Entry::Lazy {
                init,
                cell: OnceCell::new(),
            },
        )
    }

    fn insert(&mut self, name: &str, entry: Entry) -> Result<&mut Self, HostError> {
        if self.libraries.contains_key(name) {
            return Err(HostError::DuplicateLibrary(name.to_string()));
        }
        self.libraries.insert(name.to_string(), entry);
        Ok(self)
    }

    fn stateful<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T, HostError> {
        match self.libraries.get(name) {
            Some(Entry::Stateful(value)) => value
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| HostError::MissingLibrary(name.to_string())),
            _ => Err(HostError::MissingLibrary(name.to_string())),
        }
    }

    pub fn build(self) -> Result<Arc<HostCapabilities>, HostError> {
        let ui = self.stateful::<egui::Context>(names::UI)?;
        let navigation = self.stateful::<NavigationBus>(names::NAVIGATION)?;
        Ok(Arc::new(HostCapabilities {
            libraries: self.libraries,
            ui,
            navigation,
        }))
    }
}

#[cfg(test)]
pub(crate) fn test_host() -> Arc<HostCapabilities> {
    let mut builder = HostCapabilities::builder();
    builder
        .publish(names::UI, egui::Context::default())
        .and_then(|b| b.publish(names::NAVIGATION, NavigationBus::new()))
        .expect("publish test libraries");
    builder.build().expect("build test host")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn stateful_libraries_are_single_instances() {
        let host = test_host();
        let a: Arc<NavigationBus> = host.library(names::NAVIGATION).unwrap();
        let b: Arc<NavigationBus> = host.library(names::NAVIGATION).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let rx = host.navigation().subscribe();
        a.emit("billing");
        assert_eq!(rx.try_recv().unwrap().tab_id, "billing");
    }

    #[test]
    fn duplicate_publish_is_rejected() {
        let mut builder = HostCapabilities::builder();
        builder.publish(names::NAVIGATION, NavigationBus::new()).unwrap();
        let err = builder
            .publish(names::NAVIGATION, NavigationBus::new())
            .err()
            .unwrap();
        assert_eq!(err, HostError::DuplicateLibrary(names::NAVIGATION.into()));
    }

    #[test]
    fn build_requires_stateful_libraries() {
        let mut builder = HostCapabilities::builder();
        builder.publish(names::UI, egui::Context::default()).unwrap();
        assert_eq!(
            builder.build().err(),
            Some(HostError::MissingLibrary(names::NAVIGATION.into()))
        );
    }

    #[test]
    fn lazy_library_initialises_once() {
        static INITS: AtomicUsize = AtomicUsize::new(0);
        let mut builder = HostCapabilities::builder();
        builder
            .publish(names::UI, egui::Context::default())
            .unwrap()
            .publish(names::NAVIGATION, NavigationBus::new())
            .unwrap()
            .publish_lazy("charts", || {
                INITS.fetch_add(1, Ordering::SeqCst);
                Ok(String::from("palette"))
            })
            .unwrap();
        let host = builder.build().unwrap();
        assert_eq!(INITS.load(Ordering::SeqCst), 0);
        let a: Arc<String> = host.library("charts").unwrap();
        let b: Arc<String> = host.library("charts").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(INITS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_optional_library_does_not_block_others() {
        let mut builder = HostCapabilities::builder();
        builder
            .publish(names::UI, egui::Context::default())
            .unwrap()
            .publish(names::NAVIGATION, NavigationBus::new())
            .unwrap()
            .publish_lazy::<String, _>("icons", || anyhow::bail!("icon font missing"))
            .unwrap();
        let host = builder.build().unwrap();
        assert!(host.library::<String>("icons").is_none());
        assert!(host.has_library("icons"));
        assert!(host.library::<NavigationBus>(names::NAVIGATION).is_some());
    }

    #[test]
    fn wrong_type_lookup_is_none() {
        let host = test_host();
        assert!(host.library::<String>(names::UI).is_none());
        assert!(host.library::<egui::Context>("missing").is_none());
    }
}
