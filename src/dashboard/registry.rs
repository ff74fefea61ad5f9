use crate::dashboard::config::{WidgetConfig, DYNAMIC_PREFIX};
use crate::dashboard::error::{LoadError, ResolveError};
use crate::dashboard::loader::DynamicLoader;
use crate::dashboard::unit::{LazyUnit, RenderableUnit, Spawner, UnitRef};
use crate::dashboard::widgets;
use std::collections::HashMap;
use std::sync::Arc;

/// Config key holding the bundle location of a dynamic widget.
pub const CDN_URL_KEY: &str = "cdn_url";

/// Maps widget type identifiers to renderable units.
pub struct PluginRegistry {
    builtins: HashMap<String, UnitRef>,
    loader: Arc<DynamicLoader>,
}

impl PluginRegistry {
    /// Registry with no built-in widgets.
    pub fn new(loader: Arc<DynamicLoader>) -> Self {
        Self {
            builtins: HashMap::new(),
            loader,
        }
    }

    /// Registry with the shipped widgets registered.
    pub fn with_builtins(loader: Arc<DynamicLoader>) -> Self {
        let host = Arc::clone(loader.host());
        let mut reg = Self::new(loader);
        widgets::register_builtins(&mut reg, &host);
        reg
    }

    /// Register a built-in type. The factory is only invoked the first time a
    /// widget of this type is mounted.
    pub fn register_builtin<F>(&mut self, name: &str, factory: F)
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn RenderableUnit>> + Send + 'static,
    {
        let label = name.to_string();
        let unit = LazyUnit::new(name, Spawner::inline(), move || {
            factory().map_err(|e| LoadError::link(&label, format!("{e:#}")))
        });
        self.builtins.insert(name.to_string(), unit);
    }

    /// Resolve a widget type. Errors are reported here and are never fatal;
    /// callers render a placeholder.
    pub fn resolve(
        &self,
        widget_type: &str,
        config: &WidgetConfig,
    ) -> Result<UnitRef, ResolveError> {
        if let Some(plugin) = widget_type.strip_prefix(DYNAMIC_PREFIX) {
            let url = config
                .get(CDN_URL_KEY)
                .and_then(|v| v.as_str())
                .filter(|u| !u.trim().is_empty());
            return match url {
                Some(url) => Ok(self.loader.load(url)),
                None => {
                    tracing::warn!(plugin = %plugin, "dynamic widget has no cdn_url");
                    Err(ResolveError::MissingLocation {
                        plugin: plugin.to_string(),
                    })
                }
            };
        }

        match self.builtins.get(widget_type) {
            Some(unit) => Ok(Arc::clone(unit)),
            None => {
                tracing::warn!(widget = %widget_type, "unknown widget type");
                Err(ResolveError::UnknownType {
                    widget_type: widget_type.to_string(),
                })
            }
        }
    }

    pub fn is_registered(&self, widget_type: &str) -> bool {
        self.builtins.contains_key(widget_type)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn loader(&self) -> &Arc<DynamicLoader> {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::host::{test_host, HostCapabilities};
    use crate::dashboard::loader::{BundleFetcher, BundleLinker};
    use crate::dashboard::unit::UnitStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoNetwork(AtomicUsize);

    impl BundleFetcher for NoNetwork {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::fetch(url, "offline"))
        }
    }

    struct NoLinker;

    impl BundleLinker for NoLinker {
        fn link(
            &self,
            url: &str,
            _bytes: &[u8],
            _host: &Arc<HostCapabilities>,
        ) -> Result<Arc<dyn RenderableUnit>, LoadError> {
            Err(LoadError::link(url, "unused"))
        }
    }

    fn registry() -> (PluginRegistry, Arc<NoNetwork>) {
        let fetcher = Arc::new(NoNetwork(AtomicUsize::new(0)));
        let loader = Arc::new(DynamicLoader::new(
            test_host(),
            fetcher.clone(),
            Arc::new(NoLinker),
            Spawner::inline(),
        ));
        (PluginRegistry::with_builtins(loader), fetcher)
    }

    fn config(value: serde_json::Value) -> WidgetConfig {
        match value {
            serde_json::Value::Object(map) => map,
            _ => WidgetConfig::new(),
        }
    }

    #[test]
    fn builtins_are_listed() {
        let (reg, _) = registry();
        assert_eq!(reg.registered_types(), widgets::BUILTIN_TYPES);
        assert!(reg.is_registered("clock"));
        assert!(!reg.is_registered("dynamic:clock"));
    }

    #[test]
    fn unknown_type_is_not_found() {
        let (reg, fetcher) = registry();
        let err = reg.resolve("invoices_v2", &WidgetConfig::new()).err();
        assert_eq!(
            err,
            Some(ResolveError::UnknownType {
                widget_type: "invoices_v2".into()
            })
        );
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dynamic_without_location_never_fetches() {
        let (reg, fetcher) = registry();
        for cfg in [json!({}), json!({"cdn_url": ""}), json!({"cdn_url": 7})] {
            let err = reg.resolve("dynamic:weather", &config(cfg)).err();
            assert_eq!(
                err,
                Some(ResolveError::MissingLocation {
                    plugin: "weather".into()
                })
            );
        }
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 0);
        assert!(reg.loader().cached_urls().is_empty());
    }

    #[test]
    fn dynamic_types_delegate_to_loader() {
        let (reg, _) = registry();
        let cfg = config(json!({"cdn_url": "https://cdn/w/1.0.0/bundle"}));
        let a = reg.resolve("dynamic:weather", &cfg).unwrap();
        let b = reg.resolve("dynamic:forecast", &cfg).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.loader().cached_urls(), vec!["https://cdn/w/1.0.0/bundle"]);
    }

    #[test]
    fn builtin_factory_runs_on_first_mount_only() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);
        let (mut reg, _) = registry();
        reg.register_builtin("counter", || {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(crate::dashboard::unit::TypedUnit::new(
                crate::dashboard::widgets::TextWidget::new,
            )) as Arc<dyn RenderableUnit>)
        });
        let unit = reg.resolve("counter", &WidgetConfig::new()).unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 0);
        assert!(matches!(unit.poll(None), UnitStatus::Ready(_)));
        let again = reg.resolve("counter", &WidgetConfig::new()).unwrap();
        assert!(matches!(again.poll(None), UnitStatus::Ready(_)));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }
}
