//! Runtime loading of widget bundles published on a CDN.
//!
//! Every distinct URL maps to exactly one [`LazyUnit`] for the lifetime of
//! the loader. The entry is inserted under the cache lock before any work is
//! scheduled, so repeated or concurrent `load` calls share one fetch. Failures
//! stay in the entry: a broken bundle fails the same way on every later
//! reference without touching the network again. Keys are the URL strings as
//! written; a new plugin version is a new URL.

mod fetch;
mod link;

pub use fetch::{BundleFetcher, HttpFetcher};
pub use link::{
    AutoLinker, BundleLinker, ManifestLinker, NativeLinker, PluginEntry, ABI_SYMBOL, ENTRY_SYMBOL,
};

use crate::dashboard::host::HostCapabilities;
use crate::dashboard::unit::{LazyUnit, Spawner, UnitRef, UnitStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct DynamicLoader {
    cache: Mutex<HashMap<String, UnitRef>>,
    fetcher: Arc<dyn BundleFetcher>,
    linker: Arc<dyn BundleLinker>,
    host: Arc<HostCapabilities>,
    spawner: Spawner,
}

impl DynamicLoader {
    pub fn new(
        host: Arc<HostCapabilities>,
        fetcher: Arc<dyn BundleFetcher>,
        linker: Arc<dyn BundleLinker>,
        spawner: Spawner,
    ) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            fetcher,
            linker,
            host,
            spawner,
        }
    }

    /// HTTP/file fetching, automatic bundle linking and background threads.
    pub fn with_defaults(host: Arc<HostCapabilities>, cache_dir: impl Into<PathBuf>) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(Arc::clone(&host)));
        let linker = Arc::new(AutoLinker::new(cache_dir));
        Self::new(host, fetcher, linker, Spawner::threaded("bundle-loader"))
    }

    /// Handle for the unit published at `url`. Nothing is fetched until the
    /// handle is first polled.
    pub fn load(&self, url: &str) -> UnitRef {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(unit) = cache.get(url) {
            return Arc::clone(unit);
        }

        let fetcher = Arc::clone(&self.fetcher);
        let linker = Arc::clone(&self.linker);
        let host = Arc::clone(&self.host);
        let target = url.to_string();
        let unit = LazyUnit::new(url, self.spawner.clone(), move || {
            let bytes = fetcher.fetch(&target)?;
            tracing::debug!(url = %target, size = bytes.len(), "bundle fetched");
            linker.link(&target, &bytes, &host)
        });
        cache.insert(url.to_string(), Arc::clone(&unit));
        tracing::debug!(url = %url, "bundle cache entry reserved");
        unit
    }

    /// State of a cached entry, if `url` was ever requested.
    pub fn status(&self, url: &str) -> Option<UnitStatus> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(url).map(|unit| unit.status())
    }

    pub fn cached_urls(&self) -> Vec<String> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let mut urls: Vec<String> = cache.keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn host(&self) -> &Arc<HostCapabilities> {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::config::WidgetConfig;
    use crate::dashboard::error::LoadError;
    use crate::dashboard::host::test_host;
    use crate::dashboard::unit::{Job, RenderableUnit, Widget};
    use eframe::egui;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl BundleFetcher for CountingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("broken") {
                Err(LoadError::fetch(url, "HTTP 404 Not Found"))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    struct Echo;

    impl Widget for Echo {
        fn render(&mut self, _ui: &mut egui::Ui) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct EchoUnit;

    impl RenderableUnit for EchoUnit {
        fn mount(&self, _config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>> {
            Ok(Box::new(Echo))
        }
    }

    struct EchoLinker;

    impl BundleLinker for EchoLinker {
        fn link(
            &self,
            _url: &str,
            _bytes: &[u8],
            _host: &Arc<HostCapabilities>,
        ) -> Result<Arc<dyn RenderableUnit>, LoadError> {
            Ok(Arc::new(EchoUnit))
        }
    }

    fn queued_spawner() -> (Spawner, Arc<Mutex<Vec<Job>>>) {
        let jobs: Arc<Mutex<Vec<Job>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::clone(&jobs);
        (
            Spawner::new(move |job| queue.lock().unwrap().push(job)),
            jobs,
        )
    }

    fn loader_with(spawner: Spawner) -> (DynamicLoader, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let loader = DynamicLoader::new(
            test_host(),
            fetcher.clone(),
            Arc::new(EchoLinker),
            spawner,
        );
        (loader, fetcher)
    }

    #[test]
    fn load_is_lazy_until_polled() {
        let (loader, fetcher) = loader_with(Spawner::inline());
        let unit = loader.load("https://cdn/a/1.0.0/bundle");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(unit.status(), UnitStatus::Idle));
        assert!(matches!(unit.poll(None), UnitStatus::Ready(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn in_flight_load_is_shared() {
        let (spawner, jobs) = queued_spawner();
        let (loader, fetcher) = loader_with(spawner);
        let url = "https://cdn/a/1.0.0/bundle";

        let first = loader.load(url);
        assert!(first.poll(None).is_pending());
        let second = loader.load(url);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.poll(None).is_pending());

        let pending: Vec<Job> = std::mem::take(&mut *jobs.lock().unwrap());
        assert_eq!(pending.len(), 1);
        for job in pending {
            job();
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        match (first.status(), second.status()) {
            (UnitStatus::Ready(a), UnitStatus::Ready(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failures_are_sticky() {
        let (loader, fetcher) = loader_with(Spawner::inline());
        let url = "https://cdn/broken/1.0.0/bundle";
        assert!(matches!(
            loader.load(url).poll(None),
            UnitStatus::Failed(LoadError::Fetch { .. })
        ));
        assert!(matches!(
            loader.load(url).poll(None),
            UnitStatus::Failed(LoadError::Fetch { .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn urls_are_not_normalized() {
        let (loader, fetcher) = loader_with(Spawner::inline());
        let a = loader.load("https://cdn/a/1.0.0/bundle");
        let b = loader.load("https://cdn/a/1.0.0/bundle/");
        assert!(!Arc::ptr_eq(&a, &b));
        a.poll(None);
        b.poll(None);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(loader.cached_urls().len(), 2);
    }

    #[test]
    fn status_reports_unrequested_urls_as_absent() {
        let (loader, _) = loader_with(Spawner::inline());
        assert!(loader.status("https://cdn/none").is_none());
        loader.load("https://cdn/some");
        assert!(matches!(
            loader.status("https://cdn/some"),
            Some(UnitStatus::Idle)
        ));
    }
}
