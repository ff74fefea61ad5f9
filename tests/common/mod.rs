#![allow(dead_code)]

use dashboard_shell::dashboard::config::WidgetConfig;
use dashboard_shell::dashboard::error::LoadError;
use dashboard_shell::dashboard::host::{names, HostCapabilities};
use dashboard_shell::dashboard::loader::{BundleFetcher, DynamicLoader, ManifestLinker};
use dashboard_shell::dashboard::registry::PluginRegistry;
use dashboard_shell::dashboard::signal::NavigationBus;
use dashboard_shell::dashboard::unit::{Job, RenderableUnit, Spawner, Widget};
use eframe::egui;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn host() -> Arc<HostCapabilities> {
    let mut builder = HostCapabilities::builder();
    builder
        .publish(names::UI, egui::Context::default())
        .unwrap()
        .publish(names::NAVIGATION, NavigationBus::new())
        .unwrap();
    builder.build().unwrap()
}

/// Serves in-memory bundles and records every request.
#[derive(Default)]
pub struct CountingFetcher {
    bundles: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl CountingFetcher {
    pub fn with_bundle(mut self, url: &str, bytes: &[u8]) -> Self {
        self.bundles.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl BundleFetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.bundles
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::fetch(url, "HTTP 404 Not Found"))
    }
}

pub fn manifest(title: &str) -> Vec<u8> {
    format!(r#"{{"kind":"manifest","title":"{title}","lines":["hello"]}}"#).into_bytes()
}

/// Loader over `fetcher` that links manifests and resolves on the calling
/// thread.
pub fn loader(host: Arc<HostCapabilities>, fetcher: Arc<CountingFetcher>) -> Arc<DynamicLoader> {
    Arc::new(DynamicLoader::new(
        host,
        fetcher,
        Arc::new(ManifestLinker),
        Spawner::inline(),
    ))
}

/// Loader whose resolution jobs wait in the returned queue until run.
pub fn queued_loader(
    host: Arc<HostCapabilities>,
    fetcher: Arc<CountingFetcher>,
) -> (Arc<DynamicLoader>, Arc<Mutex<Vec<Job>>>) {
    let jobs: Arc<Mutex<Vec<Job>>> = Arc::new(Mutex::new(Vec::new()));
    let queue = Arc::clone(&jobs);
    let loader = Arc::new(DynamicLoader::new(
        host,
        fetcher,
        Arc::new(ManifestLinker),
        Spawner::new(move |job| queue.lock().unwrap().push(job)),
    ));
    (loader, jobs)
}

pub fn run_queued(jobs: &Mutex<Vec<Job>>) -> usize {
    let pending: Vec<Job> = std::mem::take(&mut *jobs.lock().unwrap());
    let count = pending.len();
    for job in pending {
        job();
    }
    count
}

pub struct PanicsOnRender;

impl Widget for PanicsOnRender {
    fn render(&mut self, _ui: &mut egui::Ui) -> anyhow::Result<()> {
        panic!("widget exploded")
    }
}

struct PanickyUnit;

impl RenderableUnit for PanickyUnit {
    fn mount(&self, _config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>> {
        Ok(Box::new(PanicsOnRender))
    }
}

/// Registry with the shipped widgets plus `boom`, whose widget panics when
/// drawn.
pub fn registry(loader: Arc<DynamicLoader>) -> Arc<PluginRegistry> {
    let mut registry = PluginRegistry::with_builtins(loader);
    registry.register_builtin("boom", || Ok(Arc::new(PanickyUnit) as Arc<dyn RenderableUnit>));
    Arc::new(registry)
}

pub fn frame(draw: impl FnMut(&mut egui::Ui)) {
    egui::__run_test_ui(draw);
}
