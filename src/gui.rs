use crate::dashboard::host::HostCapabilities;
use crate::dashboard::loader::DynamicLoader;
use crate::dashboard::registry::PluginRegistry;
use crate::dashboard::source::{ConfigSource, FileConfigSource, HttpConfigSource};
use crate::dashboard::unit::Spawner;
use crate::dashboard::{DashboardComposer, DashboardConfig};
use crate::settings::Settings;
use eframe::egui;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

/// Application shell: loads the dashboard configuration in the background and
/// hosts the composer once it arrives.
pub struct DashboardApp {
    host: Arc<HostCapabilities>,
    registry: Arc<PluginRegistry>,
    source: Arc<dyn ConfigSource>,
    spawner: Spawner,
    composer: Option<DashboardComposer>,
    pending: Option<Receiver<anyhow::Result<DashboardConfig>>>,
    pub error: Option<String>,
}

impl DashboardApp {
    pub fn new(
        host: Arc<HostCapabilities>,
        registry: Arc<PluginRegistry>,
        source: Arc<dyn ConfigSource>,
        spawner: Spawner,
    ) -> Self {
        let mut app = Self {
            host,
            registry,
            source,
            spawner,
            composer: None,
            pending: None,
            error: None,
        };
        app.reload();
        app
    }

    /// Publish the host libraries and wire the loader, registry and config
    /// source described by `settings`.
    pub fn bootstrap(ctx: &egui::Context, settings: &Settings) -> anyhow::Result<Self> {
        let host = HostCapabilities::bootstrap(ctx.clone(), settings)?;
        let loader = Arc::new(DynamicLoader::with_defaults(
            Arc::clone(&host),
            settings.plugin_cache_dir(),
        ));
        let registry = Arc::new(PluginRegistry::with_builtins(loader));
        let source: Arc<dyn ConfigSource> = match &settings.dashboard_url {
            Some(url) => Arc::new(HttpConfigSource::new(url.clone(), Arc::clone(&host))),
            None => Arc::new(FileConfigSource::new(DashboardConfig::path_for(
                &settings.dashboard_path,
            ))),
        };
        tracing::info!(source = %source.describe(), "dashboard config source");
        Ok(Self::new(host, registry, source, Spawner::threaded("config-loader")))
    }

    /// Fetch the configuration again. The current dashboard stays visible
    /// until the new one arrives.
    pub fn reload(&mut self) {
        let (tx, rx) = channel();
        let source = Arc::clone(&self.source);
        let ctx = self.host.ui_context().clone();
        let spawned = self.spawner.spawn(Box::new(move || {
            let _ = tx.send(source.fetch());
            ctx.request_repaint();
        }));
        match spawned {
            Ok(()) => self.pending = Some(rx),
            Err(e) => {
                tracing::error!(error = %e, "failed to start config loader");
                self.pending = None;
                self.error = Some(format!("could not start config loader: {e}"));
            }
        }
    }

    pub fn composer(&self) -> Option<&DashboardComposer> {
        self.composer.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn poll_config(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(anyhow::anyhow!("config loader stopped")),
        };
        self.pending = None;
        match outcome {
            Ok(cfg) => {
                self.error = None;
                match &mut self.composer {
                    Some(composer) => composer.replace_config(cfg),
                    None => {
                        self.composer = Some(DashboardComposer::new(
                            cfg,
                            Arc::clone(&self.registry),
                            self.host.navigation(),
                        ))
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load dashboard config");
                self.error = Some(format!("{e:#}"));
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        self.poll_config();

        ui.horizontal(|ui| {
            if ui.button("Reload").clicked() {
                self.reload();
            }
            if self.pending.is_some() {
                ui.spinner();
            }
            if let Some(err) = &self.error {
                let color = ui.visuals().error_fg_color;
                ui.colored_label(color, err);
            }
        });
        ui.separator();

        match &mut self.composer {
            Some(composer) => composer.ui(ui),
            None if self.pending.is_some() => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.weak("Loading dashboard…");
                });
            }
            None => {
                ui.weak("Dashboard unavailable.");
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| self.ui(ui));
    }
}

/// Shown instead of the dashboard when the host could not be set up.
pub struct StartupFailure {
    message: String,
}

impl StartupFailure {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl eframe::App for StartupFailure {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Dashboard failed to start");
            let color = ui.visuals().error_fg_color;
            ui.colored_label(color, &self.message);
        });
    }
}
