use dashboard_shell::gui::{DashboardApp, StartupFailure};
use dashboard_shell::logging;
use dashboard_shell::settings::Settings;

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load("settings.json")?;
    logging::init(settings.debug_logging, settings.log_file());
    tracing::info!(
        dashboard = %settings.dashboard_url.as_deref().unwrap_or(&settings.dashboard_path),
        "starting dashboard shell"
    );

    let (width, height) = settings.window_size;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dashboard",
        native_options,
        Box::new(move |cc| match DashboardApp::bootstrap(&cc.egui_ctx, &settings) {
            Ok(app) => Box::new(app) as Box<dyn eframe::App>,
            Err(e) => {
                tracing::error!(error = %e, "failed to start dashboard");
                Box::new(StartupFailure::new(format!("{e:#}")))
            }
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to run window: {e}"))
}
