mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use std::path::Path;

use app::SalaryDashboardApp;
use config::{DashboardConfig, CONFIG_FILE_NAME};
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::load_or_default(Path::new(CONFIG_FILE_NAME));
    let source = config.data_url.clone();

    // The dataset is fetched once, before the window opens.
    let mut state = AppState::new(config);
    state.load_source(&source);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dashboard de Salários na Área de Dados",
        options,
        Box::new(|_cc| Ok(Box::new(SalaryDashboardApp::new(state)))),
    )
}
