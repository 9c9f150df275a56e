pub mod config;
pub mod mqtt;
pub mod panel;
pub mod ui;

use crate::config::PanelConfig;
use crate::mqtt::config::generate_client_id;
use crate::mqtt::connection::Connection;
use crate::mqtt::driver::RumqttLink;
use crate::panel::session::{PanelView, Session};
use crate::ui::PanelUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = PanelConfig::load();
    let cancel = CancellationToken::new();

    let client_id = generate_client_id(&config.mqtt.client_prefix);
    info!(
        "Panel for {} (monitor {}, config {}) as {}",
        config.mqtt.address(),
        config.mqtt.monitor_topic,
        config.mqtt.config_topic,
        client_id
    );

    let (bus_tx, bus_rx) = mpsc::channel(100);
    let link = RumqttLink::spawn(&config.mqtt, &client_id, bus_tx, cancel.clone());
    let connection = Connection::new(&config.mqtt, client_id.clone(), Box::new(link));

    let (view_tx, view_rx) = watch::channel(PanelView::default());
    let (session, action_tx) = Session::new(&config, connection, view_tx);
    let session_handle = tokio::spawn(session.run(bus_rx, cancel.clone()));

    info!("Starting UI");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 360.0])
            .with_title("ESP32 LED Panel"),
        ..Default::default()
    };

    let broker = config.mqtt.address();
    let ui_config = config.ui.clone();
    let ui_result = eframe::run_native(
        "LED Panel",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(PanelUI::new(
                cc, &ui_config, view_rx, action_tx, broker, client_id,
            )))
        }),
    );

    info!("UI closed, shutting down");
    cancel.cancel();
    let _ = session_handle.await;

    ui_result.map_err(|e| eyre!("UI terminated with error: {}", e))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
