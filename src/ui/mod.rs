//! # LED Panel User Interface
//!
//! eframe/egui window that mirrors the device LED and edits its blink config.
//!
//! ## Layout
//! - **Top Panel**: title and connection status
//! - **Central Panel**: LED indicator, message counter, config form
//! - **Bottom Panel**: broker address and client id
//!
//! ## Backend Communication
//! The window holds no connection state of its own. Each frame it clones the
//! latest [`PanelView`] from the session's watch channel, and user actions go
//! back as [`SessionEvent`]s through a bounded mpsc sender with `try_send`, so
//! a busy session never blocks a frame.
//!
//! The immediate mode model fits this well: the whole window is rebuilt from
//! the snapshot every frame, so there is nothing to keep in sync.

pub mod common;
pub mod panel_menu;
pub mod status;

use eframe::egui;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::UIConfig;
use crate::panel::session::{PanelView, SessionEvent};

use self::panel_menu::PanelMenuData;

/// Root eframe application.
pub struct PanelUI {
    /// Latest state published by the session
    view_receiver: watch::Receiver<PanelView>,

    panel_menu_data: PanelMenuData,

    /// `host:port` shown in the footer
    broker: String,

    client_id: String,
}

impl PanelUI {
    /// Sets the dark theme and wires the window to the session channels.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        ui_config: &UIConfig,
        view_receiver: watch::Receiver<PanelView>,
        action_sender: mpsc::Sender<SessionEvent>,
        broker: String,
        client_id: String,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        PanelUI {
            view_receiver,
            panel_menu_data: PanelMenuData::new(ui_config, action_sender),
            broker,
            client_id,
        }
    }
}

impl eframe::App for PanelUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Timers change the view without any input event, so keep redrawing
        ctx.request_repaint_after(Duration::from_millis(33));
        let view = self.view_receiver.borrow().clone();

        egui::TopBottomPanel::top("top_panel")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("ESP32 LED");
                    ui.add_space(16.0);
                    status::render_status(ui, &view.status);
                });
            });

        egui::TopBottomPanel::bottom("bottom_panel")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(format!("Broker: {}", self.broker));
                    ui.separator();
                    ui.label(format!("Client: {}", self.client_id));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.panel_menu_data.render(ui, &view);
        });
    }
}
