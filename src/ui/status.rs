use eframe::egui::{Color32, Ui};

use super::common::UiColors;
use crate::mqtt::connection::ConnectionState;
use crate::panel::session::StatusLine;

pub fn status_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Connected => UiColors::ACTIVE,
        ConnectionState::Connecting => UiColors::PENDING,
        ConnectionState::Disconnected => UiColors::INACTIVE,
    }
}

/// Draws the connection status as a colored dot and text.
pub fn render_status(ui: &mut Ui, status: &StatusLine) {
    let color = status_color(status.state);
    ui.horizontal(|ui| {
        ui.colored_label(color, "\u{2B24}");
        ui.colored_label(color, status.text.as_str());
    });
}
