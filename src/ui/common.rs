//! Shared styling for the panel window.

use eframe::egui::{Color32, Frame, Stroke};

/// Dark theme palette.
///
/// Background colors go from darkest `EXTREME_BG` to lightest `MAIN_BG`;
/// the status colors follow the connection state.
pub struct UiColors;

impl UiColors {
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    pub const EXTREME_BG: Color32 = Color32::from_rgb(20, 20, 20);

    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Connected (green)
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Connection attempt in progress (amber)
    pub const PENDING: Color32 = Color32::from_rgb(230, 170, 30);

    /// Disconnected (red)
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);

    /// LED body before any color was reported
    pub const LED_OFF: Color32 = Color32::from_rgb(70, 70, 70);
}

pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(8)
        .outer_margin(2)
}
