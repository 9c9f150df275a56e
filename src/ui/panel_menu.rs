//! Device panel: LED mirror, message counter and the config form.

use eframe::egui::{vec2, Color32, Grid, RichText, Sense, Stroke, TextEdit, Ui};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::common::{create_frame, UiColors};
use crate::config::UIConfig;
use crate::panel::color::Indicator;
use crate::panel::compose::ConfigForm;
use crate::panel::session::{PanelView, SessionEvent};

const LED_RADIUS: f32 = 48.0;
const GLOW_RADIUS: f32 = 64.0;

pub struct PanelMenuData {
    form: ConfigForm,
    action_sender: mpsc::Sender<SessionEvent>,
}

impl PanelMenuData {
    pub fn new(ui_config: &UIConfig, action_sender: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            form: ConfigForm::new(
                ui_config.default_interval.clone(),
                ui_config.default_colors.clone(),
            ),
            action_sender,
        }
    }

    pub fn render(&mut self, ui: &mut Ui, view: &PanelView) {
        create_frame(UiColors::MAIN_BG, UiColors::BORDER).show(ui, |ui| {
            ui.horizontal(|ui| {
                create_frame(UiColors::EXTREME_BG, UiColors::BORDER).show(ui, |ui| {
                    draw_indicator(ui, &view.indicator);
                });
                ui.add_space(12.0);
                ui.vertical(|ui| {
                    Grid::new("monitor_grid")
                        .num_columns(2)
                        .spacing([12.0, 6.0])
                        .show(ui, |ui| {
                            ui.label("Last color");
                            ui.label(RichText::new(view.received_text.as_str()).strong());
                            ui.end_row();

                            ui.label("Messages");
                            ui.label(view.message_count.to_string());
                            ui.end_row();
                        });
                });
            });
        });

        ui.add_space(8.0);

        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.heading("Device config");
            Grid::new("config_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Interval (s)");
                    ui.add(
                        TextEdit::singleline(&mut self.form.interval)
                            .hint_text("3")
                            .desired_width(80.0),
                    );
                    ui.end_row();

                    ui.label("Colors");
                    ui.add(
                        TextEdit::singleline(&mut self.form.colors)
                            .hint_text("red,green,blue")
                            .desired_width(220.0),
                    );
                    ui.end_row();
                });

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("Send config").clicked() {
                    self.submit();
                }
                if !view.config_status.is_empty() {
                    ui.label(view.config_status.as_str());
                }
            });
        });
    }

    /// Hands the current form to the session; validation happens there.
    fn submit(&self) -> bool {
        match self
            .action_sender
            .try_send(SessionEvent::SubmitConfig(self.form.clone()))
        {
            Ok(()) => {
                debug!("Submitted config form {:?}", self.form);
                true
            }
            Err(e) => {
                warn!("Unable to submit config form: {}", e);
                false
            }
        }
    }
}

fn draw_indicator(ui: &mut Ui, indicator: &Indicator) {
    let size = vec2(GLOW_RADIUS * 2.0, GLOW_RADIUS * 2.0);
    let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
    let center = rect.center();
    let painter = ui.painter();

    let fill = indicator
        .color()
        .map(|color| color.fill())
        .unwrap_or(UiColors::LED_OFF);

    if indicator.is_glowing() {
        painter.circle_filled(center, GLOW_RADIUS, fill.gamma_multiply(0.25));
        painter.circle_filled(
            center,
            (LED_RADIUS + GLOW_RADIUS) / 2.0,
            fill.gamma_multiply(0.45),
        );
    }
    painter.circle_filled(center, LED_RADIUS, fill);
    let rim = if indicator.is_glowing() {
        Color32::WHITE
    } else {
        UiColors::BORDER
    };
    painter.circle_stroke(center, LED_RADIUS, Stroke::new(2.0, rim));
}
