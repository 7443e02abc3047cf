// Detail drawer for the selected country: right-hand panel on wide windows,
// bottom sheet on narrow ones. Only the close button is reported back; the
// other dismissal paths (backdrop click, Escape) are handled by the caller
// and funnel into the same selection transition.
use eframe::egui::{self, Align2, Color32, RichText};

use crate::map::layer::VISITED_FILL_COLOR;
use crate::travel::TravelData;

pub const DRAWER_WIDTH: f32 = 400.0;
/// Fraction of the window height the bottom sheet may take.
const SHEET_HEIGHT_FRACTION: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawerEvent {
    None,
    CloseRequested,
}

/// Render the drawer for `code`. The selection invariant guarantees a
/// dataset entry exists; a miss just renders nothing.
pub fn show(ctx: &egui::Context, code: &str, travel: &TravelData, narrow: bool) -> DrawerEvent {
    let Some(country) = travel.country(code) else {
        return DrawerEvent::None;
    };
    let mut event = DrawerEvent::None;
    let screen = ctx.screen_rect();

    let window = if narrow {
        egui::Window::new("country-visits")
            .anchor(Align2::CENTER_BOTTOM, egui::vec2(0.0, 0.0))
            .fixed_size(egui::vec2(
                screen.width() - 24.0,
                screen.height() * SHEET_HEIGHT_FRACTION,
            ))
    } else {
        egui::Window::new("country-visits")
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .fixed_size(egui::vec2(DRAWER_WIDTH, screen.height() - 48.0))
    };

    window
        .title_bar(false)
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&country.country_name);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✕").clicked() {
                        event = DrawerEvent::CloseRequested;
                    }
                });
            });
            ui.separator();

            if country.visits.is_empty() {
                ui.label(
                    RichText::new("No visits recorded yet.").italics().color(Color32::GRAY),
                );
                return;
            }

            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                for (i, visit) in country.visits.iter().enumerate() {
                    if i > 0 {
                        ui.add_space(4.0);
                        ui.separator();
                    }
                    ui.add_space(4.0);
                    ui.label(RichText::new(&visit.city).size(14.0).strong());
                    ui.label(RichText::new(&visit.purpose).color(VISITED_FILL_COLOR));
                    ui.label(RichText::new(&visit.date_range).size(10.0).color(Color32::GRAY));
                    if !visit.description.is_empty() {
                        ui.label(&visit.description);
                    }
                    if !visit.highlights.is_empty() {
                        ui.add_space(2.0);
                        ui.horizontal_wrapped(|ui| {
                            for highlight in &visit.highlights {
                                ui.label(
                                    RichText::new(highlight)
                                        .size(10.0)
                                        .background_color(Color32::from_black_alpha(20)),
                                );
                            }
                        });
                    }
                    if let Some(url) = &visit.image_url {
                        ui.add_space(4.0);
                        ui.add(egui::Image::new(url.as_str()).max_width(ui.available_width()));
                    }
                    ui.add_space(4.0);
                }
            });
        });

    event
}
