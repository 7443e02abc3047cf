// The eframe application: owns the dataset, the map engine, the country
// layer and the selection controller, and wires pointer input between them
// once per frame.
mod drawer;

use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use eframe::egui;
use rustc_hash::FxHashSet;
use walkers::Map;

use crate::config::AppContext;
use crate::map::engine::MapEngine;
use crate::map::layer::{CountryLayer, ProbeResult};
use crate::map::select::{SelectionController, ViewportRequest};
use crate::map::viewport;
use crate::remote;
use crate::travel::TravelData;

pub const APP_TITLE: &str = "travelmap";

/// Denominator for the HUD pill, as the source displays it.
const TOTAL_COUNTRIES: usize = 195;

pub struct MapApp {
    ctx: AppContext,
    travel: TravelData,
    visited: FxHashSet<String>,
    engine: MapEngine,
    layer: CountryLayer,
    controller: SelectionController,
    remote_rx: Option<Receiver<TravelData>>,
    remote_started: bool,
    probe: ProbeResult,
    geometry_source: String,
    offline: bool,
    last_window_size: Option<(u32, u32)>,
}

impl MapApp {
    pub fn new(
        ctx: AppContext,
        travel: TravelData,
        geometry_override: Option<String>,
        offline: bool,
    ) -> Self {
        let visited = travel.visited_codes();
        let engine = MapEngine::new(&ctx.map);
        let geometry_source =
            geometry_override.unwrap_or_else(|| ctx.map.geometry_source.clone());
        Self {
            ctx,
            travel,
            visited,
            engine,
            layer: CountryLayer::new(),
            controller: SelectionController::new(),
            remote_rx: None,
            remote_started: false,
            probe: Arc::new(Mutex::new(None)),
            geometry_source,
            offline,
            last_window_size: None,
        }
    }

    pub fn run(self) -> Result<(), eframe::Error> {
        let width = self.ctx.gui.width.unwrap_or(1280) as f32;
        let height = self.ctx.gui.height.unwrap_or(800) as f32;
        let font_scale = self.ctx.gui.font_scale.unwrap_or(1.0);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width, height])
                .with_title(APP_TITLE),
            ..Default::default()
        };

        eframe::run_native(
            APP_TITLE,
            options,
            Box::new(move |cc| {
                egui_extras::install_image_loaders(&cc.egui_ctx);
                if (font_scale - 1.0).abs() > f32::EPSILON {
                    cc.egui_ctx.set_zoom_factor(font_scale);
                }
                Ok(Box::new(self))
            }),
        )
    }

    /// Drain the one-shot background channels: remote travel rows and the
    /// boundary geometry. Both re-derive paint state on arrival.
    fn poll_background(&mut self) {
        if let Some(rx) = &self.remote_rx {
            if let Ok(data) = rx.try_recv() {
                log::info!("remote travel data loaded: {} countries", data.len());
                self.travel = data;
                self.visited = self.travel.visited_codes();
                self.layer.restyle(&self.visited);
                self.remote_rx = None;
            }
        }
        if self.layer.poll(self.engine.is_ready()) {
            self.layer.restyle(&self.visited);
        }
    }

    fn apply_request(&mut self, request: ViewportRequest, window_width: f32) {
        let duration = self.ctx.map.transition_ms;
        match request {
            ViewportRequest::Fit(bounds) => {
                let padding = viewport::padding_for_width(window_width);
                self.engine.fit_bounds(bounds, padding, self.ctx.map.max_fit_zoom, duration);
            }
            ViewportRequest::Reset => self.engine.reset_view(duration),
            ViewportRequest::None => {}
        }
    }

    fn show_map(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, window_width: f32) {
        self.engine.viewport_size = ui.available_size();

        let pointer = ui.input(|i| i.pointer.latest_pos());
        if let Ok(mut slot) = self.probe.lock() {
            *slot = None;
        }
        let passes = self.layer.passes(pointer, self.probe.clone());
        let my_position = self.engine.default_position();

        let Some(handle) = self.engine.handle_mut() else {
            ui.centered_and_justified(|ui| {
                ui.spinner();
            });
            return;
        };

        let mut map = Map::new(Some(&mut handle.tiles), &mut handle.memory, my_position);
        if let Some(passes) = passes {
            map = map
                .with_plugin(passes.fill)
                .with_plugin(passes.border)
                .with_plugin(passes.hover)
                .with_plugin(passes.labels)
                .with_plugin(passes.probe);
        }
        let response = ui.add(map);

        let hit = if response.hovered() {
            self.probe.lock().map(|slot| (*slot).clone()).unwrap_or(None)
        } else {
            None
        };

        if response.hovered() {
            if self.controller.pointer_move(hit.as_deref(), &self.visited, &mut self.layer.hover)
            {
                ctx.request_repaint();
            }
        } else {
            self.controller.pointer_leave(&mut self.layer.hover);
        }
        if self.controller.hovered().is_some() {
            ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        if response.clicked() {
            let request = self.controller.click(
                hit.as_deref().and_then(|code| {
                    self.layer.feature(code).map(|c| (code, &c.geometry))
                }),
                &self.visited,
            );
            self.apply_request(request, window_width);
            ctx.request_repaint();
        }
    }

    fn show_hud(&self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("visited-hud"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let visited = self.visited.len();
                        let pct =
                            (visited as f32 / TOTAL_COUNTRIES as f32 * 100.0).round() as u32;
                        ui.label(
                            egui::RichText::new(format!("{visited}/{TOTAL_COUNTRIES} countries"))
                                .strong(),
                        );
                        ui.label(
                            egui::RichText::new(format!("({pct}%)")).color(egui::Color32::GRAY),
                        );
                    });
                });
            });
    }
}

impl eframe::App for MapApp {
    fn ui(&mut self, ui: &mut egui::Ui, frame: &mut eframe::Frame) {
        let ctx = ui.ctx().clone();
        self.update(&ctx, frame);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.engine.ensure_ready(ctx);

        if self.engine.is_ready() {
            if !self.layer.load_started() {
                self.layer.begin_load(&self.geometry_source, self.engine.alive(), ctx.clone());
            }
            if !self.remote_started {
                self.remote_started = true;
                if self.offline {
                    log::info!("offline mode: keeping local travel data");
                } else {
                    self.remote_rx =
                        remote::spawn_fetch(&self.ctx.remote, self.engine.alive(), ctx.clone());
                }
            }
        }

        self.poll_background();

        if self.engine.tick() {
            ctx.request_repaint();
        }

        let screen = ctx.screen_rect();
        self.last_window_size = Some((screen.width() as u32, screen.height() as u32));
        let narrow = screen.width() < viewport::NARROW_WIDTH_THRESHOLD;

        egui::CentralPanel::default().frame(egui::Frame::NONE).show(ctx, |ui| {
            self.show_map(ui, ctx, screen.width());
        });

        if let Some(code) = self.controller.selected().map(str::to_owned) {
            let event = drawer::show(ctx, &code, &self.travel, narrow);
            // Escape only matters while the panel is open
            let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
            if event == drawer::DrawerEvent::CloseRequested || escape {
                let request = self.controller.dismiss();
                self.apply_request(request, screen.width());
                ctx.request_repaint();
            }
        }

        self.show_hud(ctx);
    }

    fn on_exit(&mut self) {
        if let Some((width, height)) = self.last_window_size {
            if let Err(err) = self.ctx.save_window_size(width, height) {
                log::warn!("could not save window size: {err:#}");
            }
        }
        self.engine.teardown();
    }
}
