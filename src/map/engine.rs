// MapEngine: owns the walkers tile pipeline and the camera. The handle is
// None until the engine is initialized against the live egui context; every
// camera operation on a not-ready engine is a silent no-op.
use std::time::{Duration, Instant};

use eframe::egui;
use walkers::sources::{Attribution, TileSource};
use walkers::{HttpTiles, MapMemory, Position, TileId, lat_lon};

use crate::config::{MapConfig, TILE_ATTRIBUTION};
use crate::geometry::GeoBounds;
use crate::map::Alive;
use crate::map::viewport::{self, FitPadding, ViewportAnimation};

/// walkers accepts zoom in this range; everything we set is clamped to it.
const ZOOM_RANGE: (f64, f64) = (0.0, 22.0);

/// Tile source driven by a {z}/{x}/{y} URL template from the config.
pub struct TileTemplate {
    url: String,
}

impl TileTemplate {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_owned() }
    }
}

impl TileSource for TileTemplate {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.url
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: TILE_ATTRIBUTION,
            url: "https://carto.com/attributions",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// The live map: valid only between `ensure_ready` and `teardown`.
pub struct MapHandle {
    pub tiles: HttpTiles,
    pub memory: MapMemory,
}

pub struct MapEngine {
    handle: Option<MapHandle>,
    torn_down: bool,
    alive: Alive,
    animation: Option<ViewportAnimation>,
    tile_url: String,
    default_center: (f64, f64), // (lon, lat)
    default_zoom: f64,
    /// Last known size of the map area in points, needed for bounds fitting.
    pub viewport_size: egui::Vec2,
}

impl MapEngine {
    pub fn new(cfg: &MapConfig) -> Self {
        Self {
            handle: None,
            torn_down: false,
            alive: Alive::new(),
            animation: None,
            tile_url: cfg.tile_url.clone(),
            default_center: (cfg.initial_lon, cfg.initial_lat),
            default_zoom: cfg.initial_zoom,
            viewport_size: egui::Vec2::new(1280.0, 800.0),
        }
    }

    /// Token for async work whose result must not outlive this engine.
    pub fn alive(&self) -> Alive {
        self.alive.clone()
    }

    /// Initialize the tile pipeline on first use. Does nothing once torn
    /// down, so a teardown racing initialization stays torn down.
    pub fn ensure_ready(&mut self, ctx: &egui::Context) {
        if self.torn_down || self.handle.is_some() {
            return;
        }
        let tiles = HttpTiles::new(TileTemplate::new(&self.tile_url), ctx.clone());
        let mut memory = MapMemory::default();
        if let Err(err) = memory.set_zoom(self.default_zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1)) {
            log::warn!("initial zoom rejected: {err:?}");
        }
        memory.center_at(lat_lon(self.default_center.1, self.default_center.0));
        self.handle = Some(MapHandle { tiles, memory });
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_mut(&mut self) -> Option<&mut MapHandle> {
        self.handle.as_mut()
    }

    /// Fallback position for the map widget; the camera detaches from it as
    /// soon as `center_at` runs, which `ensure_ready` does.
    pub fn default_position(&self) -> Position {
        lat_lon(self.default_center.1, self.default_center.0)
    }

    fn current_view(&self) -> Option<((f64, f64), f64)> {
        let handle = self.handle.as_ref()?;
        let pos = handle.memory.detached().unwrap_or_else(|| self.default_position());
        Some(((pos.x(), pos.y()), handle.memory.zoom()))
    }

    /// Begin an animated transition to (center, zoom).
    pub fn set_viewport(&mut self, center: (f64, f64), zoom: f64, duration_ms: u64) {
        let Some((from_center, from_zoom)) = self.current_view() else {
            return;
        };
        self.animation = Some(ViewportAnimation::new(
            from_center,
            from_zoom,
            center,
            zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1),
            Duration::from_millis(duration_ms),
        ));
    }

    /// Frame `bounds` under `padding`, honoring the fit-zoom ceiling.
    pub fn fit_bounds(
        &mut self,
        bounds: GeoBounds,
        padding: FitPadding,
        max_zoom: f64,
        duration_ms: u64,
    ) {
        if !self.is_ready() {
            return;
        }
        let size = (self.viewport_size.x, self.viewport_size.y);
        let (center, zoom) = viewport::fit_bounds(bounds, size, padding, max_zoom);
        self.set_viewport(center, zoom, duration_ms);
    }

    /// Animate back to the configured default view.
    pub fn reset_view(&mut self, duration_ms: u64) {
        let (center, zoom) = (self.default_center, self.default_zoom);
        self.set_viewport(center, zoom, duration_ms);
    }

    /// Advance the camera animation; true while still animating (the caller
    /// keeps repainting).
    pub fn tick(&mut self) -> bool {
        let Some(animation) = self.animation.as_ref() else {
            return false;
        };
        let (center, zoom, finished) = animation.sample(Instant::now());
        if let Some(handle) = self.handle.as_mut() {
            handle.memory.center_at(lat_lon(center.1, center.0));
            // clamped at animation start, cannot fail
            let _ = handle.memory.set_zoom(zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1));
        }
        if finished {
            self.animation = None;
        }
        !finished
    }

    /// Release the tile pipeline and revoke the liveness token. Idempotent,
    /// and safe to call before initialization completed.
    pub fn teardown(&mut self) {
        self.alive.revoke();
        self.animation = None;
        self.handle = None;
        self.torn_down = true;
    }
}
