// CountryLayer: loads the boundary GeoJSON once per map instance, prepares
// per-feature render/hit data, and paints four passes over the base tiles in
// a fixed stacking order: visited fill, visited border, hover highlight,
// labels. Paint membership is derived from the visited-code set only when
// that set changes; hover lives in a small per-feature side table.
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke};
use rustc_hash::{FxHashMap, FxHashSet};
use walkers::{MapMemory, Plugin, Projector};

use crate::geometry::{self, CountryFeature, GeoBounds, Geometry, Pos};
use crate::map::Alive;

// --- Visual constants ---

pub const VISITED_FILL_COLOR: Color32 = Color32::from_rgb(0x00, 0x83, 0x8f);
pub const VISITED_FILL_OPACITY: f32 = 0.35;
pub const VISITED_BORDER_WIDTH: f32 = 1.5;
pub const HOVER_FILL_OPACITY: f32 = 0.2;
const LABEL_COLOR: Color32 = Color32::from_rgb(70, 70, 70);
const LABEL_FONT_SIZE: f32 = 11.0;

const GEOMETRY_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One country with everything precomputed at load time, so per-frame work
/// is projection and painting only.
pub struct PreparedCountry {
    pub code: String,
    pub name: Option<String>,
    pub geometry: Geometry,
    pub bounds: GeoBounds,
    pub fill: Vec<[Pos; 3]>,
    pub label_anchor: Option<Pos>,
}

/// Turn parsed features into render-ready countries. Features without any
/// coordinates are dropped.
pub fn prepare(features: Vec<CountryFeature>) -> Vec<PreparedCountry> {
    features
        .into_iter()
        .filter_map(|f| {
            let bounds = f.geometry.bounding_box()?;
            let fill = f.geometry.fill_triangles();
            let label_anchor = f.geometry.label_anchor();
            Some(PreparedCountry {
                code: f.code,
                name: f.name,
                geometry: f.geometry,
                bounds,
                fill,
                label_anchor,
            })
        })
        .collect()
}

/// Per-feature hover flags, the side table consulted by the hover paint
/// pass. At most one flag is set at a time; the selection controller owns
/// the transitions.
#[derive(Default)]
pub struct HoverTable {
    flags: FxHashMap<String, bool>,
}

impl HoverTable {
    /// Set the hover flag; false when it was already set (no state write).
    pub fn mark(&mut self, code: &str) -> bool {
        if self.is_hovered(code) {
            return false;
        }
        self.flags.insert(code.to_owned(), true);
        true
    }

    /// Clear one flag; false when it was not set.
    pub fn clear(&mut self, code: &str) -> bool {
        self.flags.remove(code).unwrap_or(false)
    }

    pub fn clear_all(&mut self) {
        self.flags.clear();
    }

    pub fn is_hovered(&self, code: &str) -> bool {
        self.flags.get(code).copied().unwrap_or(false)
    }

    fn current(&self) -> Option<String> {
        self.flags.iter().find(|(_, set)| **set).map(|(code, _)| code.clone())
    }
}

/// Result slot the pointer probe writes into during the map widget pass.
pub type ProbeResult = Arc<Mutex<Option<String>>>;

pub struct CountryLayer {
    countries: Option<Arc<Vec<PreparedCountry>>>,
    index: FxHashMap<String, usize>,
    rx: Option<Receiver<Vec<PreparedCountry>>>,
    visited: Arc<FxHashSet<String>>,
    pub hover: HoverTable,
}

impl CountryLayer {
    pub fn new() -> Self {
        Self {
            countries: None,
            index: FxHashMap::default(),
            rx: None,
            visited: Arc::new(FxHashSet::default()),
            hover: HoverTable::default(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.countries.is_some()
    }

    pub fn load_started(&self) -> bool {
        self.rx.is_some() || self.countries.is_some()
    }

    /// Fetch and prepare the boundary dataset on a background thread. Called
    /// once per map instance; the liveness token keeps a teardown race from
    /// doing work for a dead map.
    pub fn begin_load(&mut self, source: &str, alive: Alive, egui_ctx: egui::Context) {
        if self.load_started() {
            return;
        }
        let (tx, rx) = bounded(1);
        self.rx = Some(rx);
        let source = source.to_owned();
        thread::spawn(move || {
            let prepared = match load_source(&source).and_then(|text| {
                Ok(prepare(geometry::parse_countries(&text)?))
            }) {
                Ok(prepared) => prepared,
                Err(err) => {
                    log::warn!("country boundaries unavailable ({err:#}); map stays bare");
                    return;
                }
            };
            if !alive.check() {
                return;
            }
            let _ = tx.send(prepared);
            egui_ctx.request_repaint();
        });
    }

    /// Drain the load channel. `surface_alive` is the registration guard: a
    /// result arriving for a dead map is discarded and no layer appears.
    /// Returns true when the layer was registered this call.
    pub fn poll(&mut self, surface_alive: bool) -> bool {
        let Some(rx) = self.rx.as_ref() else {
            return false;
        };
        match rx.try_recv() {
            Ok(prepared) => self.register(prepared, surface_alive),
            Err(_) => false,
        }
    }

    fn register(&mut self, prepared: Vec<PreparedCountry>, surface_alive: bool) -> bool {
        self.rx = None;
        if !surface_alive {
            log::debug!("map gone before boundaries arrived; skipping layer");
            return false;
        }
        log::info!("country layer ready: {} features", prepared.len());
        self.index = prepared
            .iter()
            .enumerate()
            .map(|(i, c)| (c.code.clone(), i))
            .collect();
        self.countries = Some(Arc::new(prepared));
        self.warn_unmatched_codes();
        true
    }

    /// Re-derive paint membership after the visited set changed (initial
    /// load, or remote rows superseding the fallback).
    pub fn restyle(&mut self, visited: &FxHashSet<String>) {
        self.visited = Arc::new(visited.clone());
        self.warn_unmatched_codes();
    }

    fn warn_unmatched_codes(&self) {
        if self.countries.is_none() {
            return;
        }
        for code in self.visited.iter() {
            if !self.index.contains_key(code) {
                log::warn!("visited country {code} has no boundary feature");
            }
        }
    }

    pub fn feature(&self, code: &str) -> Option<&PreparedCountry> {
        let countries = self.countries.as_ref()?;
        self.index.get(code).map(|&i| &countries[i])
    }

    /// Build this frame's paint passes plus the pointer probe. None until
    /// the layer is registered.
    pub fn passes(&self, pointer: Option<Pos2>, probe_out: ProbeResult) -> Option<LayerPasses> {
        let countries = self.countries.as_ref()?.clone();
        Some(LayerPasses {
            fill: FillPass { countries: countries.clone(), visited: self.visited.clone() },
            border: BorderPass { countries: countries.clone(), visited: self.visited.clone() },
            hover: HoverPass { countries: countries.clone(), hovered: self.hover.current() },
            labels: LabelPass { countries: countries.clone(), visited: self.visited.clone() },
            probe: PointerProbe { countries, pointer, out: probe_out },
        })
    }
}

fn load_source(source: &str) -> anyhow::Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        Ok(ureq::get(source).timeout(GEOMETRY_FETCH_TIMEOUT).call()?.into_string()?)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

/// The four stacked paint passes and the hit probe, in add order.
pub struct LayerPasses {
    pub fill: FillPass,
    pub border: BorderPass,
    pub hover: HoverPass,
    pub labels: LabelPass,
    pub probe: PointerProbe,
}

fn project_pos(projector: &Projector, p: Pos) -> Pos2 {
    let v = projector.project(walkers::lat_lon(p[1], p[0]));
    egui::pos2(v.x, v.y)
}

/// Screen rectangle of a country's geographic bounds; mercator is monotone
/// per axis, so the box of the corners is the box of the country.
fn projected_bounds(projector: &Projector, b: &GeoBounds) -> Rect {
    let nw = project_pos(projector, [b.min_lon, b.max_lat]);
    let se = project_pos(projector, [b.max_lon, b.min_lat]);
    Rect::from_two_pos(nw, se)
}

fn fill_mesh(
    countries: &[PreparedCountry],
    select: impl Fn(&PreparedCountry) -> bool,
    projector: &Projector,
    clip: Rect,
    color: Color32,
) -> egui::epaint::Mesh {
    let mut mesh = egui::epaint::Mesh::default();
    for country in countries.iter().filter(|c| select(c)) {
        if !projected_bounds(projector, &country.bounds).intersects(clip) {
            continue;
        }
        for tri in &country.fill {
            let base = mesh.vertices.len() as u32;
            for p in tri {
                mesh.vertices.push(egui::epaint::Vertex {
                    pos: project_pos(projector, *p),
                    uv: egui::epaint::WHITE_UV,
                    color,
                });
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
    }
    mesh
}

pub struct FillPass {
    countries: Arc<Vec<PreparedCountry>>,
    visited: Arc<FxHashSet<String>>,
}

impl Plugin for FillPass {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let color = VISITED_FILL_COLOR.gamma_multiply(VISITED_FILL_OPACITY);
        let mesh = fill_mesh(
            &self.countries,
            |c| self.visited.contains(&c.code),
            projector,
            ui.clip_rect(),
            color,
        );
        if !mesh.is_empty() {
            ui.painter().add(egui::Shape::mesh(mesh));
        }
    }
}

pub struct BorderPass {
    countries: Arc<Vec<PreparedCountry>>,
    visited: Arc<FxHashSet<String>>,
}

impl Plugin for BorderPass {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let clip = ui.clip_rect();
        let stroke = Stroke::new(VISITED_BORDER_WIDTH, VISITED_FILL_COLOR);
        let painter = ui.painter();
        for country in self.countries.iter().filter(|c| self.visited.contains(&c.code)) {
            if !projected_bounds(projector, &country.bounds).intersects(clip) {
                continue;
            }
            for rings in country.geometry.polygons() {
                for ring in rings {
                    let mut points: Vec<Pos2> =
                        ring.iter().map(|p| project_pos(projector, *p)).collect();
                    if let Some(first) = points.first().copied() {
                        points.push(first);
                    }
                    painter.add(egui::Shape::line(points, stroke));
                }
            }
        }
    }
}

pub struct HoverPass {
    countries: Arc<Vec<PreparedCountry>>,
    hovered: Option<String>,
}

impl Plugin for HoverPass {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let Some(hovered) = self.hovered.clone() else {
            return;
        };
        let color = VISITED_FILL_COLOR.gamma_multiply(HOVER_FILL_OPACITY);
        let mesh = fill_mesh(
            &self.countries,
            |c| c.code == hovered,
            projector,
            ui.clip_rect(),
            color,
        );
        if !mesh.is_empty() {
            ui.painter().add(egui::Shape::mesh(mesh));
        }
    }
}

pub struct LabelPass {
    countries: Arc<Vec<PreparedCountry>>,
    visited: Arc<FxHashSet<String>>,
}

impl Plugin for LabelPass {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let clip = ui.clip_rect();
        let painter = ui.painter();
        for country in self.countries.iter().filter(|c| self.visited.contains(&c.code)) {
            let (Some(name), Some(anchor)) = (country.name.as_deref(), country.label_anchor)
            else {
                continue;
            };
            let pos = project_pos(projector, anchor);
            if clip.contains(pos) {
                painter.text(
                    pos,
                    Align2::CENTER_CENTER,
                    name,
                    FontId::proportional(LABEL_FONT_SIZE),
                    LABEL_COLOR,
                );
            }
        }
    }
}

/// Finds the topmost country under the pointer, in screen space against the
/// same projected outlines the paint passes draw. Covers every feature, not
/// just visited ones; the selection controller decides what a hit means.
pub struct PointerProbe {
    countries: Arc<Vec<PreparedCountry>>,
    pointer: Option<Pos2>,
    out: ProbeResult,
}

impl Plugin for PointerProbe {
    fn run(
        self: Box<Self>,
        _ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let Some(pointer) = self.pointer else {
            return;
        };
        let mut hit = None;
        // later features paint on top, so scan back to front
        for country in self.countries.iter().rev() {
            if !projected_bounds(projector, &country.bounds).contains(pointer) {
                continue;
            }
            let inside = country
                .geometry
                .polygons()
                .iter()
                .any(|rings| screen_point_in_polygon(rings, projector, pointer));
            if inside {
                hit = Some(country.code.clone());
                break;
            }
        }
        if let Ok(mut out) = self.out.lock() {
            *out = hit;
        }
    }
}

/// Even-odd test over all rings of one polygon, so holes count as outside.
fn screen_point_in_polygon(rings: &[Vec<Pos>], projector: &Projector, p: Pos2) -> bool {
    let mut inside = false;
    for ring in rings {
        let points: Vec<Pos2> = ring.iter().map(|v| project_pos(projector, *v)).collect();
        let n = points.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (points[i], points[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}
