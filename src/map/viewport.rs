// Web Mercator viewport math shared by the engine and the selection
// controller: projection, bounds fitting with asymmetric padding, and the
// eased camera animation.
use std::f64::consts::PI;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::geometry::GeoBounds;

/// Logical tile edge in points. walkers sizes the world as
/// `TILE_SIZE * 2^zoom`, so all math here must use the same base.
pub const TILE_SIZE: f64 = 256.0;

/// Mercator singularity cutoff.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Window width below which the bottom-sheet layout (and its padding) is used.
pub const NARROW_WIDTH_THRESHOLD: f32 = 768.0;

/// Pixel insets reserved around a fitted bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPadding {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Wide-window padding; the large right inset keeps the fitted country clear
/// of the detail drawer.
pub const FIT_PADDING_DESKTOP: FitPadding =
    FitPadding { top: 80.0, bottom: 80.0, left: 80.0, right: 440.0 };

/// Narrow-window padding; the large bottom inset keeps it clear of the
/// bottom sheet.
pub const FIT_PADDING_NARROW: FitPadding =
    FitPadding { top: 80.0, bottom: 340.0, left: 40.0, right: 40.0 };

pub fn padding_for_width(width: f32) -> FitPadding {
    if width < NARROW_WIDTH_THRESHOLD { FIT_PADDING_NARROW } else { FIT_PADDING_DESKTOP }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Geographic position to world pixels at `zoom`.
pub fn project(lon: f64, lat: f64, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / size)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Center (lon, lat) and zoom that frame `bounds` inside `viewport` (width,
/// height in points) with `padding` kept clear, never zooming past
/// `max_zoom`. The padding asymmetry shifts the center so the box lands in
/// the unpadded region, which is how room is reserved for the drawer.
pub fn fit_bounds(
    bounds: GeoBounds,
    viewport: (f32, f32),
    padding: FitPadding,
    max_zoom: f64,
) -> ((f64, f64), f64) {
    let avail_w = (viewport.0 - padding.left - padding.right).max(1.0) as f64;
    let avail_h = (viewport.1 - padding.top - padding.bottom).max(1.0) as f64;

    // Box extent in world pixels at zoom 0; latitude grows downward in
    // mercator, so the top-left corner is (min_lon, max_lat).
    let (x0, y0) = project(bounds.min_lon, bounds.max_lat, 0.0);
    let (x1, y1) = project(bounds.max_lon, bounds.min_lat, 0.0);
    let box_w = (x1 - x0).max(1e-9);
    let box_h = (y1 - y0).max(1e-9);

    let zoom = (avail_w / box_w)
        .min(avail_h / box_h)
        .log2()
        .clamp(0.0, max_zoom);

    let (bx0, by0) = project(bounds.min_lon, bounds.max_lat, zoom);
    let (bx1, by1) = project(bounds.max_lon, bounds.min_lat, zoom);
    let cx = (bx0 + bx1) / 2.0 + (padding.right - padding.left) as f64 / 2.0;
    let cy = (by0 + by1) / 2.0 + (padding.bottom - padding.top) as f64 / 2.0;

    (unproject(cx, cy, zoom), zoom)
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// A time-based camera transition, sampled once per frame. Centers are
/// interpolated in world-pixel space so the on-screen path is straight.
#[derive(Debug, Clone)]
pub struct ViewportAnimation {
    from_center: (f64, f64),
    from_zoom: f64,
    to_center: (f64, f64),
    to_zoom: f64,
    started: Instant,
    duration: Duration,
}

impl ViewportAnimation {
    pub fn new(
        from_center: (f64, f64),
        from_zoom: f64,
        to_center: (f64, f64),
        to_zoom: f64,
        duration: Duration,
    ) -> Self {
        Self { from_center, from_zoom, to_center, to_zoom, started: Instant::now(), duration }
    }

    /// Camera state at `now`; the flag is true once the target is reached.
    pub fn sample(&self, now: Instant) -> ((f64, f64), f64, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return (self.to_center, self.to_zoom, true);
        }
        let t = ease_out_cubic(elapsed.as_secs_f64() / self.duration.as_secs_f64());

        let (fx, fy) = project(self.from_center.0, self.from_center.1, 0.0);
        let (tx, ty) = project(self.to_center.0, self.to_center.1, 0.0);
        let center = unproject(fx + (tx - fx) * t, fy + (ty - fy) * t, 0.0);
        let zoom = self.from_zoom + (self.to_zoom - self.from_zoom) * t;
        (center, zoom, false)
    }
}
