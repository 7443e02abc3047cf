// Country boundary geometry: GeoJSON decoding, bounding boxes, hit testing
// and fill-mesh triangulation. Everything here is plain geographic math with
// no rendering dependencies so it can be exercised standalone (see geom_test).
use geo::{Area, Centroid, Contains};
use serde::Deserialize;
use serde_json::Value;

/// A single [longitude, latitude] pair, GeoJSON axis order.
pub type Pos = [f64; 2];

/// Feature property carrying the ISO 3166-1 alpha-3 join key.
pub const CODE_PROPERTY: &str = "ISO_A3";

/// Property names tried, in order, for a display name.
const NAME_PROPERTIES: [&str; 3] = ["ADMIN", "NAME", "name"];

/// GeoJSON geometry as a tagged union. Coordinate nesting depth is fixed per
/// variant, so descending to [lon, lat] pairs is structural, not probed at
/// runtime.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Pos },
    LineString { coordinates: Vec<Pos> },
    Polygon { coordinates: Vec<Vec<Pos>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Pos>>> },
}

/// Minimal axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn contains(&self, p: Pos) -> bool {
        p[0] >= self.min_lon && p[0] <= self.max_lon && p[1] >= self.min_lat && p[1] <= self.max_lat
    }

    pub fn center(&self) -> Pos {
        [(self.min_lon + self.max_lon) / 2.0, (self.min_lat + self.max_lat) / 2.0]
    }

    fn extend(&mut self, p: Pos) {
        if p[0] < self.min_lon { self.min_lon = p[0]; }
        if p[0] > self.max_lon { self.max_lon = p[0]; }
        if p[1] < self.min_lat { self.min_lat = p[1]; }
        if p[1] > self.max_lat { self.max_lat = p[1]; }
    }

    fn around(p: Pos) -> Self {
        Self { min_lon: p[0], min_lat: p[1], max_lon: p[0], max_lat: p[1] }
    }
}

impl Geometry {
    /// Visit every coordinate pair in the geometry, whatever the nesting.
    pub fn each_position(&self, f: &mut impl FnMut(Pos)) {
        match self {
            Geometry::Point { coordinates } => f(*coordinates),
            Geometry::LineString { coordinates } => {
                for p in coordinates {
                    f(*p);
                }
            }
            Geometry::Polygon { coordinates } => {
                for ring in coordinates {
                    for p in ring {
                        f(*p);
                    }
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for poly in coordinates {
                    for ring in poly {
                        for p in ring {
                            f(*p);
                        }
                    }
                }
            }
        }
    }

    /// The polygons of this geometry as ring lists (exterior first, then
    /// holes). Point/LineString have none.
    pub fn polygons(&self) -> &[Vec<Vec<Pos>>] {
        match self {
            Geometry::Polygon { coordinates } => std::slice::from_ref(coordinates),
            Geometry::MultiPolygon { coordinates } => coordinates.as_slice(),
            _ => &[],
        }
    }

    /// Minimal axis-aligned box enclosing every coordinate pair, or None for
    /// an empty geometry.
    pub fn bounding_box(&self) -> Option<GeoBounds> {
        let mut bounds: Option<GeoBounds> = None;
        self.each_position(&mut |p| {
            bounds.get_or_insert(GeoBounds::around(p)).extend(p);
        });
        bounds
    }

    /// Convert to geo types for containment/centroid/area queries.
    pub fn to_multi_polygon(&self) -> Option<geo::MultiPolygon<f64>> {
        let mut polys = Vec::new();
        for rings in self.polygons() {
            let Some(exterior) = rings.first() else { continue };
            let holes = rings[1..].iter().map(|r| ring_to_line(r)).collect();
            polys.push(geo::Polygon::new(ring_to_line(exterior), holes));
        }
        if polys.is_empty() { None } else { Some(geo::MultiPolygon(polys)) }
    }

    /// Geographic point-in-polygon test (holes respected).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        self.to_multi_polygon()
            .map(|mp| mp.contains(&geo::Point::new(lon, lat)))
            .unwrap_or(false)
    }

    /// Anchor for a text label: centroid of the largest polygon.
    pub fn label_anchor(&self) -> Option<Pos> {
        let mp = self.to_multi_polygon()?;
        let largest = mp
            .0
            .iter()
            .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))?;
        let c = largest.centroid()?;
        Some([c.x(), c.y()])
    }

    /// Triangulate the interior for filled rendering. egui only fills convex
    /// paths, so each polygon is Delaunay-triangulated over its ring vertices
    /// and triangles are kept only when their centroid lies inside the
    /// polygon, which discards hull triangles spanning concavities or holes.
    pub fn fill_triangles(&self) -> Vec<[Pos; 3]> {
        let mut out = Vec::new();
        for rings in self.polygons() {
            let Some(exterior) = rings.first() else { continue };
            let poly = geo::Polygon::new(
                ring_to_line(exterior),
                rings[1..].iter().map(|r| ring_to_line(r)).collect(),
            );
            let mut pts: Vec<delaunator::Point> = Vec::new();
            for ring in rings {
                for p in open_ring(ring) {
                    pts.push(delaunator::Point { x: p[0], y: p[1] });
                }
            }
            if pts.len() < 3 {
                continue;
            }
            let triangulation = delaunator::triangulate(&pts);
            for tri in triangulation.triangles.chunks_exact(3) {
                let (a, b, c) = (&pts[tri[0]], &pts[tri[1]], &pts[tri[2]]);
                let cx = (a.x + b.x + c.x) / 3.0;
                let cy = (a.y + b.y + c.y) / 3.0;
                if poly.contains(&geo::Point::new(cx, cy)) {
                    out.push([[a.x, a.y], [b.x, b.y], [c.x, c.y]]);
                }
            }
        }
        out
    }
}

fn ring_to_line(ring: &[Pos]) -> geo::LineString<f64> {
    geo::LineString::from(ring.iter().map(|p| (p[0], p[1])).collect::<Vec<(f64, f64)>>())
}

/// GeoJSON rings repeat the first vertex at the end; the triangulator wants
/// each vertex once.
fn open_ring(ring: &[Pos]) -> &[Pos] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// One country boundary feature, joined to travel data by alpha-3 code.
#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub code: String,
    pub name: Option<String>,
    pub geometry: Geometry,
}

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Value,
    geometry: Value,
}

/// Parse a GeoJSON FeatureCollection into country features. Features without
/// a usable code or with an unsupported geometry type are skipped, not fatal.
pub fn parse_countries(geojson: &str) -> anyhow::Result<Vec<CountryFeature>> {
    let raw: RawCollection = serde_json::from_str(geojson)?;
    let mut out = Vec::with_capacity(raw.features.len());
    for feature in raw.features {
        let Some(code) = feature.properties.get(CODE_PROPERTY).and_then(Value::as_str) else {
            continue;
        };
        // Natural Earth marks codeless territories with "-99"
        if code == "-99" {
            continue;
        }
        let geometry = match serde_json::from_value::<Geometry>(feature.geometry) {
            Ok(g) => g,
            Err(err) => {
                log::debug!("skipping feature {code}: {err}");
                continue;
            }
        };
        let name = NAME_PROPERTIES
            .iter()
            .find_map(|k| feature.properties.get(k).and_then(Value::as_str))
            .map(str::to_owned);
        out.push(CountryFeature { code: code.to_owned(), name, geometry });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                [0.0, 0.0],
                [0.0, size],
                [size, size],
                [size, 0.0],
                [0.0, 0.0],
            ]],
        }
    }

    #[test]
    fn bounding_box_of_ring() {
        let g = Geometry::LineString {
            coordinates: vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0]],
        };
        let b = g.bounding_box().unwrap();
        assert_eq!((b.min_lon, b.min_lat), (0.0, 0.0));
        assert_eq!((b.max_lon, b.max_lat), (10.0, 10.0));
    }

    #[test]
    fn bounding_box_spans_all_parts_of_a_multipolygon() {
        let g = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[-5.0, -2.0], [-4.0, -2.0], [-4.0, -1.0], [-5.0, -2.0]]],
                vec![vec![[20.0, 30.0], [21.0, 30.0], [21.0, 31.0], [20.0, 30.0]]],
            ],
        };
        let b = g.bounding_box().unwrap();
        assert_eq!((b.min_lon, b.min_lat), (-5.0, -2.0));
        assert_eq!((b.max_lon, b.max_lat), (21.0, 31.0));
    }

    #[test]
    fn bounding_box_of_empty_geometry_is_none() {
        let g = Geometry::LineString { coordinates: vec![] };
        assert!(g.bounding_box().is_none());
    }

    #[test]
    fn contains_respects_holes() {
        let g = Geometry::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]],
                vec![[4.0, 4.0], [4.0, 6.0], [6.0, 6.0], [6.0, 4.0], [4.0, 4.0]],
            ],
        };
        assert!(g.contains_point(2.0, 2.0));
        assert!(!g.contains_point(5.0, 5.0)); // inside the hole
        assert!(!g.contains_point(11.0, 5.0));
    }

    #[test]
    fn fill_triangles_cover_a_convex_polygon() {
        let g = square(10.0);
        let tris = g.fill_triangles();
        assert!(!tris.is_empty());
        let area: f64 = tris.iter().map(|t| triangle_area(t)).sum();
        assert!((area - 100.0).abs() < 1e-9, "area was {area}");
    }

    #[test]
    fn fill_triangles_exclude_concave_notch() {
        // L-shape: a 10x10 square with the top-right 5x5 quadrant missing.
        let g = Geometry::Polygon {
            coordinates: vec![vec![
                [0.0, 0.0],
                [10.0, 0.0],
                [10.0, 5.0],
                [5.0, 5.0],
                [5.0, 10.0],
                [0.0, 10.0],
                [0.0, 0.0],
            ]],
        };
        let area: f64 = g.fill_triangles().iter().map(|t| triangle_area(t)).sum();
        assert!((area - 75.0).abs() < 1e-9, "area was {area}");
    }

    #[test]
    fn fill_triangles_avoid_holes() {
        let g = Geometry::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]],
                vec![[4.0, 4.0], [4.0, 6.0], [6.0, 6.0], [6.0, 4.0], [4.0, 4.0]],
            ],
        };
        for tri in g.fill_triangles() {
            let cx = (tri[0][0] + tri[1][0] + tri[2][0]) / 3.0;
            let cy = (tri[0][1] + tri[1][1] + tri[2][1]) / 3.0;
            assert!(
                !(cx > 4.0 && cx < 6.0 && cy > 4.0 && cy < 6.0),
                "triangle centred in the hole: {tri:?}"
            );
        }
    }

    #[test]
    fn parse_skips_features_without_codes() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "properties": {"ISO_A3": "LUX", "ADMIN": "Luxembourg"},
                 "geometry": {"type": "Polygon", "coordinates": [[[5.7,49.4],[6.5,49.4],[6.5,50.2],[5.7,49.4]]]}},
                {"type": "Feature",
                 "properties": {"ISO_A3": "-99"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature",
                 "properties": {"NAME": "nameless"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature",
                 "properties": {"ISO_A3": "ATA"},
                 "geometry": {"type": "GeometryCollection", "geometries": []}}
            ]
        }"#;
        let countries = parse_countries(geojson).unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].code, "LUX");
        assert_eq!(countries[0].name.as_deref(), Some("Luxembourg"));
    }

    fn triangle_area(t: &[Pos; 3]) -> f64 {
        let [a, b, c] = t;
        ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
    }
}
