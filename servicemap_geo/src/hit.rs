// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Narrow-phase point-in-polygon hit testing.
//!
//! Rings are converted to [`kurbo::BezPath`]s in (lng, lat) space. Each ring is
//! tested on its own and holes are subtracted explicitly, so results do not
//! depend on whether the source data follows the right-hand winding rule.

use kurbo::{BezPath, Point, Shape};
use serde_json::Value;

use crate::bounds::{LngLat, LngLatBounds};
use crate::error::GeoError;
use crate::geojson::Geometry;

/// Parameters controlling precise hit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct HitParams {
    /// Tolerance in degrees. Points within the bounds inflated by this much,
    /// but outside the polygon, score as a near miss.
    pub tolerance: f64,
}

/// Score returned from a precise hit. Lower distance is a better hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitScore {
    /// Distance from the shape, 0 for interior points.
    pub distance: f64,
}

impl HitScore {
    /// An interior hit.
    pub const fn inside() -> Self {
        Self { distance: 0.0 }
    }
}

/// Shapes that can answer "does this position hit me?".
pub trait PreciseHitTest {
    /// Returns `Some` when `pt` is considered a hit.
    fn hit_test(&self, pt: LngLat, params: &HitParams) -> Option<HitScore>;
}

#[derive(Clone, Debug)]
struct Ring {
    path: BezPath,
}

impl Ring {
    fn from_value(value: &Value) -> Option<Self> {
        let positions: Vec<LngLat> = value
            .as_array()?
            .iter()
            .filter_map(LngLat::from_value)
            .collect();
        if positions.len() < 3 {
            return None;
        }
        let mut path = BezPath::new();
        path.move_to(Point::new(positions[0].lng, positions[0].lat));
        for p in &positions[1..] {
            path.line_to(Point::new(p.lng, p.lat));
        }
        path.close_path();
        Some(Self { path })
    }

    fn contains(&self, pt: Point) -> bool {
        self.path.winding(pt) != 0
    }
}

#[derive(Clone, Debug)]
struct PolygonRings {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl PolygonRings {
    fn from_value(value: &Value) -> Option<Self> {
        let mut rings = value.as_array()?.iter().filter_map(Ring::from_value);
        let exterior = rings.next()?;
        Some(Self {
            exterior,
            holes: rings.collect(),
        })
    }

    fn contains(&self, pt: Point) -> bool {
        self.exterior.contains(pt) && !self.holes.iter().any(|h| h.contains(pt))
    }
}

/// A (multi)polygon prepared for repeated hit tests.
#[derive(Clone, Debug)]
pub struct PolygonShape {
    polygons: Vec<PolygonRings>,
    bounds: LngLatBounds,
}

impl PolygonShape {
    /// Prepare a geometry for hit testing.
    ///
    /// `Polygon`, `MultiPolygon` and `GeometryCollection`s of those are
    /// supported. Rings with fewer than three readable positions are dropped.
    pub fn from_geometry(geometry: &Geometry) -> Result<Self, GeoError> {
        let mut polygons = Vec::new();
        collect_polygons(geometry, &mut polygons)?;
        if polygons.is_empty() {
            return Err(GeoError::NoCoordinates);
        }
        Ok(Self {
            polygons,
            bounds: LngLatBounds::from_geometry(geometry),
        })
    }

    /// Bounds of the source geometry.
    pub fn bounds(&self) -> LngLatBounds {
        self.bounds
    }

    /// Whether the position is inside any polygon, honoring holes.
    pub fn contains(&self, pt: LngLat) -> bool {
        if !self.bounds.contains(pt) {
            return false;
        }
        let pt = Point::new(pt.lng, pt.lat);
        self.polygons.iter().any(|p| p.contains(pt))
    }
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<PolygonRings>) -> Result<(), GeoError> {
    match geometry.kind.as_str() {
        "Polygon" => out.extend(PolygonRings::from_value(&geometry.coordinates)),
        "MultiPolygon" => {
            if let Some(items) = geometry.coordinates.as_array() {
                out.extend(items.iter().filter_map(PolygonRings::from_value));
            }
        }
        "GeometryCollection" => {
            for member in &geometry.geometries {
                // Non-areal members of a collection simply never hit.
                let _ = collect_polygons(member, out);
            }
        }
        other => return Err(GeoError::UnsupportedGeometry(other.to_owned())),
    }
    Ok(())
}

impl PreciseHitTest for PolygonShape {
    fn hit_test(&self, pt: LngLat, params: &HitParams) -> Option<HitScore> {
        let inflated = if params.tolerance > 0.0 {
            self.bounds.inflate(params.tolerance)
        } else {
            self.bounds
        };
        if !inflated.contains(pt) {
            return None;
        }
        if self.contains(pt) {
            Some(HitScore::inside())
        } else if params.tolerance > 0.0 {
            Some(HitScore {
                distance: params.tolerance,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
        json!([[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]])
    }

    #[test]
    fn polygon_with_hole() {
        let g = Geometry::new(
            "Polygon",
            json!([square(0.0, 0.0, 10.0, 10.0), square(4.0, 4.0, 6.0, 6.0)]),
        );
        let shape = PolygonShape::from_geometry(&g).unwrap();
        assert!(shape.contains(LngLat::new(1.0, 1.0)));
        assert!(!shape.contains(LngLat::new(5.0, 5.0)), "inside the hole");
        assert!(!shape.contains(LngLat::new(11.0, 5.0)));
    }

    #[test]
    fn hole_is_subtracted_regardless_of_winding() {
        // Both rings wound the same way.
        let hole = json!([[4.0, 4.0], [4.0, 6.0], [6.0, 6.0], [6.0, 4.0], [4.0, 4.0]]);
        let g = Geometry::new("Polygon", json!([square(0.0, 0.0, 10.0, 10.0), hole]));
        let shape = PolygonShape::from_geometry(&g).unwrap();
        assert!(!shape.contains(LngLat::new(5.0, 5.0)));
    }

    #[test]
    fn multipolygon_parts() {
        let g = Geometry::new(
            "MultiPolygon",
            json!([[square(0.0, 0.0, 1.0, 1.0)], [square(5.0, 5.0, 6.0, 6.0)]]),
        );
        let shape = PolygonShape::from_geometry(&g).unwrap();
        assert!(shape.contains(LngLat::new(0.5, 0.5)));
        assert!(shape.contains(LngLat::new(5.5, 5.5)));
        assert!(!shape.contains(LngLat::new(3.0, 3.0)));
    }

    #[test]
    fn points_are_not_areal() {
        let g = Geometry::new("Point", json!([1.0, 2.0]));
        assert!(matches!(
            PolygonShape::from_geometry(&g),
            Err(GeoError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn tolerance_scores_near_misses() {
        let g = Geometry::new("Polygon", json!([square(0.0, 0.0, 1.0, 1.0)]));
        let shape = PolygonShape::from_geometry(&g).unwrap();
        let near = LngLat::new(1.05, 0.5);
        assert!(shape.hit_test(near, &HitParams::default()).is_none());
        let score = shape
            .hit_test(near, &HitParams { tolerance: 0.1 })
            .expect("expected tolerant hit");
        assert!(score.distance > 0.0);
    }
}
