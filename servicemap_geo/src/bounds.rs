// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geographic positions and an axis-aligned bounds accumulator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geojson::{GeoJson, Geometry};

/// A longitude/latitude pair in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude (x).
    pub lng: f64,
    /// Latitude (y).
    pub lat: f64,
}

impl LngLat {
    /// Create a new position.
    #[inline]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Read a position from a JSON array whose first two items are numbers.
    ///
    /// Extra items (altitude) are ignored. Non-finite numbers are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        let lng = items.first()?.as_f64()?;
        let lat = items.get(1)?.as_f64()?;
        (lng.is_finite() && lat.is_finite()).then_some(Self { lng, lat })
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

/// Axis-aligned geographic bounds.
///
/// Starts out empty and grows with [`extend`](Self::extend). An empty bounds
/// contains nothing and overlaps nothing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LngLatBounds {
    /// Western edge.
    pub min_lng: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl Default for LngLatBounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl LngLatBounds {
    /// Bounds from explicit edges.
    #[inline]
    pub const fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// An empty accumulator.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min_lng: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lng: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    /// Bounds of every position in a GeoJSON object.
    pub fn from_geojson(data: &GeoJson) -> Self {
        let mut bounds = Self::empty();
        for feature in data.features() {
            if let Some(geometry) = &feature.geometry {
                bounds.extend_geometry(geometry);
            }
        }
        bounds
    }

    /// Bounds of a single geometry.
    pub fn from_geometry(geometry: &Geometry) -> Self {
        let mut bounds = Self::empty();
        bounds.extend_geometry(geometry);
        bounds
    }

    /// True if nothing has been accumulated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_lng > self.max_lng || self.min_lat > self.max_lat
    }

    /// Grow to include a position.
    #[inline]
    pub fn extend(&mut self, p: LngLat) {
        self.min_lng = self.min_lng.min(p.lng);
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lng = self.max_lng.max(p.lng);
        self.max_lat = self.max_lat.max(p.lat);
    }

    /// Grow to include a geometry, including `GeometryCollection` members.
    pub fn extend_geometry(&mut self, geometry: &Geometry) {
        self.extend_coordinates(&geometry.coordinates);
        for member in &geometry.geometries {
            self.extend_geometry(member);
        }
    }

    /// Walk nested coordinate arrays and grow to include every position found.
    ///
    /// An array whose first two items are numbers is a position. Any other array
    /// is descended into. Everything else is skipped, so mixed or malformed
    /// nesting never fails.
    pub fn extend_coordinates(&mut self, coords: &Value) {
        if let Some(p) = LngLat::from_value(coords) {
            self.extend(p);
        } else if let Value::Array(items) = coords {
            for item in items {
                self.extend_coordinates(item);
            }
        }
    }

    /// Whether the position lies inside (edges inclusive).
    #[inline]
    pub fn contains(&self, p: LngLat) -> bool {
        self.min_lng <= p.lng && p.lng <= self.max_lng && self.min_lat <= p.lat && p.lat <= self.max_lat
    }

    /// Whether two bounds overlap. Shared edges count as overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min_lng <= other.max_lng
            && self.max_lng >= other.min_lng
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// The smallest bounds enclosing both.
    #[inline]
    pub fn union(&self, other: Self) -> Self {
        Self {
            min_lng: self.min_lng.min(other.min_lng),
            min_lat: self.min_lat.min(other.min_lat),
            max_lng: self.max_lng.max(other.max_lng),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Grow every edge by `margin` degrees.
    #[inline]
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min_lng: self.min_lng - margin,
            min_lat: self.min_lat - margin,
            max_lng: self.max_lng + margin,
            max_lat: self.max_lat + margin,
        }
    }

    /// Center of the bounds, or `None` when empty.
    pub fn center(&self) -> Option<LngLat> {
        (!self.is_empty()).then(|| {
            LngLat::new(
                0.5 * (self.min_lng + self.max_lng),
                0.5 * (self.min_lat + self.max_lat),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_until_extended() {
        let mut b = LngLatBounds::empty();
        assert!(b.is_empty());
        assert_eq!(b.center(), None);
        b.extend(LngLat::new(1.0, 2.0));
        assert!(!b.is_empty());
        assert!(b.contains(LngLat::new(1.0, 2.0)));
    }

    #[test]
    fn walks_mixed_nesting_and_skips_junk() {
        let mut b = LngLatBounds::empty();
        // A point, a ring, a multipolygon-style nest and some junk leaves.
        b.extend_coordinates(&json!([
            [-93.0, 45.0],
            [[[-94.0, 44.0], [-92.5, 44.5]]],
            ["a", "b"],
            null,
            [1],
            [[["x", 3.0]], [-93.5, 46.0, 120.0]]
        ]));
        assert_eq!(b, LngLatBounds::new(-94.0, 44.0, -92.5, 46.0));
    }

    #[test]
    fn nothing_numeric_stays_empty() {
        let mut b = LngLatBounds::empty();
        b.extend_coordinates(&json!([["x"], {"lng": 1}, "nope"]));
        assert!(b.is_empty());
    }

    #[test]
    fn overlap_and_union() {
        let a = LngLatBounds::new(0.0, 0.0, 10.0, 10.0);
        let b = LngLatBounds::new(10.0, 0.0, 20.0, 10.0);
        let c = LngLatBounds::new(11.0, 0.0, 20.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.union(c), LngLatBounds::new(0.0, 0.0, 20.0, 10.0));
        assert!(!LngLatBounds::empty().overlaps(&a));
    }
}
