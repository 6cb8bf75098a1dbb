// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex-mean centroids.

use serde_json::Value;

use crate::bounds::LngLat;
use crate::error::GeoError;
use crate::geojson::{GeoJson, Geometry};

/// Mean of every vertex in `data`.
///
/// The closing vertex of polygon rings is not counted twice. This is not an
/// area centroid; it is only used to pick a camera center, where a vertex mean
/// is good enough and cheap.
///
/// Returns [`GeoError::NoCoordinates`] when no position can be read.
pub fn centroid(data: &GeoJson) -> Result<LngLat, GeoError> {
    let mut acc = Mean::default();
    for feature in data.features() {
        if let Some(geometry) = &feature.geometry {
            acc.add_geometry(geometry);
        }
    }
    acc.finish()
}

#[derive(Default)]
struct Mean {
    lng: f64,
    lat: f64,
    n: usize,
}

impl Mean {
    fn add_geometry(&mut self, geometry: &Geometry) {
        let closed = matches!(geometry.kind.as_str(), "Polygon" | "MultiPolygon");
        self.add_coordinates(&geometry.coordinates, closed);
        for member in &geometry.geometries {
            self.add_geometry(member);
        }
    }

    fn add_coordinates(&mut self, coords: &Value, closed: bool) {
        if let Some(p) = LngLat::from_value(coords) {
            self.push(p);
            return;
        }
        let Value::Array(items) = coords else {
            return;
        };
        let run: Vec<LngLat> = items.iter().filter_map(LngLat::from_value).collect();
        if run.is_empty() {
            for item in items {
                self.add_coordinates(item, closed);
            }
            return;
        }
        let take = if closed && run.len() > 1 && run.first() == run.last() {
            run.len() - 1
        } else {
            run.len()
        };
        for p in &run[..take] {
            self.push(*p);
        }
    }

    fn push(&mut self, p: LngLat) {
        self.lng += p.lng;
        self.lat += p.lat;
        self.n += 1;
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "Vertex counts are far below 2^52."
    )]
    fn finish(self) -> Result<LngLat, GeoError> {
        if self.n == 0 {
            return Err(GeoError::NoCoordinates);
        }
        let n = self.n as f64;
        Ok(LngLat::new(self.lng / n, self.lat / n))
    }
}
