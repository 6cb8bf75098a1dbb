// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Geo: the geometry layer underneath the service-area map.
//!
//! - [`GeoJson`], [`Feature`], [`FeatureCollection`] and [`Geometry`]: a permissive
//!   GeoJSON model. Coordinates are kept as raw JSON so that mixed
//!   Point/Polygon/MultiPolygon input never fails to load.
//! - [`LngLat`] and [`LngLatBounds`]: positions and a bounds accumulator that walks
//!   arbitrarily nested coordinate arrays, skipping anything that is not a position.
//! - [`centroid`]: the vertex-mean centroid used to recentre the camera on a city.
//! - [`FeatureIndex`]: a uniform-grid broad phase over feature bounds.
//! - [`PolygonShape`] and [`PreciseHitTest`]: narrow-phase point-in-polygon tests
//!   built on [`kurbo`], hole-aware and independent of ring orientation.
//! - [`normalize_zip`]: resolves a five-digit postal code from feature properties.
//!
//! # Example
//!
//! ```rust
//! use servicemap_geo::{GeoJson, LngLat, LngLatBounds};
//!
//! let place: GeoJson = serde_json::from_str(r#"{
//!     "type": "Feature",
//!     "properties": {},
//!     "geometry": {
//!         "type": "Polygon",
//!         "coordinates": [[[-93.3, 44.9], [-93.2, 44.9], [-93.2, 45.0], [-93.3, 45.0], [-93.3, 44.9]]]
//!     }
//! }"#).unwrap();
//!
//! let bounds = LngLatBounds::from_geojson(&place);
//! assert!(bounds.contains(LngLat::new(-93.25, 44.95)));
//! ```

mod bounds;
mod centroid;
mod error;
mod geojson;
mod hit;
mod index;
mod zip;

pub use bounds::{LngLat, LngLatBounds};
pub use centroid::centroid;
pub use error::GeoError;
pub use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
pub use hit::{HitParams, HitScore, PolygonShape, PreciseHitTest};
pub use index::{DEFAULT_CELL_SIZE, FeatureIndex};
pub use zip::{ZCTA_PROPERTY_KEYS, normalize_zip};
