// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Render: the boundary between the service-area map and a map engine.
//!
//! - [`MapEngine`]: the render primitives an engine provides. Nothing outside
//!   [`MapRenderer`] talks to an engine.
//! - [`MapRenderer`]: owns the engine and its two-phase readiness. Primitives
//!   catch engine errors, log them and return `bool`; polygon layers are always
//!   created and removed as a fill/stroke pair.
//! - [`ReadinessSignal`]: the `load` / `style.load` events as a watch channel
//!   that can be awaited instead of polled.
//! - [`PaintValue`] and [`Expression`]: data-driven paint, with an evaluator.
//! - [`HeadlessEngine`]: an in-memory engine with failure injection.
//!
//! # Example
//!
//! ```rust
//! use servicemap_geo::{Feature, FeatureCollection, GeoJson, Geometry, LngLat};
//! use servicemap_render::{
//!     HeadlessEngine, MapOptions, MapRenderer, MapStyle, StyleConfig,
//! };
//!
//! let mut renderer = MapRenderer::new(HeadlessEngine::new());
//! renderer.init(&MapOptions {
//!     container: "map".into(),
//!     style: MapStyle::default(),
//!     center: LngLat::new(-98.5795, 39.8283),
//!     zoom: 4.0,
//!     interactive: true,
//! });
//! renderer.signal().mark_loaded();
//! renderer.signal().mark_style_loaded();
//!
//! let ring = [(-93.3, 44.9), (-93.2, 44.9), (-93.2, 45.0), (-93.3, 45.0)];
//! let data: GeoJson = FeatureCollection::new(vec![Feature::new(
//!     Some(Geometry::polygon(&ring)),
//!     Default::default(),
//! )])
//! .into();
//!
//! assert!(renderer.add_polygon_layer("city", &data, &StyleConfig::default(), true));
//! let hits = renderer.query_features_at(LngLat::new(-93.25, 44.95), &["city"]);
//! assert_eq!(hits.len(), 1);
//! ```

mod engine;
mod error;
mod expression;
mod headless;
mod readiness;
mod renderer;
mod style;

pub use engine::{
    Cursor, FeatureId, FitOptions, LayerSpec, LayerType, MapEngine, MapOptions, RenderedFeature,
};
pub use error::EngineError;
pub use expression::{EvalContext, Expression, PaintValue, evaluate};
pub use headless::{Camera, EngineOp, Faults, HeadlessEngine};
pub use readiness::{Readiness, ReadinessSignal};
pub use renderer::{LayerPresence, MapRenderer};
pub use style::{MapStyle, StyleConfig, stroke_layer_id};
