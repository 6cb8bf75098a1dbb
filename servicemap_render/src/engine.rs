// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render primitive boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use servicemap_geo::{GeoJson, LngLat, LngLatBounds};

use crate::error::EngineError;
use crate::expression::PaintValue;
use crate::style::MapStyle;

/// Options the engine is created with.
#[derive(Clone, Debug, PartialEq)]
pub struct MapOptions {
    /// Host element the map renders into.
    pub container: String,
    /// Basemap.
    pub style: MapStyle,
    /// Initial camera centre.
    pub center: LngLat,
    /// Initial zoom.
    pub zoom: f64,
    /// Whether pan/zoom gestures are enabled.
    pub interactive: bool,
}

/// Camera fit options.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Padding around the fitted bounds, in pixels.
    pub padding: f64,
    /// Upper zoom limit for the fit.
    pub max_zoom: f64,
    /// Animation duration in milliseconds.
    pub duration_ms: u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: 20.0,
            max_zoom: 14.0,
            duration_ms: 1000,
        }
    }
}

/// Pointer cursor shown over the map canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// Whatever the engine shows by default.
    #[default]
    Default,
    /// Over something clickable.
    Pointer,
    /// Over something that cannot be acted on right now.
    NotAllowed,
}

impl Cursor {
    /// CSS cursor keyword.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Pointer => "pointer",
            Self::NotAllowed => "not-allowed",
        }
    }
}

/// Engine layer type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerType {
    /// Filled polygons.
    Fill,
    /// Polygon outlines.
    Line,
}

/// A style layer over a source.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    /// Layer id.
    pub id: String,
    /// Source the layer draws.
    pub source: String,
    /// Layer type.
    pub kind: LayerType,
    /// Paint properties by name.
    pub paint: BTreeMap<String, PaintValue>,
    /// Initial visibility.
    pub visible: bool,
}

impl LayerSpec {
    /// A visible fill layer without paint.
    pub fn fill(id: &str, source: &str) -> Self {
        Self::new(id, source, LayerType::Fill)
    }

    /// A visible line layer without paint.
    pub fn line(id: &str, source: &str) -> Self {
        Self::new(id, source, LayerType::Line)
    }

    fn new(id: &str, source: &str, kind: LayerType) -> Self {
        Self {
            id: id.to_owned(),
            source: source.to_owned(),
            kind,
            paint: BTreeMap::new(),
            visible: true,
        }
    }

    /// Set one paint property.
    pub fn with_paint(mut self, name: &str, value: PaintValue) -> Self {
        self.paint.insert(name.to_owned(), value);
        self
    }

    /// Set the initial visibility.
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Feature id generated by the engine from feature order within a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u64);

/// A feature under a queried point.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedFeature {
    /// Layer the feature was hit through.
    pub layer_id: String,
    /// Source holding the feature.
    pub source: String,
    /// Generated feature id.
    pub id: FeatureId,
    /// Feature properties at query time.
    pub properties: Map<String, Value>,
}

/// Render primitives a map engine provides.
///
/// Sources are created with generated feature ids. Nothing outside the
/// renderer talks to an engine directly.
pub trait MapEngine {
    /// Construct the map.
    fn create(&mut self, options: &MapOptions) -> Result<(), EngineError>;

    /// Destroy the map and everything in it.
    fn destroy(&mut self);

    /// Add a GeoJSON source.
    fn add_source(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError>;

    /// Replace the data of an existing source.
    fn set_source_data(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError>;

    /// Remove a source. Layers using it must be removed first.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Whether a source exists.
    fn has_source(&self, id: &str) -> bool;

    /// Add a layer on top of all others.
    fn add_layer(&mut self, spec: &LayerSpec) -> Result<(), EngineError>;

    /// Remove a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    /// Whether a layer exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Current visibility of a layer, `None` if it does not exist.
    fn layer_visibility(&self, id: &str) -> Option<bool>;

    /// Show or hide a layer.
    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError>;

    /// Merge feature state into a feature.
    fn set_feature_state(
        &mut self,
        source: &str,
        feature: FeatureId,
        state: &Map<String, Value>,
    ) -> Result<(), EngineError>;

    /// Features under `point` in the given layers, top-most first.
    fn query_rendered_features(
        &self,
        point: LngLat,
        layers: &[&str],
    ) -> Result<Vec<RenderedFeature>, EngineError>;

    /// Move the camera without animation.
    fn jump_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError>;

    /// Fit the camera to bounds.
    fn fit_bounds(&mut self, bounds: LngLatBounds, options: &FitOptions)
    -> Result<(), EngineError>;

    /// Set the canvas cursor.
    fn set_cursor(&mut self, cursor: Cursor);
}
