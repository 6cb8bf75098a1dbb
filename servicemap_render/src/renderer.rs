// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bitflags::bitflags;
use serde_json::{Map, Value};
use servicemap_geo::{GeoJson, LngLat, LngLatBounds};
use tracing::{debug, info, warn};

use crate::engine::{Cursor, FeatureId, FitOptions, MapEngine, MapOptions, RenderedFeature};
use crate::readiness::{Readiness, ReadinessSignal};
use crate::style::{StyleConfig, stroke_layer_id};

bitflags! {
    /// Which parts of a polygon layer exist in the engine.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayerPresence: u8 {
        /// The `{id}` source.
        const SOURCE = 1;
        /// The `{id}` fill layer.
        const FILL = 1 << 1;
        /// The `{id}-stroke` line layer.
        const STROKE = 1 << 2;
    }
}

impl LayerPresence {
    /// Nothing is left behind in the engine.
    pub fn is_clean(self) -> bool {
        self.is_empty()
    }
}

/// Owns the map engine and its readiness lifecycle.
///
/// Every primitive catches engine errors, logs them and reports a `bool`.
/// Mutating primitives are rejected until both readiness phases have been
/// reported, and forever after [`MapRenderer::teardown`].
#[derive(Debug)]
pub struct MapRenderer<E> {
    engine: E,
    created: bool,
    signal: ReadinessSignal,
}

impl<E: MapEngine> MapRenderer<E> {
    /// Wrap an engine that has not been created yet.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            created: false,
            signal: ReadinessSignal::new(),
        }
    }

    /// Create the engine. Only the first successful call does anything.
    pub fn init(&mut self, options: &MapOptions) -> bool {
        if self.signal.current().torn_down {
            warn!(container = %options.container, "init rejected: map was torn down");
            return false;
        }
        if self.created {
            debug!(container = %options.container, "init ignored: map already created");
            return false;
        }
        match self.engine.create(options) {
            Ok(()) => {
                self.created = true;
                info!(container = %options.container, zoom = options.zoom, "map created");
                true
            }
            Err(err) => {
                warn!(container = %options.container, %err, "map creation failed");
                false
            }
        }
    }

    /// Whether [`MapRenderer::init`] has succeeded and the map is not torn down.
    pub fn is_initialized(&self) -> bool {
        self.created
    }

    /// Handle for reporting and awaiting readiness.
    pub fn signal(&self) -> &ReadinessSignal {
        &self.signal
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        self.signal.current()
    }

    /// Whether sources and layers may be mutated.
    pub fn is_ready(&self) -> bool {
        self.created && self.signal.current().is_ready()
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn admit(&self, op: &'static str, id: &str) -> bool {
        if self.is_ready() {
            return true;
        }
        let readiness = self.signal.current();
        warn!(
            op,
            id,
            created = self.created,
            loaded = readiness.loaded,
            style_loaded = readiness.style_loaded,
            torn_down = readiness.torn_down,
            "rejected: map not ready"
        );
        false
    }

    fn admit_camera(&self, op: &'static str) -> bool {
        if self.created && !self.signal.current().torn_down {
            return true;
        }
        warn!(op, "rejected: map not created");
        false
    }

    /// Which parts of polygon layer `id` exist.
    pub fn presence(&self, id: &str) -> LayerPresence {
        let mut presence = LayerPresence::empty();
        if !self.created {
            return presence;
        }
        presence.set(LayerPresence::SOURCE, self.engine.has_source(id));
        presence.set(LayerPresence::FILL, self.engine.has_layer(id));
        presence.set(LayerPresence::STROKE, self.engine.has_layer(&stroke_layer_id(id)));
        presence
    }

    /// Add source `{id}` with a fill layer `{id}` and stroke layer `{id}-stroke`.
    ///
    /// The pair is never split: if the stroke cannot be added the fill and
    /// source are rolled back.
    pub fn add_polygon_layer(
        &mut self,
        id: &str,
        data: &GeoJson,
        style: &StyleConfig,
        visible: bool,
    ) -> bool {
        if !self.admit("add_polygon_layer", id) {
            return false;
        }
        if let Err(err) = self.engine.add_source(id, data) {
            warn!(id, %err, "add source failed");
            return false;
        }
        if let Err(err) = self.engine.add_layer(&style.fill_layer(id, visible)) {
            warn!(id, %err, "add fill layer failed");
            self.rollback_source(id);
            return false;
        }
        if let Err(err) = self.engine.add_layer(&style.stroke_layer(id, visible)) {
            warn!(id, %err, "add stroke layer failed, rolling back fill");
            if let Err(err) = self.engine.remove_layer(id) {
                warn!(id, %err, "fill rollback failed");
            }
            self.rollback_source(id);
            return false;
        }
        debug!(id, features = data.len(), visible, "polygon layer added");
        true
    }

    fn rollback_source(&mut self, id: &str) {
        if let Err(err) = self.engine.remove_source(id) {
            warn!(id, %err, "source rollback failed");
        }
    }

    /// Remove whatever exists of polygon layer `id`.
    ///
    /// Returns `true` only if nothing is left behind.
    pub fn remove_polygon_layer(&mut self, id: &str) -> bool {
        if !self.admit("remove_polygon_layer", id) {
            return false;
        }
        let stroke = stroke_layer_id(id);
        let mut clean = true;
        for layer in [stroke.as_str(), id] {
            if self.engine.has_layer(layer) {
                if let Err(err) = self.engine.remove_layer(layer) {
                    warn!(layer, %err, "remove layer failed");
                    clean = false;
                }
            }
        }
        if self.engine.has_source(id) {
            if let Err(err) = self.engine.remove_source(id) {
                warn!(id, %err, "remove source failed");
                clean = false;
            }
        }
        if clean {
            debug!(id, "polygon layer removed");
        }
        clean
    }

    /// Replace the data behind polygon layer `id`.
    pub fn set_layer_data(&mut self, id: &str, data: &GeoJson) -> bool {
        if !self.admit("set_layer_data", id) {
            return false;
        }
        match self.engine.set_source_data(id, data) {
            Ok(()) => {
                debug!(id, features = data.len(), "layer data updated");
                true
            }
            Err(err) => {
                warn!(id, %err, "set layer data failed");
                false
            }
        }
    }

    /// Show or hide both halves of polygon layer `id`.
    ///
    /// If the stroke cannot follow, the fill is restored.
    pub fn set_layer_visibility(&mut self, id: &str, visible: bool) -> bool {
        if !self.admit("set_layer_visibility", id) {
            return false;
        }
        let stroke = stroke_layer_id(id);
        let Some(previous) = self.engine.layer_visibility(id) else {
            warn!(id, "set visibility failed: fill layer missing");
            return false;
        };
        if let Err(err) = self.engine.set_layer_visibility(id, visible) {
            warn!(id, %err, "set fill visibility failed");
            return false;
        }
        if let Err(err) = self.engine.set_layer_visibility(&stroke, visible) {
            warn!(id, %err, "set stroke visibility failed, restoring fill");
            if let Err(err) = self.engine.set_layer_visibility(id, previous) {
                warn!(id, %err, "fill visibility restore failed");
            }
            return false;
        }
        debug!(id, visible, "layer visibility set");
        true
    }

    /// Set or clear the `hover` feature state.
    pub fn set_feature_hover_state(&mut self, source: &str, feature: FeatureId, hover: bool) -> bool {
        if !self.admit("set_feature_hover_state", source) {
            return false;
        }
        let mut state = Map::new();
        state.insert("hover".to_owned(), Value::Bool(hover));
        match self.engine.set_feature_state(source, feature, &state) {
            Ok(()) => true,
            Err(err) => {
                warn!(source, feature = feature.0, %err, "set hover state failed");
                false
            }
        }
    }

    /// Features under `point` in those of `layer_ids` that exist, top-most first.
    pub fn query_features_at(&self, point: LngLat, layer_ids: &[&str]) -> Vec<RenderedFeature> {
        if !self.admit("query_features_at", "") {
            return Vec::new();
        }
        let existing: Vec<&str> = layer_ids
            .iter()
            .copied()
            .filter(|id| self.engine.has_layer(id))
            .collect();
        if existing.is_empty() {
            return Vec::new();
        }
        match self.engine.query_rendered_features(point, &existing) {
            Ok(features) => features,
            Err(err) => {
                warn!(%err, "query rendered features failed");
                Vec::new()
            }
        }
    }

    /// Fit the camera to every position in `data`.
    ///
    /// Non-numeric leaves are skipped. With no positions at all the camera
    /// stays where it is and `false` is returned.
    pub fn fit_to_bounds(&mut self, data: &GeoJson, options: &FitOptions) -> bool {
        self.fit_to(LngLatBounds::from_geojson(data), options)
    }

    /// Fit the camera to `bounds`.
    pub fn fit_to(&mut self, bounds: LngLatBounds, options: &FitOptions) -> bool {
        if !self.admit_camera("fit_to_bounds") {
            return false;
        }
        if bounds.is_empty() {
            debug!("fit skipped: no positions");
            return false;
        }
        match self.engine.fit_bounds(bounds, options) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "fit bounds failed");
                false
            }
        }
    }

    /// Move the camera.
    pub fn jump_to(&mut self, center: LngLat, zoom: f64) -> bool {
        if !self.admit_camera("jump_to") {
            return false;
        }
        match self.engine.jump_to(center, zoom) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "jump failed");
                false
            }
        }
    }

    /// Set the canvas cursor. Ignored when the map does not exist.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        if self.created {
            self.engine.set_cursor(cursor);
        }
    }

    /// Destroy the engine. Every later primitive is rejected.
    pub fn teardown(&mut self) {
        if self.signal.current().torn_down {
            return;
        }
        if self.created {
            self.engine.destroy();
            self.created = false;
        }
        self.signal.mark_torn_down();
        info!("map torn down");
    }
}
