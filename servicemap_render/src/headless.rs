// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`MapEngine`].
//!
//! [`HeadlessEngine`] keeps sources, ordered layers, feature state, the camera
//! and the cursor in memory. Point queries go through a grid broad phase and
//! precise polygon tests, so hit testing behaves like a real map at any zoom.
//! Paint expressions are evaluated on demand, which lets tests observe the
//! colour a feature would be drawn with.
//!
//! Failures can be injected per operation through [`Faults`]; the handle is
//! shared, so it keeps working after the engine has been moved into a renderer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use hashbrown::HashMap;
use serde_json::{Map, Value};
use servicemap_geo::{
    Feature, FeatureIndex, GeoJson, HitParams, LngLat, LngLatBounds, PolygonShape, PreciseHitTest,
};

use crate::engine::{
    Cursor, FeatureId, FitOptions, LayerSpec, LayerType, MapEngine, MapOptions, RenderedFeature,
};
use crate::error::EngineError;
use crate::expression::EvalContext;

/// Engine operations that can be counted and failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// [`MapEngine::create`].
    Create,
    /// [`MapEngine::add_source`].
    AddSource,
    /// [`MapEngine::set_source_data`].
    SetSourceData,
    /// [`MapEngine::remove_source`].
    RemoveSource,
    /// [`MapEngine::add_layer`].
    AddLayer,
    /// [`MapEngine::remove_layer`].
    RemoveLayer,
    /// [`MapEngine::set_layer_visibility`].
    SetVisibility,
    /// [`MapEngine::set_feature_state`].
    SetFeatureState,
    /// [`MapEngine::query_rendered_features`].
    Query,
    /// [`MapEngine::jump_to`].
    JumpTo,
    /// [`MapEngine::fit_bounds`].
    FitBounds,
}

impl EngineOp {
    fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::AddSource => "add_source",
            Self::SetSourceData => "set_source_data",
            Self::RemoveSource => "remove_source",
            Self::AddLayer => "add_layer",
            Self::RemoveLayer => "remove_layer",
            Self::SetVisibility => "set_layer_visibility",
            Self::SetFeatureState => "set_feature_state",
            Self::Query => "query_rendered_features",
            Self::JumpTo => "jump_to",
            Self::FitBounds => "fit_bounds",
        }
    }
}

#[derive(Clone, Debug)]
struct Fault {
    op: EngineOp,
    target: Option<String>,
    once: bool,
}

/// Shared handle for injecting engine failures.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    inner: Arc<Mutex<Vec<Fault>>>,
}

impl Faults {
    fn push(&self, op: EngineOp, target: Option<&str>, once: bool) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Fault {
                op,
                target: target.map(str::to_owned),
                once,
            });
    }

    /// Fail every call of `op` until cleared.
    pub fn fail(&self, op: EngineOp) {
        self.push(op, None, false);
    }

    /// Fail every call of `op` on the source or layer `target` until cleared.
    pub fn fail_for(&self, op: EngineOp, target: &str) {
        self.push(op, Some(target), false);
    }

    /// Fail the next call of `op`.
    pub fn fail_once(&self, op: EngineOp) {
        self.push(op, None, true);
    }

    /// Fail the next call of `op` on `target`.
    pub fn fail_once_for(&self, op: EngineOp, target: &str) {
        self.push(op, Some(target), true);
    }

    /// Remove every injected failure.
    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn trip(&self, op: EngineOp, target: &str) -> Result<(), EngineError> {
        let mut faults = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let hit = faults
            .iter()
            .position(|f| f.op == op && f.target.as_deref().is_none_or(|t| t == target));
        match hit {
            Some(i) => {
                if faults[i].once {
                    faults.remove(i);
                }
                Err(EngineError::Rejected {
                    op: op.name(),
                    reason: format!("injected failure on `{target}`"),
                })
            }
            None => Ok(()),
        }
    }
}

/// Camera position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Centre.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
    /// Bounds of the last fit, if the last move was a fit.
    pub fitted: Option<LngLatBounds>,
}

#[derive(Debug)]
struct Source {
    data: GeoJson,
    features: Vec<Feature>,
    shapes: Vec<Option<PolygonShape>>,
    index: FeatureIndex,
    state: BTreeMap<u64, Map<String, Value>>,
}

impl Source {
    fn new(data: &GeoJson) -> Self {
        let mut source = Self {
            data: data.clone(),
            features: Vec::new(),
            shapes: Vec::new(),
            index: FeatureIndex::default(),
            state: BTreeMap::new(),
        };
        source.load(data);
        source
    }

    fn load(&mut self, data: &GeoJson) {
        self.data = data.clone();
        self.features = data.features().cloned().collect();
        self.index.clear();
        self.shapes = self
            .features
            .iter()
            .map(|f| {
                f.geometry
                    .as_ref()
                    .and_then(|g| PolygonShape::from_geometry(g).ok())
            })
            .collect();
        for (slot, shape) in self.shapes.iter().enumerate() {
            if let Some(shape) = shape {
                self.index.insert(slot, shape.bounds());
            }
        }
    }
}

/// In-memory map engine.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    created: bool,
    options: Option<MapOptions>,
    sources: HashMap<String, Source>,
    layers: Vec<LayerSpec>,
    camera: Option<Camera>,
    cursor: Cursor,
    calls: HashMap<EngineOp, usize>,
    faults: Faults,
}

impl HeadlessEngine {
    /// An engine that has not been created yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The failure injection handle.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// How many times `op` was attempted, including failed attempts.
    pub fn call_count(&self, op: EngineOp) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    /// Options of the live map.
    pub fn options(&self) -> Option<&MapOptions> {
        self.options.as_ref()
    }

    /// Number of sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer ids in draw order, bottom first.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    /// A layer's spec as currently applied.
    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Current data of a source.
    pub fn source_data(&self, id: &str) -> Option<&GeoJson> {
        self.sources.get(id).map(|s| &s.data)
    }

    /// Feature state of one feature.
    pub fn feature_state(&self, source: &str, feature: FeatureId) -> Option<&Map<String, Value>> {
        self.sources.get(source)?.state.get(&feature.0)
    }

    /// Camera, or the default US view if the map was never created.
    pub fn camera(&self) -> Camera {
        self.camera.unwrap_or(Camera {
            center: LngLat::new(-98.5795, 39.8283),
            zoom: 4.0,
            fitted: None,
        })
    }

    /// Current canvas cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Evaluate one paint property of `layer` for one feature.
    pub fn paint_value(&self, layer: &str, feature: FeatureId, property: &str) -> Option<Value> {
        let spec = self.layer(layer)?;
        let value = spec.paint.get(property)?;
        let source = self.sources.get(&spec.source)?;
        let slot = usize::try_from(feature.0).ok()?;
        let props = &source.features.get(slot)?.properties;
        let mut ctx = EvalContext::new(props);
        if let Some(state) = source.state.get(&feature.0) {
            ctx = ctx.with_state(state);
        }
        Some(value.evaluate(&ctx))
    }

    /// Generated id of the first feature whose `key` property equals `value`.
    pub fn find_feature(&self, source: &str, key: &str, value: &str) -> Option<FeatureId> {
        let source = self.sources.get(source)?;
        let slot = source
            .features
            .iter()
            .position(|f| f.property_str(key) == Some(value))?;
        u64::try_from(slot).ok().map(FeatureId)
    }

    fn enter(&mut self, op: EngineOp, target: &str) -> Result<(), EngineError> {
        *self.calls.entry(op).or_default() += 1;
        if !self.created {
            return Err(EngineError::NotCreated);
        }
        self.faults.trip(op, target)
    }

    fn layer_index(&self, id: &str) -> Result<usize, EngineError> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| EngineError::LayerMissing(id.to_owned()))
    }
}

impl MapEngine for HeadlessEngine {
    fn create(&mut self, options: &MapOptions) -> Result<(), EngineError> {
        *self.calls.entry(EngineOp::Create).or_default() += 1;
        if self.created {
            return Err(EngineError::Rejected {
                op: EngineOp::Create.name(),
                reason: "already created".to_owned(),
            });
        }
        self.faults.trip(EngineOp::Create, &options.container)?;
        self.created = true;
        self.camera = Some(Camera {
            center: options.center,
            zoom: options.zoom,
            fitted: None,
        });
        self.options = Some(options.clone());
        Ok(())
    }

    fn destroy(&mut self) {
        self.created = false;
        self.sources.clear();
        self.layers.clear();
        self.cursor = Cursor::Default;
    }

    fn add_source(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError> {
        self.enter(EngineOp::AddSource, id)?;
        if self.sources.contains_key(id) {
            return Err(EngineError::SourceExists(id.to_owned()));
        }
        self.sources.insert(id.to_owned(), Source::new(data));
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError> {
        self.enter(EngineOp::SetSourceData, id)?;
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| EngineError::SourceMissing(id.to_owned()))?;
        source.load(data);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        self.enter(EngineOp::RemoveSource, id)?;
        if let Some(user) = self.layers.iter().find(|l| l.source == id) {
            return Err(EngineError::Rejected {
                op: EngineOp::RemoveSource.name(),
                reason: format!("source `{id}` is used by layer `{}`", user.id),
            });
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::SourceMissing(id.to_owned()))
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_layer(&mut self, spec: &LayerSpec) -> Result<(), EngineError> {
        self.enter(EngineOp::AddLayer, &spec.id)?;
        if self.has_layer(&spec.id) {
            return Err(EngineError::LayerExists(spec.id.clone()));
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(EngineError::SourceMissing(spec.source.clone()));
        }
        self.layers.push(spec.clone());
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        self.enter(EngineOp::RemoveLayer, id)?;
        let i = self.layer_index(id)?;
        self.layers.remove(i);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn layer_visibility(&self, id: &str) -> Option<bool> {
        self.layer(id).map(|l| l.visible)
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<(), EngineError> {
        self.enter(EngineOp::SetVisibility, id)?;
        let i = self.layer_index(id)?;
        self.layers[i].visible = visible;
        Ok(())
    }

    fn set_feature_state(
        &mut self,
        source: &str,
        feature: FeatureId,
        state: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        self.enter(EngineOp::SetFeatureState, source)?;
        let entry = self
            .sources
            .get_mut(source)
            .ok_or_else(|| EngineError::SourceMissing(source.to_owned()))?;
        let in_range = usize::try_from(feature.0).is_ok_and(|slot| slot < entry.features.len());
        if !in_range {
            return Err(EngineError::FeatureMissing {
                source_id: source.to_owned(),
                feature: feature.0,
            });
        }
        let slot = entry.state.entry(feature.0).or_default();
        for (k, v) in state {
            slot.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    fn query_rendered_features(
        &self,
        point: LngLat,
        layers: &[&str],
    ) -> Result<Vec<RenderedFeature>, EngineError> {
        if !self.created {
            return Err(EngineError::NotCreated);
        }
        self.faults.trip(EngineOp::Query, "")?;
        if let Some(missing) = layers.iter().find(|id| !self.has_layer(id)) {
            return Err(EngineError::LayerMissing((*missing).to_owned()));
        }
        let params = HitParams::default();
        let mut out = Vec::new();
        for layer in self.layers.iter().rev() {
            if layer.kind != LayerType::Fill || !layer.visible || !layers.contains(&layer.id.as_str())
            {
                continue;
            }
            let Some(source) = self.sources.get(&layer.source) else {
                continue;
            };
            // Later features in a source draw over earlier ones.
            for slot in source.index.query_point(point).into_iter().rev() {
                let hit = source.shapes[slot]
                    .as_ref()
                    .is_some_and(|s| s.hit_test(point, &params).is_some());
                let Ok(id) = u64::try_from(slot) else {
                    continue;
                };
                if hit {
                    out.push(RenderedFeature {
                        layer_id: layer.id.clone(),
                        source: layer.source.clone(),
                        id: FeatureId(id),
                        properties: source.features[slot].properties.clone(),
                    });
                }
            }
        }
        Ok(out)
    }

    fn jump_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError> {
        self.enter(EngineOp::JumpTo, "")?;
        self.camera = Some(Camera {
            center,
            zoom,
            fitted: None,
        });
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: LngLatBounds, options: &FitOptions) -> Result<(), EngineError> {
        self.enter(EngineOp::FitBounds, "")?;
        let center = bounds.center().ok_or_else(|| EngineError::Rejected {
            op: EngineOp::FitBounds.name(),
            reason: "empty bounds".to_owned(),
        })?;
        let span = (bounds.max_lng - bounds.min_lng).max(bounds.max_lat - bounds.min_lat);
        let zoom = if span > 0.0 {
            (360.0 / span).log2().clamp(0.0, options.max_zoom)
        } else {
            options.max_zoom
        };
        self.camera = Some(Camera {
            center,
            zoom,
            fitted: Some(bounds),
        });
        Ok(())
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }
}
