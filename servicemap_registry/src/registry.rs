// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use serde_json::Value;
use servicemap_geo::{GeoJson, LngLat, LngLatBounds, normalize_zip};
use servicemap_render::{
    Cursor, FeatureId, FitOptions, LayerPresence, MapEngine, MapOptions, MapRenderer, Readiness,
    ReadinessSignal, RenderedFeature, StyleConfig,
};
use tracing::{debug, info, warn};

use crate::presets::STATUS_PROPERTY;
use crate::record::{LayerKind, LayerRecord};

/// Idempotent ledger of logical layers over a [`MapRenderer`].
///
/// The registry owns the renderer and is the only thing that mutates it, so
/// its records and the engine cannot drift apart through a side door.
#[derive(Debug)]
pub struct LayerRegistry<E> {
    renderer: MapRenderer<E>,
    records: BTreeMap<String, LayerRecord>,
}

impl<E: MapEngine> LayerRegistry<E> {
    /// Take ownership of a renderer.
    pub fn new(renderer: MapRenderer<E>) -> Self {
        Self {
            renderer,
            records: BTreeMap::new(),
        }
    }

    /// Read access to the renderer.
    pub fn renderer(&self) -> &MapRenderer<E> {
        &self.renderer
    }

    /// Create the map. See [`MapRenderer::init`].
    pub fn init(&mut self, options: &MapOptions) -> bool {
        self.renderer.init(options)
    }

    /// Readiness handle of the underlying renderer.
    pub fn signal(&self) -> &ReadinessSignal {
        self.renderer.signal()
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        self.renderer.readiness()
    }

    /// Add the layer, or update it in place if it is already added.
    ///
    /// A fresh add first clears any same-id remnants left by an earlier
    /// partial failure. If the add fails the record is kept with
    /// `added = false` so a later call repairs it.
    ///
    /// Style is fixed when the layer is created; an in-place update keeps the
    /// recorded style and ignores `style`.
    pub fn upsert(
        &mut self,
        id: &str,
        kind: LayerKind,
        data: &GeoJson,
        style: &StyleConfig,
        visible: bool,
    ) -> bool {
        if self.records.get(id).is_some_and(|r| r.added) {
            debug!(id, "upsert: already added, updating in place");
            if self.records.get(id).is_some_and(|r| r.style != *style) {
                debug!(id, "upsert: style differs from the added layer, keeping the original");
            }
            let data_ok = self.update_data(id, data);
            let visible_ok = self.set_visibility(id, visible);
            return data_ok && visible_ok;
        }
        if !self.renderer.is_ready() {
            warn!(id, kind = kind.as_str(), "upsert rejected: style not loaded");
            return false;
        }

        let stale = self.renderer.presence(id);
        if !stale.is_clean() {
            debug!(id, ?stale, "clearing stale remnants before add");
            self.renderer.remove_polygon_layer(id);
        }

        let added = self.renderer.add_polygon_layer(id, data, style, visible);
        let presence = self.renderer.presence(id);
        self.records.insert(
            id.to_owned(),
            LayerRecord {
                id: id.to_owned(),
                kind,
                added,
                visible,
                presence,
                data: data.clone(),
                style: style.clone(),
            },
        );
        if added {
            info!(id, kind = kind.as_str(), features = data.len(), "layer added");
        } else {
            warn!(id, kind = kind.as_str(), ?presence, "layer add failed, recorded as not added");
        }
        added
    }

    /// Push new data to an existing layer and keep it as the snapshot.
    pub fn update_data(&mut self, id: &str, data: &GeoJson) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            warn!(id, "update rejected: no such layer");
            return false;
        };
        if !record.source_exists() {
            warn!(id, "update rejected: source does not exist");
            return false;
        }
        if !self.renderer.set_layer_data(id, data) {
            return false;
        }
        record.data = data.clone();
        true
    }

    /// Show or hide fill and stroke together.
    pub fn set_visibility(&mut self, id: &str, visible: bool) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            warn!(id, "visibility rejected: no such layer");
            return false;
        };
        if !record.added {
            warn!(id, "visibility rejected: layer not added");
            return false;
        }
        if record.visible == visible && self.renderer.engine().layer_visibility(id) == Some(visible)
        {
            return true;
        }
        if !self.renderer.set_layer_visibility(id, visible) {
            return false;
        }
        record.visible = visible;
        true
    }

    /// Remove the layer and forget it.
    ///
    /// On partial failure the record is kept, marked not added, so a later
    /// upsert or remove finishes the job.
    pub fn remove(&mut self, id: &str) -> bool {
        let clean = if self.renderer.presence(id).is_clean() {
            true
        } else {
            self.renderer.remove_polygon_layer(id)
        };
        if clean {
            if self.records.remove(id).is_some() {
                info!(id, "layer removed");
            }
            return true;
        }
        let presence = self.renderer.presence(id);
        if let Some(record) = self.records.get_mut(id) {
            record.added = false;
            record.presence = presence;
        }
        warn!(id, ?presence, "layer remove incomplete, kept as not added");
        false
    }

    /// Remove every layer. Returns `true` if all were removed cleanly.
    pub fn clear(&mut self) -> bool {
        let ids: Vec<String> = self.records.keys().cloned().collect();
        let mut clean = true;
        for id in ids {
            clean &= self.remove(&id);
        }
        clean
    }

    /// Records, optionally only those of one kind, ordered by id.
    pub fn list(&self, kind: Option<LayerKind>) -> Vec<&LayerRecord> {
        self.records
            .values()
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .collect()
    }

    /// Ids of added layers of one kind.
    pub fn added_ids(&self, kind: LayerKind) -> Vec<&str> {
        self.records
            .values()
            .filter(|r| r.kind == kind && r.added)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// One record.
    pub fn get(&self, id: &str) -> Option<&LayerRecord> {
        self.records.get(id)
    }

    /// Set the status of `zip` in every postal-code layer that shows it.
    ///
    /// Returns the number of layers updated. Layers that do not contain the
    /// zip, or already show that status, are not touched.
    pub fn restyle_zip(&mut self, zip: &str, status: &str) -> usize {
        self.restyle(|z| (z == zip).then_some(status))
    }

    /// Re-derive the status of every postal-code feature from `status_of`.
    ///
    /// Features for which `status_of` returns `None` keep their status.
    pub fn restyle_all<'a>(&mut self, status_of: impl Fn(&str) -> Option<&'a str>) -> usize {
        self.restyle(status_of)
    }

    fn restyle<'a>(&mut self, status_of: impl Fn(&str) -> Option<&'a str>) -> usize {
        let mut updated = 0;
        for record in self.records.values_mut() {
            if record.kind != LayerKind::Zcta || !record.source_exists() {
                continue;
            }
            let mut data = record.data.clone();
            let mut changed = false;
            for feature in data.features_mut() {
                let Some(zip) = normalize_zip(&feature.properties) else {
                    continue;
                };
                let Some(status) = status_of(&zip) else {
                    continue;
                };
                if feature.property_str(STATUS_PROPERTY) != Some(status) {
                    feature.set_property(STATUS_PROPERTY, Value::from(status));
                    changed = true;
                }
            }
            if !changed {
                continue;
            }
            if self.renderer.set_layer_data(&record.id, &data) {
                record.data = data;
                updated += 1;
            }
        }
        if updated > 0 {
            debug!(layers = updated, "restyled postal-code layers");
        }
        updated
    }

    /// Set or clear hover on one feature of an added layer.
    pub fn set_hover(&mut self, id: &str, feature: FeatureId, hover: bool) -> bool {
        if !self.records.get(id).is_some_and(|r| r.added) {
            debug!(id, "hover ignored: layer not added");
            return false;
        }
        self.renderer.set_feature_hover_state(id, feature, hover)
    }

    /// Set the canvas cursor.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.renderer.set_cursor(cursor);
    }

    /// Features under `point` in the added layers of `kind`, top-most first.
    pub fn query(&self, point: LngLat, kind: LayerKind) -> Vec<RenderedFeature> {
        let ids = self.added_ids(kind);
        if ids.is_empty() {
            return Vec::new();
        }
        self.renderer.query_features_at(point, &ids)
    }

    /// Move the camera.
    pub fn jump_to(&mut self, center: LngLat, zoom: f64) -> bool {
        self.renderer.jump_to(center, zoom)
    }

    /// Fit the camera to every position in `data`.
    pub fn fit_to_bounds(&mut self, data: &GeoJson, options: &FitOptions) -> bool {
        self.renderer.fit_to_bounds(data, options)
    }

    /// Fit the camera to `bounds`.
    pub fn fit_to(&mut self, bounds: LngLatBounds, options: &FitOptions) -> bool {
        self.renderer.fit_to(bounds, options)
    }

    /// Tear down the renderer and invalidate every record.
    pub fn teardown(&mut self) {
        self.renderer.teardown();
        self.records.clear();
    }

    /// Whether every added record satisfies the fill/stroke pairing.
    pub fn is_consistent(&self) -> bool {
        self.records.values().filter(|r| r.added).all(|r| {
            r.source_exists()
                && r.fill_layer_exists() == r.stroke_layer_exists()
                && r.presence.intersects(LayerPresence::FILL | LayerPresence::STROKE)
        })
    }
}
