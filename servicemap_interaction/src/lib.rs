// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Interaction: pointer events to selection transitions.
//!
//! [`InteractionLayer`] hit-tests clicks against every postal-code layer the
//! registry currently knows about, resolves the top-most feature's postal
//! code and toggles it. Hover keeps a single pointer across all bound layers,
//! so at most one feature is ever highlighted, and the cursor tells the user
//! whether the hovered code can be acted on.

use std::collections::BTreeSet;

use servicemap_geo::{LngLat, normalize_zip};
use servicemap_registry::{LayerKind, LayerRegistry};
use servicemap_render::{Cursor, FeatureId, MapEngine};
use servicemap_selection::{StatusChange, ZipSelectionController};
use tracing::debug;

/// The feature currently highlighted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverState {
    /// Layer (and source) the feature belongs to.
    pub layer_id: String,
    /// Generated feature id.
    pub feature: FeatureId,
}

/// Click and hover handling over postal-code layers.
#[derive(Clone, Debug, Default)]
pub struct InteractionLayer {
    bound: BTreeSet<String>,
    hover: Option<HoverState>,
}

impl InteractionLayer {
    /// No layers bound, nothing hovered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `layer_id` take part in hover.
    pub fn bind(&mut self, layer_id: &str) {
        if self.bound.insert(layer_id.to_owned()) {
            debug!(layer = layer_id, "hover bound");
        }
    }

    /// Stop `layer_id` taking part in hover.
    pub fn unbind(&mut self, layer_id: &str) {
        self.bound.remove(layer_id);
        if self.hover.as_ref().is_some_and(|h| h.layer_id == layer_id) {
            self.hover = None;
        }
    }

    /// Forget every binding and the hover pointer without touching the map.
    pub fn reset(&mut self) {
        self.bound.clear();
        self.hover = None;
    }

    /// Whether `layer_id` is bound.
    pub fn is_bound(&self, layer_id: &str) -> bool {
        self.bound.contains(layer_id)
    }

    /// The highlighted feature.
    pub fn hovered(&self) -> Option<&HoverState> {
        self.hover.as_ref()
    }

    /// Toggle the postal code under `point`.
    ///
    /// Only `available` and `added` codes react; clicks on codes that are in
    /// flight or failed are ignored.
    pub fn on_click<E: MapEngine>(
        &self,
        point: LngLat,
        registry: &LayerRegistry<E>,
        controller: &mut ZipSelectionController,
    ) -> Option<StatusChange> {
        let hits = registry.query(point, LayerKind::Zcta);
        let top = hits.first()?;
        let Some(zip) = normalize_zip(&top.properties) else {
            debug!(layer = %top.layer_id, "click on feature without a postal code");
            return None;
        };
        let state = controller.state(&zip);
        let Some(action) = state.click_action() else {
            debug!(zip = zip.as_str(), state = state.as_str(), "click ignored");
            return None;
        };
        controller.toggle(&zip, action)
    }

    /// Move the hover pointer to the feature under `point`.
    ///
    /// Returns the hovered postal code, if any.
    pub fn on_hover<E: MapEngine>(
        &mut self,
        point: LngLat,
        registry: &mut LayerRegistry<E>,
        controller: &ZipSelectionController,
    ) -> Option<String> {
        let hit = registry
            .query(point, LayerKind::Zcta)
            .into_iter()
            .find(|h| self.bound.contains(&h.layer_id));
        let Some(hit) = hit else {
            self.on_leave(registry);
            return None;
        };

        let next = HoverState {
            layer_id: hit.layer_id,
            feature: hit.id,
        };
        if self.hover.as_ref() != Some(&next) {
            if let Some(prev) = self.hover.take() {
                registry.set_hover(&prev.layer_id, prev.feature, false);
            }
            registry.set_hover(&next.layer_id, next.feature, true);
            self.hover = Some(next);
        }

        let zip = normalize_zip(&hit.properties);
        let cursor = match &zip {
            Some(zip) if controller.state(zip).is_actionable() => Cursor::Pointer,
            Some(_) => Cursor::NotAllowed,
            None => Cursor::Default,
        };
        registry.set_cursor(cursor);
        zip
    }

    /// Clear the hover pointer and restore the cursor.
    pub fn on_leave<E: MapEngine>(&mut self, registry: &mut LayerRegistry<E>) {
        if let Some(prev) = self.hover.take() {
            registry.set_hover(&prev.layer_id, prev.feature, false);
        }
        registry.set_cursor(Cursor::Default);
    }
}
