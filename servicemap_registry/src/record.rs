// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use servicemap_geo::GeoJson;
use servicemap_render::{LayerPresence, StyleConfig};

/// What a registered layer shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// A searched city's municipal boundary.
    Boundary,
    /// Postal-code polygons that can be selected.
    Zcta,
    /// The existing service-area overlay.
    ServiceArea,
}

impl LayerKind {
    /// Lower-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boundary => "boundary",
            Self::Zcta => "zcta",
            Self::ServiceArea => "service-area",
        }
    }
}

/// The registry's ledger entry for one logical layer.
///
/// When `added` holds, the source exists and the fill and stroke layers
/// exist together.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRecord {
    /// Layer id; also the source id and the fill layer id.
    pub id: String,
    /// What the layer shows.
    pub kind: LayerKind,
    /// The source and both sub-layers were created and not since removed.
    pub added: bool,
    /// Last visibility applied.
    pub visible: bool,
    /// What the renderer last reported as present.
    pub presence: LayerPresence,
    /// Data last pushed to the renderer.
    pub data: GeoJson,
    /// Paint the layer was created with.
    pub style: StyleConfig,
}

impl LayerRecord {
    /// The `{id}` source exists.
    pub fn source_exists(&self) -> bool {
        self.presence.contains(LayerPresence::SOURCE)
    }

    /// The `{id}` fill layer exists.
    pub fn fill_layer_exists(&self) -> bool {
        self.presence.contains(LayerPresence::FILL)
    }

    /// The `{id}-stroke` layer exists.
    pub fn stroke_layer_exists(&self) -> bool {
        self.presence.contains(LayerPresence::STROKE)
    }
}
