// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::{Deserialize, Serialize};

use crate::engine::LayerSpec;
use crate::expression::PaintValue;

/// Base map description handed to the engine at creation.
///
/// Only a raster basemap is modelled; everything drawn on top is added at
/// runtime through polygon layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapStyle {
    /// Raster tile URL templates.
    pub tiles: Vec<String>,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Attribution shown for the basemap.
    pub attribution: String,
    /// Background colour under the basemap.
    pub background_color: String,
    /// Opacity of the raster basemap.
    pub raster_opacity: f64,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            tiles: ["a", "b", "c"]
                .iter()
                .map(|s| format!("https://{s}.basemaps.cartocdn.com/light_all/{{z}}/{{x}}/{{y}}@2x.png"))
                .collect(),
            tile_size: 256,
            attribution: "© OpenStreetMap contributors, © CARTO".to_owned(),
            background_color: "#f8f9fa".to_owned(),
            raster_opacity: 0.8,
        }
    }
}

/// Paint for a polygon layer: one fill layer and one stroke layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// `fill-color`.
    pub fill_color: PaintValue,
    /// `fill-opacity`.
    pub fill_opacity: PaintValue,
    /// `line-color` of the stroke layer.
    pub stroke_color: PaintValue,
    /// `line-width` of the stroke layer.
    pub stroke_width: PaintValue,
    /// `line-opacity` of the stroke layer.
    pub stroke_opacity: PaintValue,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            fill_color: "#22c55e".into(),
            fill_opacity: 0.3.into(),
            stroke_color: "#16a34a".into(),
            stroke_width: 2.0.into(),
            stroke_opacity: 0.8.into(),
        }
    }
}

impl StyleConfig {
    /// The fill layer `{id}` over source `{id}`.
    pub fn fill_layer(&self, id: &str, visible: bool) -> LayerSpec {
        LayerSpec::fill(id, id)
            .with_paint("fill-color", self.fill_color.clone())
            .with_paint("fill-opacity", self.fill_opacity.clone())
            .with_visibility(visible)
    }

    /// The stroke layer `{id}-stroke` over source `{id}`.
    pub fn stroke_layer(&self, id: &str, visible: bool) -> LayerSpec {
        LayerSpec::line(&stroke_layer_id(id), id)
            .with_paint("line-color", self.stroke_color.clone())
            .with_paint("line-width", self.stroke_width.clone())
            .with_paint("line-opacity", self.stroke_opacity.clone())
            .with_visibility(visible)
    }
}

/// Id of the stroke layer paired with fill layer `id`.
pub fn stroke_layer_id(id: &str) -> String {
    format!("{id}-stroke")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LayerType;
    use serde_json::json;

    #[test]
    fn layer_pair_shares_the_source() {
        let style = StyleConfig::default();
        let fill = style.fill_layer("zips", true);
        let stroke = style.stroke_layer("zips", false);
        assert_eq!(fill.id, "zips");
        assert_eq!(fill.source, "zips");
        assert_eq!(fill.kind, LayerType::Fill);
        assert_eq!(stroke.id, "zips-stroke");
        assert_eq!(stroke.source, "zips");
        assert_eq!(stroke.kind, LayerType::Line);
        assert!(fill.visible && !stroke.visible);
        assert_eq!(fill.paint["fill-color"].as_json(), &json!("#22c55e"));
        assert_eq!(stroke.paint["line-width"].as_json(), &json!(2.0));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let style: StyleConfig = serde_json::from_value(json!({ "fill_color": "#000" })).unwrap();
        assert_eq!(style.fill_color, PaintValue::from("#000"));
        assert_eq!(style.stroke_color, PaintValue::from("#16a34a"));
    }

    #[test]
    fn default_basemap() {
        let style = MapStyle::default();
        assert_eq!(style.tiles.len(), 3);
        assert!(style.tiles[0].ends_with("/light_all/{z}/{x}/{y}@2x.png"));
        assert_eq!(style.tile_size, 256);
    }
}
