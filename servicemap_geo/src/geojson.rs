// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A permissive GeoJSON model.
//!
//! Only the parts of RFC 7946 the map needs are modelled. Coordinates stay as
//! raw [`serde_json::Value`] so that deeply nested, mixed or partially broken
//! geometry still loads; consumers skip what they cannot read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Either a single feature or a feature collection.
///
/// Search results carry the place boundary as a [`Feature`] and the postal-code
/// polygons as a [`FeatureCollection`]; renderer sources accept both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJson {
    /// A `FeatureCollection` object.
    FeatureCollection(FeatureCollection),
    /// A `Feature` object.
    Feature(Feature),
}

impl GeoJson {
    /// Iterate the features, in order. A bare feature yields itself.
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        let slice: &[Feature] = match self {
            Self::FeatureCollection(fc) => &fc.features,
            Self::Feature(f) => core::slice::from_ref(f),
        };
        slice.iter()
    }

    /// Iterate the features mutably, in order.
    pub fn features_mut(&mut self) -> impl Iterator<Item = &mut Feature> + '_ {
        let slice: &mut [Feature] = match self {
            Self::FeatureCollection(fc) => &mut fc.features,
            Self::Feature(f) => core::slice::from_mut(f),
        };
        slice.iter_mut()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        match self {
            Self::FeatureCollection(fc) => fc.features.len(),
            Self::Feature(_) => 1,
        }
    }

    /// True for an empty collection.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Feature> for GeoJson {
    fn from(f: Feature) -> Self {
        Self::Feature(f)
    }
}

impl From<FeatureCollection> for GeoJson {
    fn from(fc: FeatureCollection) -> Self {
        Self::FeatureCollection(fc)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureCollectionTag {
    #[default]
    FeatureCollection,
}

/// A GeoJSON `Feature`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    tag: FeatureTag,
    /// Optional feature id as sent by the server. Renderers generate their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Geometry; `null` is allowed and simply never hits or contributes bounds.
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Free-form properties. `null` deserializes as an empty map.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature from geometry and properties.
    pub fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            tag: FeatureTag::Feature,
            id: None,
            geometry,
            properties,
        }
    }

    /// String value of a property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Set (or replace) a property.
    pub fn set_property(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_owned(), value.into());
    }
}

/// A GeoJSON `FeatureCollection`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    tag: FeatureCollectionTag,
    /// Member features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: FeatureCollectionTag::FeatureCollection,
            features,
        }
    }

    /// True when the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A GeoJSON geometry object.
///
/// `kind` is kept as the raw type string (`"Polygon"`, `"MultiPolygon"`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// The geometry `type` member.
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw, possibly nested coordinate arrays.
    #[serde(default)]
    pub coordinates: Value,
    /// Members of a `GeometryCollection`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometries: Vec<Self>,
}

impl Geometry {
    /// Create a geometry of the given kind from raw coordinates.
    pub fn new(kind: &str, coordinates: Value) -> Self {
        Self {
            kind: kind.to_owned(),
            coordinates,
            geometries: Vec::new(),
        }
    }

    /// A closed single-ring polygon from `(lng, lat)` vertices.
    ///
    /// The ring is closed automatically when the last vertex differs from the first.
    pub fn polygon(ring: &[(f64, f64)]) -> Self {
        let mut positions: Vec<Value> = ring
            .iter()
            .map(|&(lng, lat)| Value::from(vec![lng, lat]))
            .collect();
        if let (Some(first), Some(last)) = (ring.first(), ring.last())
            && first != last
        {
            positions.push(Value::from(vec![first.0, first.1]));
        }
        Self::new("Polygon", Value::Array(vec![Value::Array(positions)]))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
