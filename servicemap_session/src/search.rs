// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Search input and the sessions built from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use servicemap_geo::{Feature, FeatureCollection, normalize_zip};

use crate::error::SearchError;

/// City and state a search was made for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// City name.
    pub city: String,
    /// State abbreviation.
    pub state: String,
}

impl SearchCriteria {
    /// Criteria for one city.
    pub fn new(city: &str, state: &str) -> Self {
        Self {
            city: city.to_owned(),
            state: state.to_owned(),
        }
    }

    /// The session key, also used as the search id in layer ids.
    pub fn city_key(&self) -> String {
        city_key(&self.city, &self.state)
    }
}

/// `"{city}-{state}"`, lower-cased, whitespace runs replaced by `-`.
///
/// ```
/// assert_eq!(servicemap_session::city_key("Saint  Paul", "MN"), "saint-paul-mn");
/// ```
pub fn city_key(city: &str, state: &str) -> String {
    format!("{city}-{state}")
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Map geometry returned with a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMap {
    /// The city's municipal boundary.
    pub place: Feature,
    /// Postal-code polygons inside the city.
    #[serde(default)]
    pub included_zctas: FeatureCollection,
}

/// One search result as delivered by the search service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// What was searched for.
    pub search_criteria: SearchCriteria,
    /// Postal codes in the city.
    #[serde(default)]
    pub zips: Vec<String>,
    /// Geometry to draw.
    pub map: SearchMap,
    /// Opaque coverage summary, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_stats: Option<Value>,
}

impl SearchResult {
    /// Every postal code the result mentions, from `zips` and the polygons.
    pub fn zip_codes(&self) -> Vec<String> {
        let mut codes = self.zips.clone();
        for feature in &self.map.included_zctas.features {
            if let Some(zip) = normalize_zip(&feature.properties)
                && !codes.contains(&zip)
            {
                codes.push(zip);
            }
        }
        codes
    }
}

/// A city that has been drawn on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSession {
    /// Session key; see [`city_key`].
    pub city_key: String,
    /// What was searched for.
    pub criteria: SearchCriteria,
    /// Boundary geometry.
    pub place: Feature,
    /// Postal-code polygons as drawn.
    pub zcta_features: FeatureCollection,
    /// Postal codes in the city.
    pub zip_codes: Vec<String>,
}

impl SearchSession {
    /// Id of the boundary layer.
    pub fn boundary_layer_id(&self) -> String {
        boundary_layer_id(&self.city_key)
    }

    /// Id of the postal-code layer.
    pub fn zcta_layer_id(&self) -> String {
        zcta_layer_id(&self.city_key)
    }
}

/// Id of the boundary layer for a city key.
pub fn boundary_layer_id(city_key: &str) -> String {
    format!("place-boundary-{city_key}")
}

/// Id of the postal-code layer for a city key.
pub fn zcta_layer_id(city_key: &str) -> String {
    format!("zcta-polygons-{city_key}")
}

/// Looks up the city a postal code belongs to.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for the city containing `zip`. `Ok(None)` if there is none.
    async fn search_for_zip(&self, zip: &str) -> Result<Option<SearchResult>, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_key_normalizes_case_and_spaces() {
        assert_eq!(city_key("Minneapolis", "MN"), "minneapolis-mn");
        assert_eq!(city_key("Eden Prairie", "MN"), "eden-prairie-mn");
        assert_eq!(
            SearchCriteria::new("Saint\tPaul", "mn").city_key(),
            "saint-paul-mn"
        );
    }

    #[test]
    fn parses_search_service_payload() {
        let json = r#"{
            "searchCriteria": { "city": "Minneapolis", "state": "MN" },
            "zips": ["55401"],
            "map": {
                "place": { "type": "Feature", "properties": null, "geometry": null },
                "includedZctas": {
                    "type": "FeatureCollection",
                    "features": [
                        { "type": "Feature", "properties": { "ZCTA5CE10": "55402" }, "geometry": null },
                        { "type": "Feature", "properties": { "ZCTA5CE10": "55401" }, "geometry": null }
                    ]
                }
            },
            "coverageStats": { "total": 2 }
        }"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.search_criteria.city_key(), "minneapolis-mn");
        assert_eq!(result.zip_codes(), ["55401", "55402"]);
        assert!(result.coverage_stats.is_some());
    }

    #[test]
    fn layer_ids_are_namespaced() {
        assert_eq!(boundary_layer_id("edina-mn"), "place-boundary-edina-mn");
        assert_eq!(zcta_layer_id("edina-mn"), "zcta-polygons-edina-mn");
    }
}
