// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixtures shared by the session tests.

use serde_json::{Map, json};
use servicemap_geo::{Feature, FeatureCollection, Geometry, LngLat};
use servicemap_render::HeadlessEngine;
use servicemap_selection::ZipCommand;
use tokio::sync::mpsc;

use crate::config::MapConfig;
use crate::map::ServiceAreaMap;
use crate::search::{SearchCriteria, SearchMap, SearchResult};

/// Latitude band every fixture city sits in.
const SOUTH: f64 = 44.0;
const NORTH: f64 = 45.0;

fn rect(x0: f64, x1: f64) -> Geometry {
    Geometry::polygon(&[(x0, SOUTH), (x1, SOUTH), (x1, NORTH), (x0, NORTH)])
}

/// A city whose postal codes are unit-wide strips starting at `west`.
pub(crate) fn city(name: &str, state: &str, west: f64, zips: &[&str]) -> SearchResult {
    let mut features = Vec::new();
    let mut east = west;
    for zip in zips {
        let mut props = Map::new();
        props.insert("ZCTA5CE10".into(), json!(zip));
        features.push(Feature::new(Some(rect(east, east + 1.0)), props));
        east += 1.0;
    }
    let mut place_props = Map::new();
    place_props.insert("NAME".into(), json!(name));
    SearchResult {
        search_criteria: SearchCriteria::new(name, state),
        zips: zips.iter().map(|z| (*z).to_owned()).collect(),
        map: SearchMap {
            place: Feature::new(Some(rect(west, east)), place_props),
            included_zctas: FeatureCollection::new(features),
        },
        coverage_stats: None,
    }
}

/// Minneapolis, MN with 55401..55403 at lng -94..-91.
pub(crate) fn minneapolis() -> SearchResult {
    city("Minneapolis", "MN", -94.0, &["55401", "55402", "55403"])
}

/// Edina, MN with 55424 and 55435 at lng -90..-88.
pub(crate) fn edina() -> SearchResult {
    city("Edina", "MN", -90.0, &["55424", "55435"])
}

/// A point inside the strip of the `index`th postal code of a city at `west`.
pub(crate) fn inside(west: f64, index: u32) -> LngLat {
    LngLat::new(west + f64::from(index) + 0.5, (SOUTH + NORTH) / 2.0)
}

/// A mounted map whose readiness has not been reported.
pub(crate) fn mounted() -> (ServiceAreaMap<HeadlessEngine>, mpsc::UnboundedReceiver<ZipCommand>) {
    servicemap_log::test();
    let (mut map, rx) = ServiceAreaMap::new(HeadlessEngine::new(), MapConfig::default());
    assert!(map.mount("map"), "first mount creates the map");
    (map, rx)
}

/// A mounted map that is ready for layers.
pub(crate) fn ready() -> (ServiceAreaMap<HeadlessEngine>, mpsc::UnboundedReceiver<ZipCommand>) {
    let (map, rx) = mounted();
    let signal = map.readiness_signal();
    signal.mark_loaded();
    signal.mark_style_loaded();
    (map, rx)
}
