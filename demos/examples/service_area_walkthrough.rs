// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two city searches, a few clicks and a suburban selection on a headless map.
//!
//! This example shows how to combine:
//! - `servicemap_session` for the map handle and cumulative searches,
//! - `servicemap_render::HeadlessEngine` standing in for a real map view,
//! - the command channel a persistence layer would drain.
//!
//! Run:
//! - `cargo run -p servicemap_demos --example service_area_walkthrough`
//! - `SERVICEMAP_LOG=debug cargo run -p servicemap_demos --example service_area_walkthrough`

use async_trait::async_trait;
use serde_json::{Map, json};
use servicemap_geo::{Feature, FeatureCollection, Geometry, LngLat};
use servicemap_render::HeadlessEngine;
use servicemap_selection::Outcome;
use servicemap_session::{
    MapConfig, SearchCriteria, SearchError, SearchMap, SearchProvider, SearchResult,
    ServiceAreaMap, zcta_layer_id,
};
use tracing::info;

/// A city whose postal codes are unit-wide strips starting at `west`.
fn city(name: &str, state: &str, west: f64, zips: &[&str]) -> SearchResult {
    let strip = |x: f64| Geometry::polygon(&[(x, 44.0), (x + 1.0, 44.0), (x + 1.0, 45.0), (x, 45.0)]);
    let features = zips
        .iter()
        .zip(0_u32..)
        .map(|(zip, i)| {
            let mut props = Map::new();
            props.insert("ZCTA5CE10".into(), json!(zip));
            Feature::new(Some(strip(west + f64::from(i))), props)
        })
        .collect();
    let east = zips.iter().fold(west, |x, _| x + 1.0);
    let boundary = Geometry::polygon(&[(west, 44.0), (east, 44.0), (east, 45.0), (west, 45.0)]);
    SearchResult {
        search_criteria: SearchCriteria::new(name, state),
        zips: zips.iter().map(|z| (*z).to_owned()).collect(),
        map: SearchMap {
            place: Feature::new(Some(boundary), Map::new()),
            included_zctas: FeatureCollection::new(features),
        },
        coverage_stats: None,
    }
}

/// Answers postal-code lookups from a fixed list of cities.
struct Directory(Vec<SearchResult>);

#[async_trait]
impl SearchProvider for Directory {
    async fn search_for_zip(&self, zip: &str) -> Result<Option<SearchResult>, SearchError> {
        Ok(self.0.iter().find(|c| c.zips.iter().any(|z| z == zip)).cloned())
    }
}

fn print_layer(map: &ServiceAreaMap<HeadlessEngine>, city_key: &str) {
    let engine = map.registry().renderer().engine();
    let layer = zcta_layer_id(city_key);
    let Some(session) = map.sessions().get(city_key) else {
        return;
    };
    for zip in &session.zip_codes {
        let colour = engine
            .find_feature(&layer, "ZCTA5CE10", zip)
            .and_then(|id| engine.paint_value(&layer, id, "fill-color"));
        println!(
            "  {zip}: {:<9} {}",
            map.selection().state(zip).as_str(),
            colour.unwrap_or_default()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    servicemap_log::init()?;

    let (mut map, mut commands) = ServiceAreaMap::new(HeadlessEngine::new(), MapConfig::default());
    map.mount("map");
    let signal = map.readiness_signal();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        signal.mark_loaded();
        signal.mark_style_loaded();
    });

    map.on_search_result(city("Minneapolis", "MN", -94.0, &["55401", "55402", "55403"]))
        .await?;
    map.on_search_result(city("Saint Paul", "MN", -91.0, &["55101", "55102"]))
        .await?;
    info!(
        layers = map.registry().renderer().engine().layer_count(),
        "two cities on the map"
    );

    // Click the first Minneapolis strip, then confirm the add.
    map.on_click(LngLat::new(-93.5, 44.5));
    while let Ok(command) = commands.try_recv() {
        println!("-> {} {}", command.action.as_str(), command.zip);
        map.resolve(command.ticket, Outcome::Confirmed);
    }

    // A code outside both cities pulls its own city in first.
    let directory = Directory(vec![city("Edina", "MN", -89.0, &["55424", "55435"])]);
    map.select_suburban_zip("55424", &directory).await?;
    map.bulk_add_city("minneapolis-mn");

    for session in map.sessions().sessions() {
        println!("{}:", session.city_key);
        print_layer(&map, &session.city_key);
    }
    Ok(())
}
