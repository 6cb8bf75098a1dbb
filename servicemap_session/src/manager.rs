// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde_json::Value;
use servicemap_geo::{FeatureCollection, GeoJson, centroid, normalize_zip};
use servicemap_interaction::InteractionLayer;
use servicemap_registry::{
    LayerKind, LayerRegistry, STATUS_PROPERTY, boundary_style, service_area_style, zcta_style,
};
use servicemap_render::{MapEngine, ReadinessSignal};
use servicemap_selection::{StatusChange, ZipSelectionController, ZipState};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{MapConfig, ReadinessPolicy};
use crate::error::SessionError;
use crate::search::{SearchResult, SearchSession, boundary_layer_id, zcta_layer_id};

/// Id of the service-area overlay layer.
pub const SERVICE_AREA_LAYER: &str = "service-areas";

/// Feature property carrying the session key on postal-code polygons.
pub const SEARCH_ID_PROPERTY: &str = "searchId";

/// The components a session operation drives.
#[derive(Debug)]
pub struct SessionContext<'a, E> {
    /// Layer registry, and through it the renderer.
    pub registry: &'a mut LayerRegistry<E>,
    /// Selection state.
    pub selection: &'a mut ZipSelectionController,
    /// Hover bindings.
    pub interaction: &'a mut InteractionLayer,
}

/// What a search result did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The city was drawn.
    Added,
    /// The city was already on the map, or is being drawn; nothing was done.
    AlreadyPresent,
}

/// What a restore did, by city key.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Cities drawn.
    pub added: Vec<String>,
    /// Cities already on the map.
    pub skipped: Vec<String>,
    /// Cities that could not be drawn.
    pub failed: Vec<(String, SessionError)>,
}

/// A city accepted for drawing but not yet recorded.
#[derive(Debug)]
pub(crate) struct PendingCity {
    pub(crate) key: String,
    place: GeoJson,
    result: SearchResult,
}

/// Wait for both readiness phases, with bounded backoff.
///
/// Each wait is bounded by the policy's interval for that attempt; a change
/// on the signal ends the wait early.
pub async fn wait_until_ready(
    policy: &ReadinessPolicy,
    signal: &ReadinessSignal,
) -> Result<(), SessionError> {
    let mut rx = signal.subscribe();
    for attempt in 1..=policy.max_attempts {
        let current = *rx.borrow_and_update();
        if current.torn_down {
            return Err(SessionError::TornDown);
        }
        if current.is_ready() {
            return Ok(());
        }
        let interval = policy.interval(attempt);
        match timeout(interval, rx.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(SessionError::TornDown),
            Err(_) => debug!(attempt, ?interval, "map not ready yet"),
        }
    }
    let current = *rx.borrow();
    if current.is_ready() {
        Ok(())
    } else if current.torn_down {
        Err(SessionError::TornDown)
    } else {
        warn!(attempts = policy.max_attempts, "gave up waiting for the map");
        Err(SessionError::MapNotReady {
            attempts: policy.max_attempts,
        })
    }
}

/// Turns search results into map layers, one city at a time.
///
/// Sessions accumulate: a city is drawn once and never replaced, and a
/// repeated result for it is a no-op. Drawing is split into synchronous
/// steps (`begin`, `draw`, `finish`) so that callers hold no borrow while
/// waiting between them.
#[derive(Debug)]
pub struct SearchSessionManager {
    config: MapConfig,
    sessions: Vec<SearchSession>,
    in_progress: Vec<String>,
}

impl SearchSessionManager {
    /// A manager with no sessions.
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Sessions in the order they were added.
    pub fn sessions(&self) -> &[SearchSession] {
        &self.sessions
    }

    /// Whether `city_key` has been drawn.
    pub fn contains(&self, city_key: &str) -> bool {
        self.get(city_key).is_some()
    }

    /// Whether `city_key` is being drawn right now.
    pub fn is_in_progress(&self, city_key: &str) -> bool {
        self.in_progress.iter().any(|k| k == city_key)
    }

    /// One session.
    pub fn get(&self, city_key: &str) -> Option<&SearchSession> {
        self.sessions.iter().find(|s| s.city_key == city_key)
    }

    /// The session whose city contains `zip`.
    pub fn city_for_zip(&self, zip: &str) -> Option<&SearchSession> {
        self.sessions
            .iter()
            .find(|s| s.zip_codes.iter().any(|z| z == zip))
    }

    /// Claim a result for drawing. `None` if the city is drawn or in progress.
    pub(crate) fn begin(&mut self, result: SearchResult) -> Option<PendingCity> {
        let key = result.search_criteria.city_key();
        if self.contains(&key) || self.is_in_progress(&key) {
            debug!(city_key = %key, "city already on the map");
            return None;
        }
        info!(city_key = %key, zips = result.zips.len(), "adding city");
        self.in_progress.push(key.clone());
        Some(PendingCity {
            place: GeoJson::from(result.map.place.clone()),
            key,
            result,
        })
    }

    /// Release a claim after a failed draw, so a later result retries.
    pub(crate) fn abandon(&mut self, city_key: &str) {
        self.in_progress.retain(|k| k != city_key);
    }

    /// One attempt at both layers of a city, stamped with current statuses.
    ///
    /// On failure, returns the failing layer id.
    pub(crate) fn draw<E: MapEngine>(
        &self,
        ctx: &mut SessionContext<'_, E>,
        city: &PendingCity,
    ) -> Result<(), String> {
        let zctas = stamp_zctas(ctx.selection, &city.key, &city.result);
        draw_city(ctx.registry, &city.key, &city.place, &zctas)
    }

    /// Bind hover, recentre on the centroid and record the session.
    pub(crate) fn finish<E: MapEngine>(&mut self, ctx: &mut SessionContext<'_, E>, city: PendingCity) {
        let PendingCity { key, place, result } = city;
        ctx.interaction.bind(&zcta_layer_id(&key));

        match centroid(&place) {
            Ok(center) => {
                ctx.registry.jump_to(center, self.config.city_zoom);
            }
            Err(err) => debug!(city_key = %key, %err, "no centroid, camera left in place"),
        }

        self.abandon(&key);
        self.sessions.push(SearchSession {
            city_key: key.clone(),
            zip_codes: result.zip_codes(),
            criteria: result.search_criteria,
            place: result.map.place,
            zcta_features: result.map.included_zctas,
        });
        info!(city_key = %key, sessions = self.sessions.len(), "city added");
    }

    /// Fit the camera to a recorded city's boundary.
    pub fn fit_city<E: MapEngine>(&self, registry: &mut LayerRegistry<E>, city_key: &str) -> bool {
        let Some(session) = self.get(city_key) else {
            return false;
        };
        let fitted = registry.fit_to_bounds(&GeoJson::from(session.place.clone()), &self.config.fit);
        if !fitted {
            debug!(city_key, "bounds fit skipped");
        }
        fitted
    }

    /// Show or hide a city's boundary and postal-code layers.
    pub fn set_city_visible<E: MapEngine>(
        &self,
        registry: &mut LayerRegistry<E>,
        city_key: &str,
        visible: bool,
    ) -> bool {
        if !self.contains(city_key) {
            warn!(city_key, "visibility change for unknown city");
            return false;
        }
        let boundary = registry.set_visibility(&boundary_layer_id(city_key), visible);
        let zctas = registry.set_visibility(&zcta_layer_id(city_key), visible);
        boundary && zctas
    }

    /// Whether a city's boundary is shown.
    pub fn is_city_visible<E: MapEngine>(&self, registry: &LayerRegistry<E>, city_key: &str) -> bool {
        registry
            .get(&boundary_layer_id(city_key))
            .is_some_and(|r| r.added && r.visible)
    }

    /// Request `add` for every available postal code of a city.
    pub fn bulk_add_for(
        &self,
        selection: &mut ZipSelectionController,
        city_key: &str,
    ) -> Vec<StatusChange> {
        let Some(session) = self.get(city_key) else {
            warn!(city_key, "bulk add for unknown city");
            return Vec::new();
        };
        selection.bulk_add(session.zip_codes.iter().map(String::as_str))
    }

    /// Remove every city from the map and forget the sessions.
    ///
    /// Returns `false` if some layer could not be removed cleanly; the
    /// registry keeps such layers as not added so a later search repairs them.
    pub fn clear_sessions<E: MapEngine>(&mut self, ctx: &mut SessionContext<'_, E>) -> bool {
        let mut clean = true;
        for session in self.sessions.drain(..) {
            let zcta_id = session.zcta_layer_id();
            ctx.interaction.unbind(&zcta_id);
            clean &= ctx.registry.remove(&zcta_id);
            clean &= ctx.registry.remove(&session.boundary_layer_id());
        }
        info!(clean, "sessions cleared");
        clean
    }

    /// Forget every session without touching the map.
    pub(crate) fn reset(&mut self) {
        self.sessions.clear();
        self.in_progress.clear();
    }

    /// Replace the service-area overlay and fit the camera to it.
    ///
    /// An empty collection just removes the overlay.
    pub fn show_service_areas<E: MapEngine>(
        &self,
        registry: &mut LayerRegistry<E>,
        areas: &FeatureCollection,
    ) -> bool {
        if !registry.remove(SERVICE_AREA_LAYER) {
            warn!("old service areas not fully removed");
        }
        if areas.is_empty() {
            return true;
        }
        let data = GeoJson::from(areas.clone());
        if !registry.upsert(
            SERVICE_AREA_LAYER,
            LayerKind::ServiceArea,
            &data,
            &service_area_style(),
            true,
        ) {
            return false;
        }
        registry.fit_to_bounds(&data, &self.config.fit);
        true
    }
}

/// Postal-code polygons stamped with their current status and the search id.
fn stamp_zctas(
    selection: &mut ZipSelectionController,
    city_key: &str,
    result: &SearchResult,
) -> GeoJson {
    for zip in &result.zips {
        selection.register(zip);
    }
    let mut zctas = result.map.included_zctas.clone();
    for feature in &mut zctas.features {
        let status = match normalize_zip(&feature.properties) {
            Some(zip) => selection.register(&zip),
            None => ZipState::Available,
        };
        feature.set_property(STATUS_PROPERTY, Value::from(status.as_str()));
        feature.set_property(SEARCH_ID_PROPERTY, Value::from(city_key));
    }
    zctas.into()
}

/// Upsert both layers of a city. On failure, returns the failing layer id.
fn draw_city<E: MapEngine>(
    registry: &mut LayerRegistry<E>,
    city_key: &str,
    place: &GeoJson,
    zctas: &GeoJson,
) -> Result<(), String> {
    let boundary = boundary_layer_id(city_key);
    if !registry.upsert(&boundary, LayerKind::Boundary, place, &boundary_style(), true) {
        return Err(boundary);
    }
    let zcta = zcta_layer_id(city_key);
    if !registry.upsert(&zcta, LayerKind::Zcta, zctas, &zcta_style(), true) {
        return Err(zcta);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{city, minneapolis};
    use servicemap_geo::Feature;
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> ReadinessPolicy {
        ReadinessPolicy {
            max_attempts,
            ..ReadinessPolicy::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_map_returns_immediately() {
        let signal = ReadinessSignal::new();
        signal.mark_loaded();
        signal.mark_style_loaded();
        let start = Instant::now();
        wait_until_ready(&policy(3), &signal).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_wait_backs_off_then_gives_up() {
        let signal = ReadinessSignal::new();
        signal.mark_loaded();
        let start = Instant::now();
        let err = wait_until_ready(&policy(3), &signal).await.unwrap_err();
        assert!(matches!(err, SessionError::MapNotReady { attempts: 3 }), "{err}");
        // 100 ms, 150 ms, 225 ms.
        assert_eq!(start.elapsed(), Duration::from_millis(475));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_wait_wakes_on_signal() {
        let signal = ReadinessSignal::new();
        let host = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            host.mark_style_loaded();
            host.mark_loaded();
        });
        let start = Instant::now();
        wait_until_ready(&policy(3), &signal).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn stamping_registers_codes_and_marks_the_session() {
        let mut selection = ZipSelectionController::new();
        selection.sync_statuses([("55403", ZipState::Added)]);

        let mut result = minneapolis();
        result
            .map
            .included_zctas
            .features
            .push(Feature::default());
        let zctas = stamp_zctas(&mut selection, "minneapolis-mn", &result);

        let statuses: Vec<_> = zctas
            .features()
            .map(|f| f.property_str(STATUS_PROPERTY))
            .collect();
        assert_eq!(
            statuses,
            [Some("available"), Some("available"), Some("added"), Some("available")]
        );
        assert!(
            zctas
                .features()
                .all(|f| f.property_str(SEARCH_ID_PROPERTY) == Some("minneapolis-mn"))
        );
        assert_eq!(selection.len(), 3);
        // The source result is left untouched.
        assert!(result.map.included_zctas.features[0].property_str(STATUS_PROPERTY).is_none());
    }

    #[test]
    fn a_city_is_claimed_once_until_abandoned() {
        let mut sessions = SearchSessionManager::new(MapConfig::default());
        let city = sessions.begin(minneapolis()).unwrap();
        assert_eq!(city.key, "minneapolis-mn");
        assert!(sessions.begin(minneapolis()).is_none());
        assert!(sessions.is_in_progress("minneapolis-mn"));

        sessions.abandon("minneapolis-mn");
        assert!(!sessions.is_in_progress("minneapolis-mn"));
        assert!(sessions.begin(minneapolis()).is_some());
        assert!(!sessions.contains("minneapolis-mn"));
    }

    #[test]
    fn zip_lookup_finds_the_owning_city() {
        let mut sessions = SearchSessionManager::new(MapConfig::default());
        for result in [minneapolis(), city("Edina", "MN", -90.0, &["55424"])] {
            sessions.sessions.push(SearchSession {
                city_key: result.search_criteria.city_key(),
                zip_codes: result.zip_codes(),
                criteria: result.search_criteria,
                place: result.map.place,
                zcta_features: result.map.included_zctas,
            });
        }
        assert_eq!(sessions.city_for_zip("55424").unwrap().city_key, "edina-mn");
        assert_eq!(sessions.city_for_zip("55402").unwrap().city_key, "minneapolis-mn");
        assert!(sessions.city_for_zip("90210").is_none());
    }
}
