// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use servicemap_geo::{FeatureCollection, LngLat};
use servicemap_interaction::InteractionLayer;
use servicemap_registry::LayerRegistry;
use servicemap_render::{MapEngine, MapRenderer, ReadinessSignal};
use servicemap_selection::{
    Outcome, StatusChange, Ticket, ZipAction, ZipCommand, ZipSelectionController, ZipState,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::MapConfig;
use crate::error::SessionError;
use crate::flow;
use crate::manager::{
    PendingCity, RestoreReport, SearchOutcome, SearchSessionManager, SessionContext,
};
use crate::search::{SearchProvider, SearchResult};

/// Handle to one mounted service-area map.
///
/// Owns the registry (and through it the renderer), the selection
/// controller, the interaction layer and the search sessions. Every status
/// change made through the handle is restyled onto every postal-code layer
/// showing that code. Dropping the handle tears the map down.
#[derive(Debug)]
pub struct ServiceAreaMap<E: MapEngine> {
    registry: LayerRegistry<E>,
    selection: ZipSelectionController,
    interaction: InteractionLayer,
    sessions: SearchSessionManager,
}

impl<E: MapEngine> ServiceAreaMap<E> {
    /// Wrap an engine. Commands for the persistence side arrive on the
    /// returned receiver.
    pub fn new(engine: E, config: MapConfig) -> (Self, mpsc::UnboundedReceiver<ZipCommand>) {
        let (selection, commands) = ZipSelectionController::with_channel();
        let map = Self {
            registry: LayerRegistry::new(MapRenderer::new(engine)),
            selection,
            interaction: InteractionLayer::new(),
            sessions: SearchSessionManager::new(config),
        };
        (map, commands)
    }

    /// Create the map inside `container`. Later calls are no-ops.
    pub fn mount(&mut self, container: &str) -> bool {
        let options = self.sessions.config().map_options(container);
        self.registry.init(&options)
    }

    /// Handle for the host to report `load` / `style.load`.
    pub fn readiness_signal(&self) -> ReadinessSignal {
        self.registry.signal().clone()
    }

    /// The layer registry.
    pub fn registry(&self) -> &LayerRegistry<E> {
        &self.registry
    }

    /// The selection controller.
    pub fn selection(&self) -> &ZipSelectionController {
        &self.selection
    }

    /// The interaction layer.
    pub fn interaction(&self) -> &InteractionLayer {
        &self.interaction
    }

    /// The search sessions.
    pub fn sessions(&self) -> &SearchSessionManager {
        &self.sessions
    }

    fn parts(&mut self) -> (&mut SearchSessionManager, SessionContext<'_, E>) {
        (
            &mut self.sessions,
            SessionContext {
                registry: &mut self.registry,
                selection: &mut self.selection,
                interaction: &mut self.interaction,
            },
        )
    }

    /// Draw a search result's city, unless it is already on the map.
    ///
    /// Holds the handle until the city is drawn and fitted; use
    /// [`SharedMap`](crate::SharedMap) to keep handling input meanwhile.
    pub async fn on_search_result(
        &mut self,
        result: SearchResult,
    ) -> Result<SearchOutcome, SessionError> {
        flow::search::<E, _>(self, result).await
    }

    /// Replay persisted cities at mount time.
    pub async fn restore_sessions(
        &mut self,
        results: impl IntoIterator<Item = SearchResult>,
    ) -> RestoreReport {
        flow::restore::<E, _>(self, results).await
    }

    /// Select a postal code, drawing its city first if needed.
    pub async fn select_suburban_zip<P: SearchProvider + ?Sized>(
        &mut self,
        zip: &str,
        provider: &P,
    ) -> Result<Option<StatusChange>, SessionError> {
        flow::select_suburban::<E, _, P>(self, zip, provider).await
    }

    /// Whether the map has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.registry.readiness().torn_down
    }

    pub(crate) fn sessions_mut(&mut self) -> &mut SearchSessionManager {
        &mut self.sessions
    }

    pub(crate) fn begin_search(
        &mut self,
        result: SearchResult,
    ) -> Result<Option<PendingCity>, SessionError> {
        if self.is_torn_down() {
            return Err(SessionError::TornDown);
        }
        Ok(self.sessions.begin(result))
    }

    /// One drawing attempt. `Ok(Some(layer))` names the layer that failed.
    pub(crate) fn draw_pending(
        &mut self,
        city: &PendingCity,
    ) -> Result<Option<String>, SessionError> {
        if self.is_torn_down() {
            return Err(SessionError::TornDown);
        }
        let (sessions, mut ctx) = self.parts();
        Ok(sessions.draw(&mut ctx, city).err())
    }

    pub(crate) fn finish_pending(&mut self, city: PendingCity) {
        let (sessions, mut ctx) = self.parts();
        sessions.finish(&mut ctx, city);
    }

    /// Fit the camera to a searched city.
    pub fn fit_city(&mut self, city_key: &str) -> bool {
        self.sessions.fit_city(&mut self.registry, city_key)
    }

    /// Click at `point`.
    pub fn on_click(&mut self, point: LngLat) -> Option<StatusChange> {
        let change = self
            .interaction
            .on_click(point, &self.registry, &mut self.selection);
        self.apply(change.iter());
        change
    }

    /// Pointer moved to `point`. Returns the hovered postal code.
    pub fn on_hover(&mut self, point: LngLat) -> Option<String> {
        self.interaction
            .on_hover(point, &mut self.registry, &self.selection)
    }

    /// Pointer left the map.
    pub fn on_leave(&mut self) {
        self.interaction.on_leave(&mut self.registry);
    }

    /// Request `action` for `zip`.
    pub fn toggle(&mut self, zip: &str, action: ZipAction) -> Option<StatusChange> {
        let change = self.selection.toggle(zip, action);
        self.apply(change.iter());
        change
    }

    /// Request `add` for every available code in `zips`.
    pub fn bulk_add<'a>(&mut self, zips: impl IntoIterator<Item = &'a str>) -> Vec<StatusChange> {
        let changes = self.selection.bulk_add(zips);
        self.apply(changes.iter());
        changes
    }

    /// Request `add` for every available code of a searched city.
    pub fn bulk_add_city(&mut self, city_key: &str) -> Vec<StatusChange> {
        let changes = self.sessions.bulk_add_for(&mut self.selection, city_key);
        self.apply(changes.iter());
        changes
    }

    /// Settle an in-flight command.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Outcome) -> Option<StatusChange> {
        let change = self.selection.resolve(ticket, outcome);
        self.apply(change.iter());
        change
    }

    /// Apply the authoritative status mapping.
    pub fn sync_statuses<'a>(
        &mut self,
        mapping: impl IntoIterator<Item = (&'a str, ZipState)>,
    ) -> Vec<StatusChange> {
        let changes = self.selection.sync_statuses(mapping);
        self.apply(changes.iter());
        changes
    }

    fn apply<'a>(&mut self, changes: impl Iterator<Item = &'a StatusChange>) {
        let statuses: BTreeMap<&str, &'static str> = changes
            .map(|c| (c.zip.as_str(), c.to.as_str()))
            .collect();
        if statuses.is_empty() {
            return;
        }
        let layers = self.registry.restyle_all(|zip| statuses.get(zip).copied());
        debug!(codes = statuses.len(), layers, "status restyled");
    }

    /// Show or hide a searched city.
    pub fn set_city_visible(&mut self, city_key: &str, visible: bool) -> bool {
        self.sessions
            .set_city_visible(&mut self.registry, city_key, visible)
    }

    /// Whether a searched city is shown.
    pub fn is_city_visible(&self, city_key: &str) -> bool {
        self.sessions.is_city_visible(&self.registry, city_key)
    }

    /// Flip a searched city's visibility. Returns the new visibility.
    pub fn toggle_city_visibility(&mut self, city_key: &str) -> bool {
        let visible = !self.is_city_visible(city_key);
        self.set_city_visible(city_key, visible);
        self.is_city_visible(city_key)
    }

    /// Remove every searched city.
    pub fn clear_sessions(&mut self) -> bool {
        let (sessions, mut ctx) = self.parts();
        sessions.clear_sessions(&mut ctx)
    }

    /// Replace the service-area overlay.
    pub fn show_service_areas(&mut self, areas: &FeatureCollection) -> bool {
        self.sessions.show_service_areas(&mut self.registry, areas)
    }

    /// Tear the map down and forget the sessions. Later operations are
    /// rejected.
    pub fn teardown(&mut self) {
        self.interaction.reset();
        self.registry.teardown();
        self.sessions.reset();
    }
}

impl<E: MapEngine> Drop for ServiceAreaMap<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::manager::SERVICE_AREA_LAYER;
    use crate::search::{boundary_layer_id, zcta_layer_id};
    use crate::shared::SharedMap;
    use crate::test_support::{edina, inside, minneapolis, mounted, ready};
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use servicemap_geo::{Feature, Geometry};
    use servicemap_registry::LayerKind;
    use servicemap_render::{Cursor, EngineOp, HeadlessEngine};
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    const ADDING: &str = "#84cc16";
    const ADDED: &str = "#22c55e";
    const AVAILABLE: &str = "#e5e7eb";

    fn fill(map: &ServiceAreaMap<HeadlessEngine>, city_key: &str, zip: &str) -> Value {
        let engine = map.registry().renderer().engine();
        let layer = zcta_layer_id(city_key);
        let id = engine.find_feature(&layer, "ZCTA5CE10", zip).unwrap();
        engine.paint_value(&layer, id, "fill-color").unwrap()
    }

    fn assert_city_shown(map: &ServiceAreaMap<HeadlessEngine>, city_key: &str, shown: bool) {
        let engine = map.registry().renderer().engine();
        for id in [boundary_layer_id(city_key), zcta_layer_id(city_key)] {
            assert_eq!(engine.layer_visibility(&id), Some(shown), "{id}");
            assert_eq!(engine.layer_visibility(&format!("{id}-stroke")), Some(shown), "{id}-stroke");
        }
    }

    struct Lookup(Result<Option<SearchResult>, SearchError>);

    #[async_trait]
    impl SearchProvider for Lookup {
        async fn search_for_zip(&self, _zip: &str) -> Result<Option<SearchResult>, SearchError> {
            self.0.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_a_click_lifecycle() {
        let (mut map, mut commands) = ready();
        let outcome = map.on_search_result(minneapolis()).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Added);
        for zip in ["55401", "55402", "55403"] {
            assert_eq!(map.selection().state(zip), ZipState::Available);
            assert_eq!(fill(&map, "minneapolis-mn", zip), json!(AVAILABLE));
        }

        let first = inside(-94.0, 0);
        let change = map.on_click(first).unwrap();
        assert_eq!((change.zip.as_str(), change.to), ("55401", ZipState::Adding));
        assert_eq!(fill(&map, "minneapolis-mn", "55401"), json!(ADDING));
        assert!(map.on_click(first).is_none(), "clicks mid-flight are ignored");

        let cmd = commands.try_recv().unwrap();
        assert_eq!((cmd.zip.as_str(), cmd.action), ("55401", ZipAction::Add));
        map.resolve(cmd.ticket, Outcome::Confirmed);
        assert_eq!(map.selection().state("55401"), ZipState::Added);
        assert_eq!(fill(&map, "minneapolis-mn", "55401"), json!(ADDED));

        assert_eq!(map.on_click(first).unwrap().to, ZipState::Removing);
        let cmd = commands.try_recv().unwrap();
        assert_eq!(cmd.action, ZipAction::Remove);
        map.resolve(cmd.ticket, Outcome::Confirmed);
        assert_eq!(map.selection().state("55401"), ZipState::Available);
        assert_eq!(fill(&map, "minneapolis-mn", "55401"), json!(AVAILABLE));
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_b_cities_accumulate() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        map.on_search_result(edina()).await.unwrap();

        assert_city_shown(&map, "minneapolis-mn", true);
        assert_city_shown(&map, "edina-mn", true);
        let engine = map.registry().renderer().engine();
        assert_eq!(engine.source_count(), 4);
        assert_eq!(engine.layer_count(), 8);
        assert_eq!(map.registry().list(Some(LayerKind::Zcta)).len(), 2);
        assert!(map.registry().is_consistent());

        assert_eq!(map.on_click(inside(-90.0, 0)).unwrap().zip, "55424");
        assert_eq!(map.on_click(inside(-94.0, 2)).unwrap().zip, "55403");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_search_does_no_layer_work() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        let again = map.on_search_result(minneapolis()).await.unwrap();
        assert_eq!(again, SearchOutcome::AlreadyPresent);

        let engine = map.registry().renderer().engine();
        assert_eq!(engine.call_count(EngineOp::AddSource), 2);
        assert_eq!(engine.call_count(EngineOp::AddLayer), 4);
        assert_eq!(map.sessions().sessions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_twice_never_duplicates() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();

        let report = map.restore_sessions([minneapolis(), edina()]).await;
        assert_eq!(report.added, ["edina-mn"]);
        assert_eq!(report.skipped, ["minneapolis-mn"]);
        assert!(report.failed.is_empty());

        let report = map.restore_sessions([minneapolis(), edina()]).await;
        assert!(report.added.is_empty());
        assert_eq!(report.skipped.len(), 2);

        let engine = map.registry().renderer().engine();
        assert_eq!(engine.layer_count(), 8);
        assert_eq!(engine.call_count(EngineOp::AddSource), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn search_waits_for_readiness() {
        let (mut map, _commands) = mounted();
        let signal = map.readiness_signal();
        tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            signal.mark_loaded();
            sleep(Duration::from_millis(200)).await;
            signal.mark_style_loaded();
        });

        let start = Instant::now();
        assert_eq!(map.on_search_result(minneapolis()).await.unwrap(), SearchOutcome::Added);
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(map.sessions().contains("minneapolis-mn"));
    }

    #[tokio::test(start_paused = true)]
    async fn search_gives_up_when_map_never_loads() {
        let (mut map, _commands) = mounted();
        let err = map.on_search_result(minneapolis()).await.unwrap_err();
        assert!(matches!(err, SessionError::MapNotReady { attempts: 20 }), "{err}");
        assert!(!map.sessions().contains("minneapolis-mn"), "not recorded, so it can be retried");

        let signal = map.readiness_signal();
        signal.mark_loaded();
        signal.mark_style_loaded();
        assert_eq!(map.on_search_result(minneapolis()).await.unwrap(), SearchOutcome::Added);
    }

    #[tokio::test(start_paused = true)]
    async fn search_after_teardown_fails_fast() {
        let (mut map, _commands) = ready();
        map.teardown();
        let start = Instant::now();
        let err = map.on_search_result(minneapolis()).await.unwrap_err();
        assert!(matches!(err, SessionError::TornDown), "{err}");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_forgets_drawn_cities() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        map.teardown();
        assert!(map.sessions().sessions().is_empty());
        let err = map.on_search_result(minneapolis()).await.unwrap_err();
        assert!(matches!(err, SessionError::TornDown), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_go_through_while_a_suburban_city_settles() {
        let (map, mut commands) = ready();
        let shared = SharedMap::new(map);
        shared.on_search_result(minneapolis()).await.unwrap();

        let selecting = tokio::spawn({
            let shared = shared.clone();
            async move {
                let lookup = Lookup(Ok(Some(edina())));
                shared.select_suburban_zip("55424", &lookup).await
            }
        });
        sleep(Duration::from_millis(500)).await;
        assert!(shared.with(|m| m.sessions().contains("edina-mn")), "city drawn before settling");
        assert_eq!(shared.with(|m| m.selection().state("55424")), ZipState::Available);

        let change = shared.with(|m| m.on_click(inside(-94.0, 0))).unwrap();
        assert_eq!((change.zip.as_str(), change.to), ("55401", ZipState::Adding));
        assert_eq!(commands.try_recv().unwrap().zip, "55401");
        assert_eq!(shared.with(|m| fill(m, "minneapolis-mn", "55401")), json!(ADDING));

        let change = selecting.await.unwrap().unwrap().unwrap();
        assert_eq!((change.zip.as_str(), change.to), ("55424", ZipState::Adding));
        assert_eq!(commands.try_recv().unwrap().zip, "55424");
        assert_eq!(shared.with(|m| fill(m, "edina-mn", "55424")), json!(ADDING));
    }

    #[tokio::test(start_paused = true)]
    async fn map_stays_usable_while_a_search_waits_for_readiness() {
        let (map, _commands) = mounted();
        let shared = SharedMap::new(map);
        let signal = shared.with(|m| m.readiness_signal());
        let searching = tokio::spawn({
            let shared = shared.clone();
            async move { shared.on_search_result(minneapolis()).await }
        });
        sleep(Duration::from_millis(50)).await;

        let changes = shared.with(|m| m.sync_statuses([("55402", ZipState::Added)]));
        assert_eq!(changes.len(), 1);
        let again = shared.on_search_result(minneapolis()).await.unwrap();
        assert_eq!(again, SearchOutcome::AlreadyPresent, "already being drawn");
        assert!(shared.with(|m| m.sessions().is_in_progress("minneapolis-mn")));

        signal.mark_loaded();
        signal.mark_style_loaded();
        assert_eq!(searching.await.unwrap().unwrap(), SearchOutcome::Added);
        assert_eq!(shared.with(|m| fill(m, "minneapolis-mn", "55402")), json!(ADDED));
        assert_eq!(
            shared.with(|m| m.registry().renderer().engine().call_count(EngineOp::AddSource)),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shared_search_gives_up_and_can_be_retried() {
        let (map, _commands) = mounted();
        let shared = SharedMap::new(map);
        let err = shared.on_search_result(minneapolis()).await.unwrap_err();
        assert!(matches!(err, SessionError::MapNotReady { .. }), "{err}");
        assert!(!shared.with(|m| m.sessions().is_in_progress("minneapolis-mn")));

        let signal = shared.with(|m| m.readiness_signal());
        signal.mark_loaded();
        signal.mark_style_loaded();
        let report = shared.restore_sessions([minneapolis(), edina()]).await;
        assert_eq!(report.added.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_layer_is_retried() {
        let (mut map, _commands) = ready();
        let faults = map.registry().renderer().engine().faults().clone();
        faults.fail_once_for(EngineOp::AddLayer, "zcta-polygons-minneapolis-mn-stroke");

        assert_eq!(map.on_search_result(minneapolis()).await.unwrap(), SearchOutcome::Added);
        let record = map.registry().get("zcta-polygons-minneapolis-mn").unwrap();
        assert!(record.added);
        assert!(map.registry().is_consistent());
        assert_eq!(map.registry().renderer().engine().layer_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_layer_failure_is_reported() {
        let (mut map, _commands) = ready();
        let faults = map.registry().renderer().engine().faults().clone();
        faults.fail_for(EngineOp::AddSource, "zcta-polygons-minneapolis-mn");

        let start = Instant::now();
        let err = map.on_search_result(minneapolis()).await.unwrap_err();
        match err {
            SessionError::LayerFailed {
                city_key,
                layer,
                attempts,
            } => {
                assert_eq!(city_key, "minneapolis-mn");
                assert_eq!(layer, "zcta-polygons-minneapolis-mn");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(start.elapsed() >= Duration::from_millis(500), "200 ms then 300 ms");
        assert!(!map.sessions().contains("minneapolis-mn"));

        faults.clear();
        assert_eq!(map.on_search_result(minneapolis()).await.unwrap(), SearchOutcome::Added);
        assert!(map.registry().is_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn search_recentres_then_fits() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        let engine = map.registry().renderer().engine();
        assert_eq!(engine.call_count(EngineOp::JumpTo), 1);
        let camera = engine.camera();
        let fitted = camera.fitted.unwrap();
        assert_eq!((fitted.min_lng, fitted.max_lng), (-94.0, -91.0));
        assert_eq!(camera.center, LngLat::new(-92.5, 44.5));
    }

    #[tokio::test(start_paused = true)]
    async fn suburban_zip_draws_its_city_first() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();

        let start = Instant::now();
        let change = map
            .select_suburban_zip("55424", &Lookup(Ok(Some(edina()))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.to, ZipState::Adding);
        assert!(map.sessions().contains("edina-mn"));
        assert!(start.elapsed() >= Duration::from_millis(2000), "settle delay");
        assert_eq!(fill(&map, "edina-mn", "55424"), json!(ADDING));
    }

    #[tokio::test(start_paused = true)]
    async fn suburban_zip_in_known_city_skips_lookup() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();

        let start = Instant::now();
        let lookup = Lookup(Err(SearchError("must not be called".into())));
        let change = map.select_suburban_zip("55402", &lookup).await.unwrap();
        assert_eq!(change.unwrap().to, ZipState::Adding);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn suburban_lookup_failure_still_selects() {
        let (mut map, mut commands) = ready();
        let lookup = Lookup(Err(SearchError("service unavailable".into())));
        let change = map.select_suburban_zip("55424", &lookup).await.unwrap();
        assert_eq!(change.unwrap().to, ZipState::Adding);
        assert!(map.sessions().sessions().is_empty());
        assert_eq!(commands.try_recv().unwrap().zip, "55424");
    }

    #[tokio::test(start_paused = true)]
    async fn city_visibility_toggles_both_layers() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        assert!(map.is_city_visible("minneapolis-mn"));

        assert!(!map.toggle_city_visibility("minneapolis-mn"));
        assert_city_shown(&map, "minneapolis-mn", false);
        assert!(map.on_click(inside(-94.0, 0)).is_none(), "hidden polygons do not hit");

        assert!(map.toggle_city_visibility("minneapolis-mn"));
        assert_city_shown(&map, "minneapolis-mn", true);
        assert!(!map.set_city_visible("nowhere-xx", false));
    }

    #[tokio::test(start_paused = true)]
    async fn status_mapping_is_stamped_on_new_layers() {
        let (mut map, _commands) = ready();
        map.sync_statuses([("55402", ZipState::Added)]);
        map.on_search_result(minneapolis()).await.unwrap();
        assert_eq!(fill(&map, "minneapolis-mn", "55402"), json!(ADDED));

        let snapshot = &map.registry().get("zcta-polygons-minneapolis-mn").unwrap().data;
        for feature in snapshot.features() {
            assert_eq!(feature.property_str("searchId"), Some("minneapolis-mn"));
        }

        map.sync_statuses([("55402", ZipState::Available)]);
        assert_eq!(fill(&map, "minneapolis-mn", "55402"), json!(AVAILABLE));
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_add_city_skips_unavailable_codes() {
        let (mut map, mut commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();
        map.sync_statuses([("55403", ZipState::Error)]);

        let changes = map.bulk_add_city("minneapolis-mn");
        let zips: Vec<&str> = changes.iter().map(|c| c.zip.as_str()).collect();
        assert_eq!(zips, ["55401", "55402"]);
        assert_eq!(map.selection().state("55403"), ZipState::Error);
        assert_eq!(fill(&map, "minneapolis-mn", "55401"), json!(ADDING));
        assert_eq!(fill(&map, "minneapolis-mn", "55402"), json!(ADDING));

        let first = commands.try_recv().unwrap();
        let second = commands.try_recv().unwrap();
        map.resolve(first.ticket, Outcome::Failed);
        assert_eq!(map.selection().state("55401"), ZipState::Error);
        assert_eq!(map.selection().state(&second.zip), ZipState::Adding);
    }

    #[tokio::test(start_paused = true)]
    async fn hover_sets_cursor_and_leave_clears_it() {
        let (mut map, _commands) = ready();
        map.on_search_result(minneapolis()).await.unwrap();

        assert_eq!(map.on_hover(inside(-94.0, 1)).as_deref(), Some("55402"));
        assert_eq!(map.registry().renderer().engine().cursor(), Cursor::Pointer);
        assert!(map.interaction().hovered().is_some());

        map.on_leave();
        assert!(map.interaction().hovered().is_none());
        assert_eq!(map.registry().renderer().engine().cursor(), Cursor::Default);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_sessions_removes_every_city() {
        let (mut map, _commands) = ready();
        map.restore_sessions([minneapolis(), edina()]).await;
        assert!(map.clear_sessions());
        assert_eq!(map.registry().renderer().engine().layer_count(), 0);
        assert!(map.sessions().sessions().is_empty());
        assert!(!map.interaction().is_bound("zcta-polygons-edina-mn"));

        assert_eq!(map.on_search_result(edina()).await.unwrap(), SearchOutcome::Added);
    }

    #[tokio::test(start_paused = true)]
    async fn service_areas_are_replaced() {
        let (mut map, _commands) = ready();
        let ring = [(-93.0, 44.0), (-92.0, 44.0), (-92.0, 45.0), (-93.0, 45.0)];
        let areas = FeatureCollection::new(vec![Feature::new(Some(Geometry::polygon(&ring)), Map::new())]);

        assert!(map.show_service_areas(&areas));
        assert!(map.show_service_areas(&areas));
        let record = map.registry().get(SERVICE_AREA_LAYER).unwrap();
        assert_eq!(record.kind, LayerKind::ServiceArea);
        let engine = map.registry().renderer().engine();
        assert_eq!(engine.source_count(), 1);
        assert_eq!(engine.call_count(EngineOp::AddSource), 2);
        assert!(engine.camera().fitted.is_some());

        assert!(map.show_service_areas(&FeatureCollection::default()));
        assert!(map.registry().get(SERVICE_AREA_LAYER).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_tears_down() {
        let (map, _commands) = ready();
        let signal = map.readiness_signal();
        drop(map);
        assert!(signal.current().torn_down);
    }
}
