// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The asynchronous session flows.
//!
//! Each flow alternates short synchronous steps on the map with waits. The
//! map is only reached through [`MapAccess::with_map`], which never spans an
//! `.await`, so a shared map stays usable by clicks, status syncs and other
//! searches while a flow is waiting.

use servicemap_render::MapEngine;
use servicemap_selection::{StatusChange, ZipAction};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::manager::{PendingCity, RestoreReport, SearchOutcome, wait_until_ready};
use crate::map::ServiceAreaMap;
use crate::search::{SearchProvider, SearchResult};

/// Short-lived access to a map.
pub(crate) trait MapAccess<E: MapEngine> {
    /// Run `f` against the map. The access lasts only for the call.
    fn with_map<R>(&mut self, f: impl FnOnce(&mut ServiceAreaMap<E>) -> R) -> R;
}

impl<E: MapEngine> MapAccess<E> for ServiceAreaMap<E> {
    fn with_map<R>(&mut self, f: impl FnOnce(&mut ServiceAreaMap<E>) -> R) -> R {
        f(self)
    }
}

/// Draw a search result's city, unless it is already on the map.
///
/// Steps run strictly in order: readiness, boundary layer, postal-code layer,
/// hover binding, recentre on the centroid, then a bounds fit after a short
/// delay. If the map never becomes ready or the layers keep failing the city
/// is not recorded, so a later call tries again.
pub(crate) async fn search<E, A>(
    access: &mut A,
    result: SearchResult,
) -> Result<SearchOutcome, SessionError>
where
    E: MapEngine,
    A: MapAccess<E>,
{
    let claimed = access.with_map(|map| map.begin_search(result))?;
    let Some(city) = claimed else {
        return Ok(SearchOutcome::AlreadyPresent);
    };
    let key = city.key.clone();
    let drawn = draw(access, city).await;
    if drawn.is_err() {
        access.with_map(|map| map.sessions_mut().abandon(&key));
    }
    drawn
}

async fn draw<E, A>(access: &mut A, city: PendingCity) -> Result<SearchOutcome, SessionError>
where
    E: MapEngine,
    A: MapAccess<E>,
{
    let (signal, config) =
        access.with_map(|map| (map.readiness_signal(), map.sessions().config().clone()));
    wait_until_ready(&config.readiness, &signal).await?;

    let policy = &config.layer_retry;
    let mut attempt = 1;
    loop {
        let failed = access.with_map(|map| map.draw_pending(&city))?;
        let Some(layer) = failed else {
            break;
        };
        if attempt >= policy.max_attempts {
            warn!(city_key = %city.key, layer = %layer, attempt, "giving up on city");
            return Err(SessionError::LayerFailed {
                city_key: city.key,
                layer,
                attempts: attempt,
            });
        }
        let delay = policy.delay(attempt);
        warn!(city_key = %city.key, layer = %layer, attempt, ?delay, "layer failed, retrying");
        sleep(delay).await;
        attempt += 1;
    }

    let key = city.key.clone();
    access.with_map(|map| map.finish_pending(city));
    sleep(config.fit_delay()).await;
    access.with_map(|map| map.fit_city(&key));
    Ok(SearchOutcome::Added)
}

/// Replay previously searched cities, skipping any already drawn.
pub(crate) async fn restore<E, A>(
    access: &mut A,
    results: impl IntoIterator<Item = SearchResult>,
) -> RestoreReport
where
    E: MapEngine,
    A: MapAccess<E>,
{
    let mut report = RestoreReport::default();
    for result in results {
        let key = result.search_criteria.city_key();
        match search(access, result).await {
            Ok(SearchOutcome::Added) => report.added.push(key),
            Ok(SearchOutcome::AlreadyPresent) => report.skipped.push(key),
            Err(SessionError::TornDown) => {
                report.failed.push((key, SessionError::TornDown));
                break;
            }
            Err(err) => report.failed.push((key, err)),
        }
    }
    info!(
        added = report.added.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "sessions restored"
    );
    report
}

/// Select a postal code, first drawing its city if it is not on the map.
///
/// After a new city is drawn the selection waits for the settle delay so the
/// polygons are on screen before their colour changes. If the city cannot be
/// found or drawn the code is selected anyway.
pub(crate) async fn select_suburban<E, A, P>(
    access: &mut A,
    zip: &str,
    provider: &P,
) -> Result<Option<StatusChange>, SessionError>
where
    E: MapEngine,
    A: MapAccess<E>,
    P: SearchProvider + ?Sized,
{
    let (known, settle) = access.with_map(|map| {
        let sessions = map.sessions();
        (
            sessions.city_for_zip(zip).is_some(),
            sessions.config().suburban_settle(),
        )
    });
    if !known {
        match provider.search_for_zip(zip).await {
            Ok(Some(result)) => match search(access, result).await {
                Ok(SearchOutcome::Added) => sleep(settle).await,
                Ok(SearchOutcome::AlreadyPresent) => {}
                Err(SessionError::TornDown) => return Err(SessionError::TornDown),
                Err(err) => warn!(zip, %err, "neighbouring city not drawn, selecting anyway"),
            },
            Ok(None) => debug!(zip, "no city found for postal code"),
            Err(err) => warn!(zip, %err, "city lookup failed, selecting anyway"),
        }
    }
    access.with_map(|map| {
        if map.is_torn_down() {
            return Err(SessionError::TornDown);
        }
        Ok(map.toggle(zip, ZipAction::Add))
    })
}
