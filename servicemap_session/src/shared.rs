// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::{Arc, Mutex, PoisonError};

use servicemap_render::MapEngine;
use servicemap_selection::StatusChange;

use crate::error::SessionError;
use crate::flow::{self, MapAccess};
use crate::manager::{RestoreReport, SearchOutcome};
use crate::map::ServiceAreaMap;
use crate::search::{SearchProvider, SearchResult};

/// A [`ServiceAreaMap`] shared between the host's input handling and
/// long-running session flows.
///
/// The async operations lock the map only for their synchronous steps and
/// never across a wait, so clicks, hovers and status syncs go through while a
/// city is waiting for readiness, retrying a layer or settling. Clones share
/// one map; the map is torn down when the last clone is dropped.
#[derive(Debug)]
pub struct SharedMap<E: MapEngine> {
    inner: Arc<Mutex<ServiceAreaMap<E>>>,
}

impl<E: MapEngine> Clone for SharedMap<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: MapEngine> SharedMap<E> {
    /// Share `map`.
    pub fn new(map: ServiceAreaMap<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }

    /// Run `f` against the map.
    ///
    /// Must not be called from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut ServiceAreaMap<E>) -> R) -> R {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut map)
    }

    /// Draw a search result's city, unless it is already on the map or
    /// being drawn.
    pub async fn on_search_result(&self, result: SearchResult) -> Result<SearchOutcome, SessionError> {
        flow::search::<E, _>(&mut self.clone(), result).await
    }

    /// Replay persisted cities at mount time.
    pub async fn restore_sessions(
        &self,
        results: impl IntoIterator<Item = SearchResult>,
    ) -> RestoreReport {
        flow::restore::<E, _>(&mut self.clone(), results).await
    }

    /// Select a postal code, drawing its city first if needed.
    pub async fn select_suburban_zip<P: SearchProvider + ?Sized>(
        &self,
        zip: &str,
        provider: &P,
    ) -> Result<Option<StatusChange>, SessionError> {
        flow::select_suburban::<E, _, P>(&mut self.clone(), zip, provider).await
    }
}

impl<E: MapEngine> MapAccess<E> for SharedMap<E> {
    fn with_map<R>(&mut self, f: impl FnOnce(&mut ServiceAreaMap<E>) -> R) -> R {
        self.with(f)
    }
}
