// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Session: cumulative city searches on a service-area map.
//!
//! [`SearchSessionManager`] turns search results into a boundary layer and a
//! postal-code layer per city. Cities accumulate; a repeated result is a
//! no-op, which also makes restoring sessions safe to run on every mount.
//! Before touching layers a search waits for the map's readiness event with
//! bounded backoff, and gives up with [`SessionError::MapNotReady`] instead
//! of polling forever.
//!
//! [`ServiceAreaMap`] is the handle a host holds: it owns the registry, the
//! selection controller, the interaction layer and the sessions, and restyles
//! every postal-code layer after each status change. Its async operations
//! borrow it until they finish; [`SharedMap`] runs the same operations while
//! leaving the map free for input between their steps.
//!
//! # Example
//!
//! ```rust
//! use servicemap_render::HeadlessEngine;
//! use servicemap_session::{MapConfig, ServiceAreaMap};
//!
//! let (mut map, _commands) = ServiceAreaMap::new(HeadlessEngine::new(), MapConfig::default());
//! assert!(map.mount("map"));
//! assert!(!map.mount("map"), "mounting twice is a no-op");
//!
//! let signal = map.readiness_signal();
//! signal.mark_loaded();
//! signal.mark_style_loaded();
//! assert!(map.registry().renderer().is_ready());
//! ```

mod config;
mod error;
mod flow;
mod manager;
mod map;
mod search;
mod shared;

#[cfg(test)]
mod test_support;

pub use config::{MapConfig, ReadinessPolicy, RetryPolicy};
pub use error::{SearchError, SessionError};
pub use manager::{
    RestoreReport, SEARCH_ID_PROPERTY, SERVICE_AREA_LAYER, SearchOutcome, SearchSessionManager,
    SessionContext, wait_until_ready,
};
pub use map::ServiceAreaMap;
pub use shared::SharedMap;
pub use search::{
    SearchCriteria, SearchMap, SearchProvider, SearchResult, SearchSession, boundary_layer_id,
    city_key, zcta_layer_id,
};
