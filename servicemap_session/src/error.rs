// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors from the search session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The map did not become ready within the readiness policy.
    #[error("map not ready after {attempts} attempts")]
    MapNotReady {
        /// Waits made before giving up.
        attempts: u32,
    },
    /// The map was torn down.
    #[error("map was torn down")]
    TornDown,
    /// A layer could not be added after every retry.
    #[error("layer `{layer}` for `{city_key}` failed after {attempts} attempts")]
    LayerFailed {
        /// City the layer belongs to.
        city_key: String,
        /// Layer that failed last.
        layer: String,
        /// Attempts made.
        attempts: u32,
    },
    /// A search provider failed.
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    /// Configuration could not be parsed.
    #[error("invalid map config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Error reported by a [`SearchProvider`](crate::SearchProvider).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SearchError(pub String);
