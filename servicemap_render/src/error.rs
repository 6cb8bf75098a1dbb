// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors raised at the render primitive boundary.
///
/// The renderer catches all of these and reports a boolean instead; they only
/// surface to code that drives a [`MapEngine`](crate::MapEngine) directly.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine has not been created, or has been destroyed.
    #[error("map engine is not created")]
    NotCreated,
    /// A source with this id already exists.
    #[error("source `{0}` already exists")]
    SourceExists(String),
    /// No source with this id.
    #[error("source `{0}` does not exist")]
    SourceMissing(String),
    /// A layer with this id already exists.
    #[error("layer `{0}` already exists")]
    LayerExists(String),
    /// No layer with this id.
    #[error("layer `{0}` does not exist")]
    LayerMissing(String),
    /// The feature id does not name a feature of the source.
    #[error("feature {feature} not found in source `{source_id}`")]
    FeatureMissing {
        /// Source the lookup was made against.
        source_id: String,
        /// Generated feature id.
        feature: u64,
    },
    /// The engine refused the operation for its own reasons.
    #[error("{op} failed: {reason}")]
    Rejected {
        /// Name of the failing operation.
        op: &'static str,
        /// Human readable reason.
        reason: String,
    },
}
