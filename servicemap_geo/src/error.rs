// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors from geometry computations on malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoError {
    /// The geometry contained no usable positions.
    #[error("geometry has no usable coordinates")]
    NoCoordinates,
    /// The geometry type cannot be used for the requested operation.
    #[error("unsupported geometry type `{0}`")]
    UnsupportedGeometry(String),
}
