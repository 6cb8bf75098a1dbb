// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Registry: an idempotent ledger of map layers.
//!
//! [`LayerRegistry`] translates logical layer intents into renderer calls and
//! is the only writer of rendering state. Its central guarantee is that
//! [`LayerRegistry::upsert`] on an id that is already added updates the layer in
//! place instead of adding a second copy, and that partial renderer failures
//! leave a record behind that the next call repairs.
//!
//! Postal-code layers are restyled by rewriting the `status` property of the
//! data snapshot each record keeps, so the single data-driven paint expression
//! from [`zcta_style`] does the rest. Layers added later pick up the right
//! colours without extra wiring.
//!
//! Layers are discovered with [`LayerRegistry::list`] by [`LayerKind`], never by
//! scanning id prefixes.

mod presets;
mod record;
mod registry;

pub use presets::{STATUS_PROPERTY, boundary_style, service_area_style, zcta_style};
pub use record::{LayerKind, LayerRecord};
pub use registry::LayerRegistry;
