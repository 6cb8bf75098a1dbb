// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint presets for the layer kinds.
//!
//! Postal-code polygons are styled by a single data-driven expression keyed on
//! each feature's `status` property, with a hover variant driven by the
//! `hover` feature state. Restyling is therefore a data update; no per-feature
//! paint is ever set.

use servicemap_render::{Expression, PaintValue, StyleConfig};

/// Feature property the zcta paint is keyed on.
pub const STATUS_PROPERTY: &str = "status";

fn hovered() -> Expression {
    Expression::boolean(Expression::feature_state("hover"), false)
}

fn by_status(
    added: impl Into<PaintValue>,
    adding: impl Into<PaintValue>,
    removing: impl Into<PaintValue>,
    error: impl Into<PaintValue>,
    available: impl Into<PaintValue>,
) -> Expression {
    Expression::match_str(
        Expression::get(STATUS_PROPERTY),
        [
            ("added", added.into()),
            ("adding", adding.into()),
            ("removing", removing.into()),
            ("error", error.into()),
        ],
        available,
    )
}

fn hover_or(on_hover: impl Into<PaintValue>, otherwise: impl Into<PaintValue>) -> PaintValue {
    Expression::case([(hovered(), on_hover.into())], otherwise).into()
}

/// Municipal boundary: faint blue fill, solid blue outline.
pub fn boundary_style() -> StyleConfig {
    StyleConfig {
        fill_color: "#3b82f6".into(),
        fill_opacity: 0.1.into(),
        stroke_color: "#2563eb".into(),
        stroke_width: 3.0.into(),
        stroke_opacity: 1.0.into(),
    }
}

/// Postal-code polygons coloured by selection status.
pub fn zcta_style() -> StyleConfig {
    StyleConfig {
        fill_color: hover_or(
            by_status("#dc2626", "#84cc16", "#f59e0b", "#ef4444", "#22c55e"),
            by_status("#22c55e", "#84cc16", "#f59e0b", "#ef4444", "#e5e7eb"),
        ),
        fill_opacity: hover_or(0.8, by_status(0.6, 0.4, 0.4, 0.4, 0.3)),
        stroke_color: hover_or(
            by_status("#b91c1c", "#65a30d", "#d97706", "#dc2626", "#16a34a"),
            by_status("#16a34a", "#65a30d", "#d97706", "#dc2626", "#9ca3af"),
        ),
        stroke_width: hover_or(3.0, 2.0),
        stroke_opacity: 0.8.into(),
    }
}

/// Existing service areas.
pub fn service_area_style() -> StyleConfig {
    StyleConfig {
        fill_color: "#22c55e".into(),
        fill_opacity: 0.5.into(),
        stroke_color: "#16a34a".into(),
        stroke_width: 2.0.into(),
        stroke_opacity: 1.0.into(),
    }
}
