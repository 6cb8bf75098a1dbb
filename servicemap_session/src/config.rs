// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use serde::{Deserialize, Serialize};
use servicemap_geo::LngLat;
use servicemap_render::{FitOptions, MapOptions, MapStyle};

use crate::error::SessionError;

/// How long to wait for the map to become ready.
///
/// Each attempt waits for the next readiness change, bounded by the current
/// interval. The interval grows by `backoff_factor` up to `max_interval_ms`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    /// First interval.
    pub poll_interval_ms: u64,
    /// Growth per attempt.
    pub backoff_factor: f64,
    /// Interval cap.
    pub max_interval_ms: u64,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            backoff_factor: 1.5,
            max_interval_ms: 1000,
            max_attempts: 20,
        }
    }
}

impl ReadinessPolicy {
    /// Interval before attempt `attempt`, counting from 1.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The interval is clamped to at most max_interval_ms before conversion."
    )]
    pub fn interval(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let grown = self.poll_interval_ms as f64 * self.backoff_factor.max(1.0).powi(exponent);
        let capped = grown.min(self.max_interval_ms as f64).max(1.0);
        Duration::from_millis(capped.round() as u64)
    }
}

/// How often a failed city is retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts in total, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub delay_ms: u64,
    /// Added to the delay after each further failure.
    pub step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 200,
            step_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt`, counting from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let extra = self.step_ms.saturating_mul(u64::from(attempt.saturating_sub(1)));
        Duration::from_millis(self.delay_ms.saturating_add(extra))
    }
}

/// Map configuration.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Basemap.
    pub style: MapStyle,
    /// Initial centre, `{"lng": .., "lat": ..}`.
    pub center: LngLat,
    /// Initial zoom.
    pub zoom: f64,
    /// Whether pan/zoom gestures are enabled.
    pub interactive: bool,
    /// Zoom used when recentring on a searched city.
    pub city_zoom: f64,
    /// Camera fit options.
    pub fit: FitOptions,
    /// Readiness waiting.
    pub readiness: ReadinessPolicy,
    /// Retries for a city whose layers failed.
    pub layer_retry: RetryPolicy,
    /// Pause between recentring on a city and fitting its bounds.
    pub fit_delay_ms: u64,
    /// Pause between adding a neighbouring city and changing the selected
    /// code, so its polygons are on screen first.
    pub suburban_settle_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            style: MapStyle::default(),
            center: LngLat::new(-98.5795, 39.8283),
            zoom: 4.0,
            interactive: true,
            city_zoom: 11.0,
            fit: FitOptions::default(),
            readiness: ReadinessPolicy::default(),
            layer_retry: RetryPolicy::default(),
            fit_delay_ms: 100,
            suburban_settle_ms: 2000,
        }
    }
}

impl MapConfig {
    /// Parse a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Engine options for a map mounted in `container`.
    pub fn map_options(&self, container: &str) -> MapOptions {
        MapOptions {
            container: container.to_owned(),
            style: self.style.clone(),
            center: self.center,
            zoom: self.zoom,
            interactive: self.interactive,
        }
    }

    /// [`MapConfig::fit_delay_ms`] as a duration.
    pub fn fit_delay(&self) -> Duration {
        Duration::from_millis(self.fit_delay_ms)
    }

    /// [`MapConfig::suburban_settle_ms`] as a duration.
    pub fn suburban_settle(&self) -> Duration {
        Duration::from_millis(self.suburban_settle_ms)
    }
}
