// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logging setup for the servicemap crates.
//!
//! Logs go to stdout through a `tracing-subscriber` fmt layer.
//!
//! ## Environment Variables
//!
//! 1. **`SERVICEMAP_LOG`** (highest priority). A bare level such as `debug`
//!    applies to every servicemap crate; anything containing `=`, `:` or `,`
//!    is used as a filter directive as-is.
//! 2. **`RUST_LOG`**, used as-is.
//! 3. **Default**: `warn` globally, `info` for servicemap crates.

use std::env;

use tracing_subscriber::EnvFilter;

/// Error returned when a subscriber cannot be installed.
pub type LogError = Box<dyn std::error::Error + Send + Sync>;

/// Crates that a bare `SERVICEMAP_LOG` level applies to.
const CRATES: &[&str] = &[
    "servicemap_geo",
    "servicemap_render",
    "servicemap_registry",
    "servicemap_selection",
    "servicemap_interaction",
    "servicemap_session",
    "service_area_walkthrough",
];

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed or a filter directive
/// does not parse.
pub fn init() -> Result<(), LogError> {
    let filter = EnvFilter::try_new(filter_directives(
        env::var("SERVICEMAP_LOG").ok().as_deref(),
        env::var("RUST_LOG").ok().as_deref(),
    ))?;
    tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
    Ok(())
}

/// Initialize logging for tests.
///
/// Safe to call from every test; only the first call installs anything.
pub fn test() {
    let _ = init();
}

/// Filter directives for the given `SERVICEMAP_LOG` and `RUST_LOG` values.
pub fn filter_directives(servicemap_log: Option<&str>, rust_log: Option<&str>) -> String {
    if let Some(value) = servicemap_log.filter(|v| !v.trim().is_empty()) {
        if value.contains(['=', ':', ',']) {
            return value.to_owned();
        }
        return expand("warn", value);
    }
    if let Some(value) = rust_log.filter(|v| !v.trim().is_empty()) {
        return value.to_owned();
    }
    expand("warn", "info")
}

fn expand(global: &str, level: &str) -> String {
    let mut directives = global.to_owned();
    for krate in CRATES {
        directives.push(',');
        directives.push_str(krate);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}
