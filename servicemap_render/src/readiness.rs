// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-phase readiness published as a one-shot event.

use std::sync::Arc;

use tokio::sync::watch;

/// Readiness of a mounted map.
///
/// Sources and layers may only be mutated once both `loaded` and
/// `style_loaded` hold. `torn_down` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Base assets are ready.
    pub loaded: bool,
    /// The style is ready; sources and layers may be mutated.
    pub style_loaded: bool,
    /// The map was torn down. No further mutation will ever succeed.
    pub torn_down: bool,
}

impl Readiness {
    /// Both phases reported and not torn down.
    pub fn is_ready(&self) -> bool {
        self.loaded && self.style_loaded && !self.torn_down
    }
}

/// Shared handle for reporting and observing [`Readiness`].
///
/// Hosts clone this to report the engine's `load` and `style.load` events;
/// anything that needs to wait calls [`ReadinessSignal::subscribe`]. All clones
/// publish to the same channel.
#[derive(Clone, Debug)]
pub struct ReadinessSignal {
    tx: Arc<watch::Sender<Readiness>>,
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSignal {
    /// A fresh signal with nothing reported yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::default());
        Self { tx: Arc::new(tx) }
    }

    /// Report the engine's `load` event. Ignored after teardown.
    pub fn mark_loaded(&self) {
        self.tx.send_if_modified(|r| {
            let changed = !r.torn_down && !r.loaded;
            if changed {
                r.loaded = true;
            }
            changed
        });
    }

    /// Report the engine's `style.load` event. Ignored after teardown.
    pub fn mark_style_loaded(&self) {
        self.tx.send_if_modified(|r| {
            let changed = !r.torn_down && !r.style_loaded;
            if changed {
                r.style_loaded = true;
            }
            changed
        });
    }

    pub(crate) fn mark_torn_down(&self) {
        self.tx.send_modify(|r| {
            r.loaded = false;
            r.style_loaded = false;
            r.torn_down = true;
        });
    }

    /// Current readiness.
    pub fn current(&self) -> Readiness {
        *self.tx.borrow()
    }

    /// Subscribe to readiness changes.
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.tx.subscribe()
    }
}
