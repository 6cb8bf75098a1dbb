// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{ZipAction, ZipState};

/// Identifies one in-flight command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// A transition emitted outward for the persistence side to carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZipCommand {
    /// Postal code.
    pub zip: String,
    /// Requested action.
    pub action: ZipAction,
    /// Ticket to resolve the command with.
    pub ticket: Ticket,
}

/// How a command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The persistence side applied the action.
    Confirmed,
    /// The persistence side rejected or failed the action.
    Failed,
}

/// A state change the caller should restyle for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// Postal code.
    pub zip: String,
    /// Previous state.
    pub from: ZipState,
    /// New state.
    pub to: ZipState,
}

/// Selection status of one postal code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZipStatus {
    /// Postal code.
    pub code: String,
    /// Current state.
    pub state: ZipState,
    /// Last action attempted, used to decide what a retry from `error` does.
    pub last_action: Option<ZipAction>,
    in_flight: Option<(ZipAction, Ticket)>,
}

impl ZipStatus {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_owned(),
            state: ZipState::Available,
            last_action: None,
            in_flight: None,
        }
    }

    /// The command awaiting resolution, if any.
    pub fn in_flight(&self) -> Option<(ZipAction, Ticket)> {
        self.in_flight
    }

    fn accepts(&self, action: ZipAction) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        match self.state {
            ZipState::Error => self.last_action.is_none_or(|last| last == action),
            state => state == action.origin_state(),
        }
    }
}

/// Tally of states over a set of postal codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZipCounts {
    /// Serviced.
    pub added: usize,
    /// Not serviced.
    pub available: usize,
    /// Awaiting confirmation.
    pub in_flight: usize,
    /// Failed.
    pub error: usize,
}

/// Per-postal-code selection state machine.
///
/// Transitions are optimistic: an accepted [`toggle`](Self::toggle) flips the
/// code to `adding`/`removing` at once and emits a [`ZipCommand`]. The code
/// then has exactly one command in flight, and further toggles are ignored
/// until [`resolve`](Self::resolve) or [`sync_statuses`](Self::sync_statuses)
/// settles it.
#[derive(Debug, Default)]
pub struct ZipSelectionController {
    entries: BTreeMap<String, ZipStatus>,
    pending: BTreeMap<Ticket, String>,
    next_ticket: u64,
    outbound: Option<mpsc::UnboundedSender<ZipCommand>>,
}

impl ZipSelectionController {
    /// A controller with no outbound channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller and the receiving end of its command channel.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<ZipCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut controller = Self::new();
        controller.outbound = Some(tx);
        (controller, rx)
    }

    /// Replace the outbound command channel.
    pub fn set_outbound(&mut self, tx: mpsc::UnboundedSender<ZipCommand>) {
        self.outbound = Some(tx);
    }

    /// Make sure `zip` has an entry and return its state.
    pub fn register(&mut self, zip: &str) -> ZipState {
        self.entry(zip).state
    }

    fn entry(&mut self, zip: &str) -> &mut ZipStatus {
        self.entries
            .entry(zip.to_owned())
            .or_insert_with(|| ZipStatus::new(zip))
    }

    /// Current state; unknown codes are `available`.
    pub fn state(&self, zip: &str) -> ZipState {
        self.entries.get(zip).map_or(ZipState::Available, |e| e.state)
    }

    /// Full status of a known code.
    pub fn get(&self, zip: &str) -> Option<&ZipStatus> {
        self.entries.get(zip)
    }

    /// All known codes in order.
    pub fn iter(&self) -> impl Iterator<Item = &ZipStatus> + '_ {
        self.entries.values()
    }

    /// Number of known codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no code is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Request `action` for `zip`.
    ///
    /// `add` is accepted from `available`, `remove` from `added`, and either
    /// from `error` when it repeats the last attempted action. Anything else,
    /// including a toggle while a command is in flight, is ignored and
    /// returns `None`.
    pub fn toggle(&mut self, zip: &str, action: ZipAction) -> Option<StatusChange> {
        let ticket = Ticket(self.next_ticket);
        let entry = self.entry(zip);
        if !entry.accepts(action) {
            debug!(
                zip,
                action = action.as_str(),
                state = entry.state.as_str(),
                "toggle ignored"
            );
            return None;
        }
        let from = entry.state;
        entry.state = action.pending_state();
        entry.last_action = Some(action);
        entry.in_flight = Some((action, ticket));
        let to = entry.state;

        self.next_ticket += 1;
        self.pending.insert(ticket, zip.to_owned());
        self.emit(ZipCommand {
            zip: zip.to_owned(),
            action,
            ticket,
        });
        debug!(zip, action = action.as_str(), ticket = ticket.0, "toggle accepted");
        Some(StatusChange {
            zip: zip.to_owned(),
            from,
            to,
        })
    }

    fn emit(&self, command: ZipCommand) {
        let Some(tx) = &self.outbound else {
            return;
        };
        if let Err(err) = tx.send(command) {
            warn!(zip = %err.0.zip, "command channel closed, command dropped");
        }
    }

    /// Add every code that is currently `available`.
    ///
    /// Each code is handled on its own; codes in any other state are skipped
    /// without affecting the rest.
    pub fn bulk_add<'a>(&mut self, zips: impl IntoIterator<Item = &'a str>) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for zip in zips {
            if self.state(zip) != ZipState::Available {
                continue;
            }
            changes.extend(self.toggle(zip, ZipAction::Add));
        }
        info!(added = changes.len(), "bulk add");
        changes
    }

    /// Settle the command behind `ticket`.
    ///
    /// Unknown and superseded tickets are ignored.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Outcome) -> Option<StatusChange> {
        let Some(zip) = self.pending.remove(&ticket) else {
            debug!(ticket = ticket.0, "stale ticket ignored");
            return None;
        };
        let entry = self.entries.get_mut(&zip)?;
        let (action, _) = entry.in_flight.filter(|(_, t)| *t == ticket)?;
        entry.in_flight = None;
        let from = entry.state;
        entry.state = match outcome {
            Outcome::Confirmed => action.confirmed_state(),
            Outcome::Failed => ZipState::Error,
        };
        match outcome {
            Outcome::Confirmed => {
                debug!(zip = zip.as_str(), action = action.as_str(), "command confirmed");
            }
            Outcome::Failed => warn!(zip = zip.as_str(), action = action.as_str(), "command failed"),
        }
        Some(StatusChange {
            zip,
            from,
            to: entry.state,
        })
    }

    /// Apply the authoritative `zip → state` mapping.
    ///
    /// Any in-flight command on a code whose state changes is dropped; its
    /// ticket becomes stale.
    pub fn sync_statuses<'a>(
        &mut self,
        mapping: impl IntoIterator<Item = (&'a str, ZipState)>,
    ) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for (zip, state) in mapping {
            let entry = self.entry(zip);
            if entry.state == state {
                continue;
            }
            let from = entry.state;
            entry.state = state;
            if let Some((_, ticket)) = entry.in_flight.take() {
                self.pending.remove(&ticket);
            }
            changes.push(StatusChange {
                zip: zip.to_owned(),
                from,
                to: state,
            });
        }
        if !changes.is_empty() {
            debug!(changed = changes.len(), "statuses synced");
        }
        changes
    }

    /// Tally the states of `zips`.
    pub fn counts<'a>(&self, zips: impl IntoIterator<Item = &'a str>) -> ZipCounts {
        let mut counts = ZipCounts::default();
        for zip in zips {
            match self.state(zip) {
                ZipState::Added => counts.added += 1,
                ZipState::Available => counts.available += 1,
                ZipState::Adding | ZipState::Removing => counts.in_flight += 1,
                ZipState::Error => counts.error += 1,
            }
        }
        counts
    }
}
