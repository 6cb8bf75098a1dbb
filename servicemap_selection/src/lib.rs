// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Servicemap Selection: which postal codes are serviced, and which are on their way.
//!
//! [`ZipSelectionController`] keeps one [`ZipStatus`] per postal code ever
//! seen. Toggles are optimistic and reconciled later: an accepted toggle flips
//! the code to `adding`/`removing`, sends a [`ZipCommand`] on the outbound
//! channel and waits for [`ZipSelectionController::resolve`] with the ticket.
//! The authoritative `zip → state` mapping can be applied at any time with
//! [`ZipSelectionController::sync_statuses`].
//!
//! # Example
//!
//! ```rust
//! use servicemap_selection::{Outcome, ZipAction, ZipSelectionController, ZipState};
//!
//! let (mut zips, mut commands) = ZipSelectionController::with_channel();
//! zips.toggle("55401", ZipAction::Add);
//! // Clicking again mid-flight does nothing.
//! assert!(zips.toggle("55401", ZipAction::Add).is_none());
//!
//! let cmd = commands.try_recv().unwrap();
//! zips.resolve(cmd.ticket, Outcome::Confirmed);
//! assert_eq!(zips.state("55401"), ZipState::Added);
//! ```

mod controller;
mod state;

pub use controller::{
    Outcome, StatusChange, Ticket, ZipCommand, ZipCounts, ZipSelectionController, ZipStatus,
};
pub use state::{ZipAction, ZipState};
