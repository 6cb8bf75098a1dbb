// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::{Deserialize, Serialize};

/// Selection state of one postal code.
///
/// ```text
/// available --add--> adding --confirm--> added
/// added --remove--> removing --confirm--> available
/// adding | removing --fail--> error --retry last action--> adding | removing
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipState {
    /// Not serviced.
    #[default]
    Available,
    /// Add requested, awaiting confirmation.
    Adding,
    /// Serviced.
    Added,
    /// Remove requested, awaiting confirmation.
    Removing,
    /// The last request failed; the same action may be retried.
    Error,
}

impl ZipState {
    /// The value written to the `status` feature property.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Adding => "adding",
            Self::Added => "added",
            Self::Removing => "removing",
            Self::Error => "error",
        }
    }

    /// Parse a `status` property value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "available" => Self::Available,
            "adding" => Self::Adding,
            "added" => Self::Added,
            "removing" => Self::Removing,
            "error" => Self::Error,
            _ => return None,
        })
    }

    /// Waiting on a confirmation.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Adding | Self::Removing)
    }

    /// A click can act on this state.
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Available | Self::Added)
    }

    /// The action a click on this state requests, if any.
    pub fn click_action(self) -> Option<ZipAction> {
        match self {
            Self::Available => Some(ZipAction::Add),
            Self::Added => Some(ZipAction::Remove),
            _ => None,
        }
    }
}

/// A requested change to a postal code's service status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipAction {
    /// Start servicing.
    Add,
    /// Stop servicing.
    Remove,
}

impl ZipAction {
    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    /// State shown while the action is in flight.
    pub fn pending_state(self) -> ZipState {
        match self {
            Self::Add => ZipState::Adding,
            Self::Remove => ZipState::Removing,
        }
    }

    /// State once the action is confirmed.
    pub fn confirmed_state(self) -> ZipState {
        match self {
            Self::Add => ZipState::Added,
            Self::Remove => ZipState::Available,
        }
    }

    /// State the action may start from, besides `error`.
    pub fn origin_state(self) -> ZipState {
        match self {
            Self::Add => ZipState::Available,
            Self::Remove => ZipState::Added,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip_through_serde() {
        for state in [
            ZipState::Available,
            ZipState::Adding,
            ZipState::Added,
            ZipState::Removing,
            ZipState::Error,
        ] {
            assert_eq!(ZipState::parse(state.as_str()), Some(state));
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
        assert_eq!(ZipState::parse("pending"), None);
    }

    #[test]
    fn only_settled_states_are_clickable() {
        assert_eq!(ZipState::Available.click_action(), Some(ZipAction::Add));
        assert_eq!(ZipState::Added.click_action(), Some(ZipAction::Remove));
        assert_eq!(ZipState::Adding.click_action(), None);
        assert_eq!(ZipState::Error.click_action(), None);
    }
}
