// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Postal-code resolution from feature properties.

use serde_json::{Map, Value};

/// Property keys that carry a postal code in the data sources we see, in
/// priority order.
pub const ZCTA_PROPERTY_KEYS: [&str; 7] = [
    "ZCTA5CE10",
    "ZCTA5CE20",
    "ZCTA5",
    "GEOID10",
    "GEOID",
    "ZIP",
    "zip",
];

/// Resolve a five-digit postal code from feature properties.
///
/// The first key in [`ZCTA_PROPERTY_KEYS`] whose value has at least one digit
/// wins. Non-digits are stripped, short codes are left-padded with zeros and
/// long codes are truncated to five digits.
pub fn normalize_zip(properties: &Map<String, Value>) -> Option<String> {
    ZCTA_PROPERTY_KEYS.iter().find_map(|key| {
        let raw = match properties.get(*key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let mut zip = format!("{digits:0>5}");
        zip.truncate(5);
        Some(zip)
    })
}
