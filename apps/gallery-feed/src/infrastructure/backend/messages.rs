//! Gallery Wire Messages
//!
//! JSON shapes exchanged with the gallery backend.
//!
//! # Change Notification
//!
//! Pushed as a text frame on `/backend/ws`:
//!
//! ```json
//! {"added":[["2024/beach.jpg",1718000000000]],"removed":["old.jpg"]}
//! ```
//!
//! Both fields are optional; an absent or `null` field means empty.
//! Timestamps are Unix milliseconds.

use serde::{Deserialize, Serialize};

use crate::domain::gallery::{ItemName, Timestamp};

/// A timestamp as it may appear on the wire: integer or float milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Integral milliseconds (what the backend sends).
    Millis(i64),
    /// Fractional milliseconds.
    Fractional(f64),
}

impl WireTimestamp {
    /// Convert to whole milliseconds, rejecting non-finite or out-of-range values.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn to_millis(self) -> Option<Timestamp> {
        match self {
            Self::Millis(millis) => Some(millis),
            Self::Fractional(value) => {
                let in_range =
                    value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64;
                in_range.then(|| value.floor() as i64)
            }
        }
    }
}

/// Change notification pushed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChangeMessage {
    /// `[name, timestamp]` pairs to add.
    #[serde(default)]
    pub added: Option<Vec<(ItemName, WireTimestamp)>>,
    /// Names to remove.
    #[serde(default)]
    pub removed: Option<Vec<ItemName>>,
}

/// Login request body for `/backend/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account name.
    pub username: &'a str,
    /// Plain-text password (sent over TLS).
    pub password: &'a str,
}
