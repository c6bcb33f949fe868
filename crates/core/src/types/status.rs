//! Order lifecycle state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a string is not one of the four order states.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order state '{0}' (expected one of Pending, Processing, Delivered, Cancelled)")]
pub struct OrderStateError(pub String);

/// Lifecycle state of a customer order.
///
/// Every state is reachable from every other state; the owner moves orders
/// around freely from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OrderState {
    #[default]
    Pending,
    Processing,
    Delivered,
    Cancelled,
}

impl OrderState {
    /// All states, in dashboard display order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Canonical name, as stored and sent over the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = OrderStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| OrderStateError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(OrderState::default(), OrderState::Pending);
    }

    #[test]
    fn test_parse_accepts_the_four_states() {
        for state in OrderState::ALL {
            assert_eq!(state.as_str().parse::<OrderState>().unwrap(), state);
        }
    }

    #[test]
    fn test_parse_rejects_anything_else() {
        for bad in ["", "pending", "Shipped", "DELIVERED", " Pending"] {
            assert_eq!(
                bad.parse::<OrderState>(),
                Err(OrderStateError(bad.to_owned()))
            );
        }
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&OrderState::Cancelled).unwrap();
        assert_eq!(json, "\"Cancelled\"");
        assert!(serde_json::from_str::<OrderState>("\"Lost\"").is_err());
    }
}
