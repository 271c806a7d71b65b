use core::str::FromStr;

use serde::{Deserialize, Serialize};

use orderflow_core::DomainError;

/// Order status lifecycle.
///
/// ```text
/// PENDING ──► PROCESSING ──► PROCESSED
///    │             │
///    └─────────────┴──────► FAILED
/// ```
///
/// Transitions only move forward. `PENDING → FAILED` exists for the forced
/// failure path when the `PROCESSING` write itself could not be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Failed)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Failed) | (Processing, Processed) | (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "PROCESSED" => Ok(OrderStatus::Processed),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Processed,
        OrderStatus::Failed,
    ];

    #[test]
    fn only_processed_and_failed_are_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn nothing_returns_to_pending() {
        for from in ALL {
            assert!(!from.can_transition_to(OrderStatus::Pending));
        }
    }

    #[test]
    fn processed_is_only_reachable_from_processing() {
        for from in ALL {
            assert_eq!(
                from.can_transition_to(OrderStatus::Processed),
                from == OrderStatus::Processing
            );
        }
    }

    #[test]
    fn string_form_matches_serde_form() {
        for s in ALL {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("processing".parse::<OrderStatus>().is_err());
    }
}
