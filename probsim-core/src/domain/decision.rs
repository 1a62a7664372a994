use serde::{Deserialize, Serialize};
use std::fmt;

/// What the policy wants to do with one asset today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Hold => "Hold",
        };
        write!(f, "{s}")
    }
}

/// An action plus its currency amount.
///
/// For `Buy` the amount is currency to spend. For `Sell` it is the
/// currency-equivalent of holdings to liquidate. Always `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub amount: f64,
}

impl Decision {
    pub fn buy(amount: f64) -> Self {
        Self {
            action: Action::Buy,
            amount,
        }
    }

    pub fn sell(amount: f64) -> Self {
        Self {
            action: Action::Sell,
            amount,
        }
    }

    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            amount: 0.0,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}
