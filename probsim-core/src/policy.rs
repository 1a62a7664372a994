//! Decision policy: probability pair in, sized action out.
//!
//! Bands are evaluated in a fixed order and the first match wins. Up-signals
//! are always checked before down-signals:
//!
//! 1. `p_up > strong_threshold` → Buy `strong_fraction` of the allocation
//! 2. `p_up > up_threshold` → Buy `base_fraction` of the allocation
//! 3. `p_down > strong_threshold` → Sell `strong_fraction` of the holdings value
//! 4. `p_down > down_threshold` → Sell `base_fraction` of the holdings value
//! 5. otherwise Hold
//!
//! All comparisons are strict. The pair is not validated: a model may emit
//! a distribution that does not sum to one.

use crate::domain::Decision;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("strong_threshold ({strong}) must not be below {name} ({value})")]
    StrongBelowBase {
        name: &'static str,
        value: f64,
        strong: f64,
    },
}

/// Threshold and sizing constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub up_threshold: f64,
    pub down_threshold: f64,
    pub strong_threshold: f64,
    pub strong_fraction: f64,
    pub base_fraction: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            up_threshold: 0.6,
            down_threshold: 0.6,
            strong_threshold: 0.8,
            strong_fraction: 0.3,
            base_fraction: 0.1,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let fields = [
            ("up_threshold", self.up_threshold),
            ("down_threshold", self.down_threshold),
            ("strong_threshold", self.strong_threshold),
            ("strong_fraction", self.strong_fraction),
            ("base_fraction", self.base_fraction),
        ];
        for (name, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::OutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("up_threshold", self.up_threshold),
            ("down_threshold", self.down_threshold),
        ] {
            if self.strong_threshold < value {
                return Err(PolicyError::StrongBelowBase {
                    name,
                    value,
                    strong: self.strong_threshold,
                });
            }
        }
        Ok(())
    }
}

/// Stateless decision policy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionPolicy {
    config: PolicyConfig,
}

impl DecisionPolicy {
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Map a probability pair to a decision.
    ///
    /// `allocation` is the currency a Buy may draw on. `holdings_value` is the
    /// current holdings marked at today's close; a Sell liquidates a fraction
    /// of it.
    pub fn decide(
        &self,
        allocation: f64,
        prob_down: f64,
        prob_up: f64,
        holdings_value: f64,
    ) -> Decision {
        let c = &self.config;
        let allocation = allocation.max(0.0);
        let holdings_value = holdings_value.max(0.0);

        if prob_up > c.strong_threshold {
            Decision::buy(c.strong_fraction * allocation)
        } else if prob_up > c.up_threshold {
            Decision::buy(c.base_fraction * allocation)
        } else if prob_down > c.strong_threshold {
            Decision::sell(c.strong_fraction * holdings_value)
        } else if prob_down > c.down_threshold {
            Decision::sell(c.base_fraction * holdings_value)
        } else {
            Decision::hold()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;

    fn policy() -> DecisionPolicy {
        DecisionPolicy::default()
    }

    #[test]
    fn strong_up_buys_thirty_percent() {
        let d = policy().decide(250.0, 0.05, 0.95, 0.0);
        assert_eq!(d.action, Action::Buy);
        assert!((d.amount - 75.0).abs() < 1e-12);
    }

    #[test]
    fn strong_up_ignores_down_probability() {
        let d = policy().decide(100.0, 0.99, 0.81, 500.0);
        assert_eq!(d.action, Action::Buy);
        assert!((d.amount - 30.0).abs() < 1e-12);
    }

    #[test]
    fn moderate_up_buys_ten_percent() {
        let d = policy().decide(100.0, 0.3, 0.7, 0.0);
        assert_eq!(d.action, Action::Buy);
        assert!((d.amount - 10.0).abs() < 1e-12);
    }

    #[test]
    fn up_exactly_at_strong_threshold_is_moderate() {
        let d = policy().decide(100.0, 0.2, 0.8, 0.0);
        assert_eq!(d.action, Action::Buy);
        assert!((d.amount - 10.0).abs() < 1e-12);
    }

    #[test]
    fn up_exactly_at_threshold_holds() {
        let d = policy().decide(100.0, 0.4, 0.6, 50.0);
        assert_eq!(d, Decision::hold());
    }

    #[test]
    fn strong_down_sells_thirty_percent_of_value() {
        let d = policy().decide(100.0, 0.9, 0.1, 400.0);
        assert_eq!(d.action, Action::Sell);
        assert!((d.amount - 120.0).abs() < 1e-12);
    }

    #[test]
    fn moderate_down_sells_ten_percent_of_value() {
        let d = policy().decide(100.0, 0.65, 0.35, 400.0);
        assert_eq!(d.action, Action::Sell);
        assert!((d.amount - 40.0).abs() < 1e-12);
    }

    #[test]
    fn down_exactly_at_threshold_holds() {
        let d = policy().decide(100.0, 0.6, 0.4, 400.0);
        assert!(d.is_hold());
    }

    #[test]
    fn sell_with_no_holdings_has_zero_amount() {
        let d = policy().decide(100.0, 0.95, 0.05, 0.0);
        assert_eq!(d.action, Action::Sell);
        assert_eq!(d.amount, 0.0);
    }

    #[test]
    fn negative_allocation_is_floored() {
        let d = policy().decide(-50.0, 0.0, 0.9, 0.0);
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.amount, 0.0);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let config = PolicyConfig {
            up_threshold: 1.5,
            ..PolicyConfig::default()
        };
        assert!(matches!(
            DecisionPolicy::new(config),
            Err(PolicyError::OutOfRange { name: "up_threshold", .. })
        ));
    }

    #[test]
    fn validate_rejects_strong_below_base() {
        let config = PolicyConfig {
            strong_threshold: 0.5,
            ..PolicyConfig::default()
        };
        assert!(matches!(
            DecisionPolicy::new(config),
            Err(PolicyError::StrongBelowBase { .. })
        ));
    }

    #[test]
    fn custom_thresholds_respected() {
        let config = PolicyConfig {
            up_threshold: 0.55,
            ..PolicyConfig::default()
        };
        let policy = DecisionPolicy::new(config).unwrap();
        assert_eq!(policy.decide(100.0, 0.4, 0.56, 0.0).action, Action::Buy);
        assert!(DecisionPolicy::default().decide(100.0, 0.4, 0.56, 0.0).is_hold());
    }
}
