//! Ledger: trade execution against shared cash and per-asset holdings.
//!
//! Execution conserves value at the execution price:
//! `cash_after + holdings_after * price == cash_before + holdings_before * price`.

use crate::domain::{Action, Decision, Fill, PortfolioState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TradeError {
    #[error("invalid close price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("invalid trade amount {amount}")]
    InvalidAmount { amount: f64 },

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
}

/// What to do when a Buy asks for more than the available cash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashPolicy {
    /// Reduce the buy to the cash on hand (never below zero cash).
    #[default]
    Clamp,
    /// Spend the full amount even if cash goes negative.
    AllowNegative,
}

/// Outcome of a single execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Execution {
    pub holdings: f64,
    pub cash: f64,
    /// Currency actually transacted.
    pub amount: f64,
    pub shares: f64,
    pub clamped: bool,
}

/// Execute a decision with no cash floor.
///
/// Returns `(new_holdings, new_cash)`.
pub fn execute(
    decision: Decision,
    holdings: f64,
    cash: f64,
    close: f64,
) -> Result<(f64, f64), TradeError> {
    let exec = execute_with_policy(decision, holdings, cash, close, CashPolicy::AllowNegative)?;
    Ok((exec.holdings, exec.cash))
}

/// Execute a decision under an explicit cash policy.
pub fn execute_with_policy(
    decision: Decision,
    holdings: f64,
    cash: f64,
    close: f64,
    policy: CashPolicy,
) -> Result<Execution, TradeError> {
    if !close.is_finite() || close <= 0.0 {
        return Err(TradeError::InvalidPrice {
            symbol: String::new(),
            price: close,
        });
    }
    if !decision.amount.is_finite() || decision.amount < 0.0 {
        return Err(TradeError::InvalidAmount {
            amount: decision.amount,
        });
    }

    match decision.action {
        Action::Hold => Ok(Execution {
            holdings,
            cash,
            amount: 0.0,
            shares: 0.0,
            clamped: false,
        }),
        Action::Buy => {
            let (amount, clamped) = match policy {
                CashPolicy::AllowNegative => (decision.amount, false),
                CashPolicy::Clamp => {
                    let available = cash.max(0.0);
                    if decision.amount > available {
                        (available, true)
                    } else {
                        (decision.amount, false)
                    }
                }
            };
            let shares = amount / close;
            Ok(Execution {
                holdings: holdings + shares,
                cash: cash - amount,
                amount,
                shares,
                clamped,
            })
        }
        Action::Sell => {
            let requested_shares = decision.amount / close;
            // Never sell more than is held.
            let shares = requested_shares.min(holdings.max(0.0));
            let amount = if shares < requested_shares {
                shares * close
            } else {
                decision.amount
            };
            Ok(Execution {
                holdings: (holdings - shares).max(0.0),
                cash: cash + amount,
                amount,
                shares,
                clamped: false,
            })
        }
    }
}

/// Owns the portfolio state for one run and applies decisions to it.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: PortfolioState,
    cash_policy: CashPolicy,
    clamped_buys: usize,
}

impl Ledger {
    pub fn new<S: AsRef<str>>(initial_capital: f64, symbols: &[S], cash_policy: CashPolicy) -> Self {
        Self {
            state: PortfolioState::new(initial_capital, symbols),
            cash_policy,
            clamped_buys: 0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn holdings(&self, symbol: &str) -> f64 {
        self.state.holdings_of(symbol)
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn cash_policy(&self) -> CashPolicy {
        self.cash_policy
    }

    pub fn clamped_buys(&self) -> usize {
        self.clamped_buys
    }

    pub fn into_state(self) -> PortfolioState {
        self.state
    }

    /// Apply a decision to one asset at `close`.
    ///
    /// Returns `Ok(None)` for a Hold or a buy clamped to nothing.
    pub fn apply(
        &mut self,
        symbol: &str,
        decision: Decision,
        close: f64,
        day: usize,
        date: Option<NaiveDate>,
    ) -> Result<Option<Fill>, TradeError> {
        let holdings = *self
            .state
            .holdings
            .get(symbol)
            .ok_or_else(|| TradeError::UnknownSymbol(symbol.to_string()))?;

        let exec = execute_with_policy(decision, holdings, self.state.cash, close, self.cash_policy)
            .map_err(|e| match e {
                TradeError::InvalidPrice { price, .. } => TradeError::InvalidPrice {
                    symbol: symbol.to_string(),
                    price,
                },
                other => other,
            })?;

        if exec.clamped {
            self.clamped_buys += 1;
            tracing::warn!(
                symbol,
                day,
                requested = decision.amount,
                spent = exec.amount,
                "buy clamped to available cash"
            );
        }

        self.state.cash = exec.cash;
        self.state.holdings.insert(symbol.to_string(), exec.holdings);

        if decision.is_hold() || exec.shares == 0.0 {
            return Ok(None);
        }

        Ok(Some(Fill {
            day,
            date,
            symbol: symbol.to_string(),
            action: decision.action,
            amount: exec.amount,
            requested: decision.amount,
            shares: exec.shares,
            price: close,
            holdings_after: exec.holdings,
            cash_after: exec.cash,
            clamped: exec.clamped,
        }))
    }
}
