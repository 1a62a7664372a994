//! Performance metrics: pure functions over a finished simulation.
//!
//! The equity curve used here is total portfolio value (cash plus holdings)
//! with the initial capital prepended as day zero, so the first day's trading
//! shows up as a return.

use probsim_core::engine::SimulationResult;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trading_days: usize,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub final_net_value: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub hold_count: usize,
    pub skip_count: usize,
    pub fill_count: usize,
    pub clamped_buys: usize,
}

impl PerformanceMetrics {
    pub fn compute(result: &SimulationResult, initial_capital: f64) -> Self {
        let curve = equity_curve(result, initial_capital);
        let final_cash = result
            .steps
            .last()
            .map_or(result.final_state.cash, |s| s.cash);
        let final_equity = curve.last().copied().unwrap_or(initial_capital);

        Self {
            trading_days: result.day_count(),
            total_return: total_return(&curve),
            max_drawdown: max_drawdown(&curve),
            sharpe: sharpe_ratio(&curve),
            sortino: sortino_ratio(&curve),
            final_cash,
            final_equity,
            final_net_value: result.final_net_value(),
            buy_count: result.actions.buy,
            sell_count: result.actions.sell,
            hold_count: result.actions.hold,
            skip_count: result.skips.len(),
            fill_count: result.fills.len(),
            clamped_buys: result.clamped_buys,
        }
    }
}

/// Initial capital followed by the daily portfolio value.
pub fn equity_curve(result: &SimulationResult, initial_capital: f64) -> Vec<f64> {
    let mut curve = Vec::with_capacity(result.day_count() + 1);
    curve.push(initial_capital);
    curve.extend(result.steps.iter().map(|s| s.net_value + initial_capital));
    curve
}

// ─── Individual metric functions ────────────────────────────────────

/// (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (-0.15 is a 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Annualized Sharpe ratio of daily returns, zero risk-free rate.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio. Zero when there is no downside.
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
