//! Day-by-day simulation loop.
//!
//! For each day, for each asset in configured order:
//!
//! 1. Fetch the snapshot; validate the close
//! 2. Build the ordered feature vector
//! 3. Ask the asset's model for `(down, up)`
//! 4. Decide, sizing buys off the start-of-day cash snapshot
//! 5. Execute through the ledger and record the holdings value
//!
//! Any failure skips the asset for that day: holdings stay put and the
//! previously recorded value carries forward. A trade the ledger rejects is a
//! skip too. Other assets are unaffected.

use super::state::{
    ActionCounts, EngineConfig, EngineError, SimulationResult, SkipEvent, SkipReason,
    TrackedAsset,
};
use crate::data::MarketSnapshotProvider;
use crate::domain::{AssetValue, DailyRecord, SimulationStep};
use crate::features::FeatureSchema;
use crate::ledger::Ledger;
use crate::model::ModelError;
use crate::policy::DecisionPolicy;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Last recorded value and last valid close of one asset.
#[derive(Debug, Clone, Copy, Default)]
struct Carry {
    value: f64,
    close: Option<f64>,
}

/// A validated, reusable simulation setup.
///
/// `run` borrows the engine immutably and builds fresh portfolio state each
/// time, so one engine can be run against several providers.
#[derive(Debug)]
pub struct SimulationEngine {
    config: EngineConfig,
    policy: DecisionPolicy,
    assets: Vec<TrackedAsset>,
    schema: FeatureSchema,
}

impl SimulationEngine {
    pub fn new(
        config: EngineConfig,
        assets: Vec<TrackedAsset>,
        schema: FeatureSchema,
    ) -> Result<Self, EngineError> {
        if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
            return Err(EngineError::NonPositiveCapital(config.initial_capital));
        }
        if config.sample_size == Some(0) {
            return Err(EngineError::ZeroSampleSize);
        }
        if assets.is_empty() {
            return Err(EngineError::NoAssets);
        }
        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.symbol.as_str()) {
                return Err(EngineError::DuplicateSymbol(asset.symbol.clone()));
            }
        }
        if schema.is_empty() {
            return Err(EngineError::EmptyFeatureSchema);
        }
        if let Some(name) = schema.duplicate() {
            return Err(EngineError::DuplicateFeature(name.to_string()));
        }
        let policy = DecisionPolicy::new(config.policy)?;

        Ok(Self {
            config,
            policy,
            assets,
            schema,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    /// Run the simulation over every day the provider offers (or the last
    /// `sample_size` of them).
    pub fn run(&self, provider: &dyn MarketSnapshotProvider) -> Result<SimulationResult, EngineError> {
        let available = provider.day_count();
        if available == 0 {
            return Err(EngineError::NoTradingDays);
        }
        let days = match self.config.sample_size {
            Some(n) if n > available => {
                warn!(requested = n, available, "sample size capped to available days");
                available
            }
            Some(n) => n,
            None => available,
        };
        let first_day = available - days;

        let symbols = self.symbols();
        let num_assets = self.assets.len() as f64;
        let mut ledger = Ledger::new(self.config.initial_capital, &symbols, self.config.cash_policy);
        let mut carry = vec![Carry::default(); self.assets.len()];
        let mut steps = Vec::with_capacity(days);
        let mut fills = Vec::new();
        let mut skips = Vec::new();
        let mut actions = ActionCounts::default();

        info!(
            assets = self.assets.len(),
            days,
            capital = self.config.initial_capital,
            "simulation started"
        );

        for day in 0..days {
            let source_day = first_day + day;
            let date = provider.date(source_day);
            // Buys are sized off the cash held before any of today's trades.
            let allocation = ledger.cash() / num_assets;
            let mut asset_values = Vec::with_capacity(self.assets.len());

            for (idx, asset) in self.assets.iter().enumerate() {
                let symbol = asset.symbol.as_str();
                let snapshot = provider.snapshot(symbol, source_day);

                let outcome = snapshot
                    .ok_or(SkipReason::DataUnavailable)
                    .and_then(|record| self.score(asset, record).map(|p| (record.close, p)))
                    .and_then(|(close, (prob_down, prob_up))| {
                        let held_value = ledger.holdings(symbol) * close;
                        let decision =
                            self.policy.decide(allocation, prob_down, prob_up, held_value);
                        debug!(
                            symbol,
                            day,
                            prob_down,
                            prob_up,
                            action = %decision.action,
                            amount = decision.amount,
                            "decision"
                        );
                        ledger
                            .apply(symbol, decision, close, day, date)
                            .map(|fill| (close, decision.action, fill))
                            .map_err(|e| SkipReason::TradeRejected(e.to_string()))
                    });

                let close = match outcome {
                    Ok((close, action, fill)) => {
                        actions.record(action);
                        fills.extend(fill);
                        close
                    }
                    Err(reason) => {
                        if let Some(rec) = snapshot.filter(|r| r.has_valid_close()) {
                            carry[idx].close = Some(rec.close);
                        }
                        self.log_skip(symbol, day, &reason);
                        skips.push(SkipEvent {
                            day,
                            date,
                            symbol: symbol.to_string(),
                            reason,
                        });
                        asset_values.push(AssetValue {
                            symbol: symbol.to_string(),
                            holdings: ledger.holdings(symbol),
                            value: carry[idx].value,
                            traded: false,
                        });
                        continue;
                    }
                };

                let holdings = ledger.holdings(symbol);
                carry[idx] = Carry {
                    value: holdings * close,
                    close: Some(close),
                };
                asset_values.push(AssetValue {
                    symbol: symbol.to_string(),
                    holdings,
                    value: carry[idx].value,
                    traded: true,
                });
            }

            steps.push(self.close_day(day, date, asset_values, ledger.cash(), &carry));
        }

        let result = SimulationResult {
            symbols,
            steps,
            clamped_buys: ledger.clamped_buys(),
            final_state: ledger.into_state(),
            fills,
            skips,
            actions,
        };

        info!(
            days = result.day_count(),
            fills = result.fills.len(),
            skips = result.skips.len(),
            final_net_value = result.final_net_value(),
            "simulation finished"
        );

        Ok(result)
    }

    /// Validate a record and query the model. `Ok((down, up))` or the reason
    /// the asset sits out today.
    fn score(&self, asset: &TrackedAsset, record: &DailyRecord) -> Result<(f64, f64), SkipReason> {
        if !record.has_valid_close() {
            return Err(SkipReason::InvalidPrice(record.close));
        }
        let features = self
            .schema
            .extract(record)
            .map_err(SkipReason::MissingFeature)?;
        let probs = asset
            .model
            .predict_probabilities(&features)
            .map_err(|e| SkipReason::ModelInference(e.to_string()))?;
        if !probs.is_finite() {
            let err = ModelError::InvalidOutput {
                down: probs.down,
                up: probs.up,
            };
            return Err(SkipReason::ModelInference(err.to_string()));
        }
        Ok((probs.down, probs.up))
    }

    fn log_skip(&self, symbol: &str, day: usize, reason: &SkipReason) {
        match reason {
            SkipReason::InvalidPrice(price) => {
                warn!(symbol, day, price, "invalid close price, asset skipped")
            }
            other => warn!(symbol, day, reason = %other, "asset skipped"),
        }
    }

    fn close_day(
        &self,
        day: usize,
        date: Option<NaiveDate>,
        assets: Vec<AssetValue>,
        cash: f64,
        carry: &[Carry],
    ) -> SimulationStep {
        let holdings_value: f64 = assets.iter().map(|a| a.value).sum();
        let price_sum = carry.iter().filter_map(|c| c.close).sum();
        SimulationStep {
            day,
            date,
            assets,
            cash,
            net_value: cash + holdings_value - self.config.initial_capital,
            price_sum,
        }
    }
}
