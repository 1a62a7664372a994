//! Engine integration tests: end-to-end scenarios on hand-built data.
//!
//! Tests:
//! 1. Flat price, always-bullish model: day 1 buys 3 shares, net value stays 0
//! 2. Buy then sell driven by the feature value
//! 3. A missing feature carries the prior value forward and leaves other
//!    assets untouched
//! 4. Union alignment gaps, invalid prices, model failures, and rejected
//!    trades are skips
//! 5. Sample size, price sum, and determinism

use chrono::NaiveDate;
use probsim_core::data::{align_records, AlignedData, AlignmentMode};
use probsim_core::domain::{Action, DailyRecord};
use probsim_core::engine::{EngineConfig, SimulationEngine, SkipReason, TrackedAsset};
use probsim_core::features::FeatureSchema;
use probsim_core::model::{ConstantModel, ModelError, Probabilities, SignalModel};
use std::collections::HashMap;

const EPS: f64 = 1e-9;

// ── Helpers ──────────────────────────────────────────────────────────

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i as i64)
}

/// Records at `close` for days `0..n`, feature `x` set to `x`.
fn flat(n: usize, close: f64, x: f64) -> Vec<DailyRecord> {
    (0..n)
        .map(|i| DailyRecord::new(day(i), close).with_feature("x", x))
        .collect()
}

fn aligned(input: Vec<(&str, Vec<DailyRecord>)>, mode: AlignmentMode) -> AlignedData {
    let map: HashMap<String, Vec<DailyRecord>> = input
        .into_iter()
        .map(|(s, r)| (s.to_string(), r))
        .collect();
    align_records(map, mode).unwrap()
}

fn constant(symbol: &str, prob_up: f64) -> TrackedAsset {
    TrackedAsset::new(symbol, Box::new(ConstantModel::new(prob_up)))
}

/// Reads `x` as the up-probability.
struct FeatureAsProbability;

impl SignalModel for FeatureAsProbability {
    fn name(&self) -> &str {
        "feature_as_probability"
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError> {
        Ok(Probabilities::from_up(features[0]))
    }
}

/// Fails whenever `x` is negative.
struct RejectsNegative;

impl SignalModel for RejectsNegative {
    fn name(&self) -> &str {
        "rejects_negative"
    }

    fn predict_probabilities(&self, features: &[f64]) -> Result<Probabilities, ModelError> {
        if features[0] < 0.0 {
            return Err(ModelError::Other("negative input".into()));
        }
        Ok(Probabilities::from_up(0.9))
    }
}

fn engine(assets: Vec<TrackedAsset>) -> SimulationEngine {
    SimulationEngine::new(EngineConfig::new(1_000.0), assets, FeatureSchema::new(["x"])).unwrap()
}

// ── 1. Flat price, bullish model ─────────────────────────────────────

#[test]
fn bullish_flat_price_day_one() {
    let data = aligned(vec![("AAPL", flat(5, 100.0, 0.0))], AlignmentMode::Intersection);
    let result = engine(vec![constant("AAPL", 0.9)]).run(&data).unwrap();

    let first = &result.steps[0];
    assert!((first.assets[0].holdings - 3.0).abs() < EPS);
    assert!((first.assets[0].value - 300.0).abs() < EPS);
    assert!((first.cash - 700.0).abs() < EPS);
    assert!(first.net_value.abs() < EPS);

    let fill = &result.fills[0];
    assert_eq!(fill.action, Action::Buy);
    assert!((fill.amount - 300.0).abs() < EPS);
}

#[test]
fn bullish_flat_price_reinvests_from_remaining_cash() {
    let data = aligned(vec![("AAPL", flat(3, 100.0, 0.0))], AlignmentMode::Intersection);
    let result = engine(vec![constant("AAPL", 0.9)]).run(&data).unwrap();

    // day 2 allocation is the 700 left after day 1
    assert!((result.steps[1].cash - 490.0).abs() < EPS);
    assert!((result.steps[1].assets[0].holdings - 5.1).abs() < EPS);
    for step in &result.steps {
        assert!(step.net_value.abs() < EPS, "net value drifted on day {}", step.day);
    }
    assert_eq!(result.day_count(), 3);
    assert_eq!(result.actions.buy, 3);
}

#[test]
fn allocation_splits_across_assets() {
    let data = aligned(
        vec![
            ("A", flat(1, 100.0, 0.0)),
            ("B", flat(1, 50.0, 0.0)),
            ("C", flat(1, 10.0, 0.0)),
            ("D", flat(1, 20.0, 0.0)),
        ],
        AlignmentMode::Intersection,
    );
    let assets = ["A", "B", "C", "D"].map(|s| constant(s, 0.9)).into_iter().collect();
    let result = engine(assets).run(&data).unwrap();

    // each asset buys 0.3 * 1000 / 4
    for fill in &result.fills {
        assert!((fill.amount - 75.0).abs() < EPS);
    }
    assert!((result.final_state.cash - 700.0).abs() < EPS);
    assert!((result.final_state.holdings_of("C") - 7.5).abs() < EPS);
}

// ── 2. Buy then sell ─────────────────────────────────────────────────

#[test]
fn sell_liquidates_fraction_of_holdings_value() {
    let records = vec![
        DailyRecord::new(day(0), 100.0).with_feature("x", 0.9),
        DailyRecord::new(day(1), 100.0).with_feature("x", 0.1),
        DailyRecord::new(day(2), 100.0).with_feature("x", 0.6),
    ];
    let data = aligned(vec![("KO", records)], AlignmentMode::Intersection);
    let assets = vec![TrackedAsset::new("KO", Box::new(FeatureAsProbability))];
    let result = engine(assets).run(&data).unwrap();

    // sell 0.3 * (3 shares * 100)
    let sell = &result.fills[1];
    assert_eq!(sell.action, Action::Sell);
    assert!((sell.amount - 90.0).abs() < EPS);
    assert!((result.steps[1].assets[0].holdings - 2.1).abs() < EPS);
    assert!((result.steps[1].cash - 790.0).abs() < EPS);

    // p_up == 0.6 is not a buy; p_down == 0.4 is not a sell
    assert_eq!(result.fills.len(), 2);
    assert_eq!(result.actions.hold, 1);
    assert_eq!(result.steps[2], {
        let mut expected = result.steps[1].clone();
        expected.day = 2;
        expected.date = Some(day(2));
        expected
    });
}

// ── 3. Skip and carry forward ────────────────────────────────────────

#[test]
fn missing_feature_carries_value_forward() {
    let mut a = flat(3, 100.0, 0.0);
    a[2].features.clear();
    let data = aligned(vec![("A", a), ("B", flat(3, 50.0, 0.0))], AlignmentMode::Intersection);
    let result = engine(vec![constant("A", 0.9), constant("B", 0.9)])
        .run(&data)
        .unwrap();

    let a_series = result.asset_series("A").unwrap();
    assert_eq!(a_series[2], a_series[1]);
    assert_eq!(result.steps[2].assets[0].holdings, result.steps[1].assets[0].holdings);
    assert!(!result.steps[2].assets[0].traded);

    let skip = &result.skips[0];
    assert_eq!(skip.symbol, "A");
    assert_eq!(skip.day, 2);
    assert_eq!(skip.reason, SkipReason::MissingFeature("x".into()));
    assert_eq!(result.skips.len(), 1);
}

#[test]
fn skip_does_not_disturb_other_assets_that_day() {
    let mut a = flat(3, 100.0, 0.0);
    a[2].features.clear();
    let skipped = aligned(
        vec![("A", a), ("B", flat(3, 50.0, 0.0))],
        AlignmentMode::Intersection,
    );
    let control = aligned(
        vec![("A", flat(3, 100.0, 0.0)), ("B", flat(3, 50.0, 0.0))],
        AlignmentMode::Intersection,
    );
    let run = |data: &AlignedData| {
        engine(vec![constant("A", 0.9), constant("B", 0.9)])
            .run(data)
            .unwrap()
    };
    let with_skip = run(&skipped);
    let without = run(&control);

    let b_fill = |r: &probsim_core::SimulationResult| {
        r.fills
            .iter()
            .find(|f| f.symbol == "B" && f.day == 2)
            .cloned()
            .unwrap()
    };
    let (x, y) = (b_fill(&with_skip), b_fill(&without));
    assert_eq!(x.amount, y.amount);
    assert_eq!(x.shares, y.shares);
    assert_eq!(with_skip.steps[2].assets[1].value, without.steps[2].assets[1].value);
}

#[test]
fn skip_on_first_day_records_zero() {
    let mut a = flat(2, 100.0, 0.0);
    a[0].features.clear();
    let data = aligned(vec![("A", a)], AlignmentMode::Intersection);
    let result = engine(vec![constant("A", 0.9)]).run(&data).unwrap();

    assert_eq!(result.steps[0].assets[0].value, 0.0);
    assert_eq!(result.steps[0].cash, 1_000.0);
    assert!(result.steps[1].assets[0].traded);
}

// ── 4. Other skip reasons ────────────────────────────────────────────

#[test]
fn union_gap_is_data_unavailable() {
    let b = vec![
        DailyRecord::new(day(0), 50.0).with_feature("x", 0.0),
        DailyRecord::new(day(2), 50.0).with_feature("x", 0.0),
    ];
    let data = aligned(vec![("A", flat(3, 100.0, 0.0)), ("B", b)], AlignmentMode::Union);
    let result = engine(vec![constant("A", 0.9), constant("B", 0.9)])
        .run(&data)
        .unwrap();

    assert_eq!(result.day_count(), 3);
    let skip = result.skips_for("B").next().unwrap();
    assert_eq!(skip.day, 1);
    assert_eq!(skip.reason, SkipReason::DataUnavailable);
    assert_eq!(skip.date, Some(day(1)));
    let b_series = result.asset_series("B").unwrap();
    assert_eq!(b_series[1], b_series[0]);
    // A still traded that day
    assert!(result.fills.iter().any(|f| f.symbol == "A" && f.day == 1));
}

#[test]
fn intersection_drops_partial_days() {
    let b = vec![
        DailyRecord::new(day(0), 50.0).with_feature("x", 0.0),
        DailyRecord::new(day(2), 50.0).with_feature("x", 0.0),
    ];
    let data = aligned(
        vec![("A", flat(3, 100.0, 0.0)), ("B", b)],
        AlignmentMode::Intersection,
    );
    let result = engine(vec![constant("A", 0.9), constant("B", 0.9)])
        .run(&data)
        .unwrap();
    assert_eq!(result.day_count(), 2);
    assert!(result.skips.is_empty());
}

#[test]
fn invalid_price_is_skipped() {
    let mut a = flat(3, 100.0, 0.0);
    a[1].close = 0.0;
    a[2].close = f64::NAN;
    let data = aligned(vec![("A", a)], AlignmentMode::Intersection);
    let result = engine(vec![constant("A", 0.9)]).run(&data).unwrap();

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.skips.len(), 2);
    assert_eq!(result.skips[0].reason, SkipReason::InvalidPrice(0.0));
    assert!(matches!(result.skips[1].reason, SkipReason::InvalidPrice(p) if p.is_nan()));
    let series = result.asset_series("A").unwrap();
    assert_eq!(series, vec![series[0]; 3]);
    // last valid close keeps feeding the price sum
    assert_eq!(result.price_sum_series(), vec![100.0; 3]);
}

#[test]
fn model_failure_is_skipped() {
    let mut a = flat(3, 100.0, 1.0);
    a[1].features.insert("x".into(), -1.0);
    let data = aligned(vec![("A", a)], AlignmentMode::Intersection);
    let assets = vec![TrackedAsset::new("A", Box::new(RejectsNegative))];
    let result = engine(assets).run(&data).unwrap();

    assert_eq!(result.skips.len(), 1);
    assert!(matches!(&result.skips[0].reason, SkipReason::ModelInference(msg) if msg.contains("negative")));
    assert_eq!(result.fills.len(), 2);
}

#[test]
fn non_finite_model_output_is_skipped() {
    let data = aligned(vec![("A", flat(2, 100.0, f64::INFINITY))], AlignmentMode::Intersection);
    let assets = vec![TrackedAsset::new("A", Box::new(FeatureAsProbability))];
    let result = engine(assets).run(&data).unwrap();
    assert_eq!(result.skips.len(), 2);
    assert!(result.fills.is_empty());
    assert!(matches!(&result.skips[0].reason, SkipReason::ModelInference(msg) if msg.contains("invalid distribution")));
}

#[test]
fn rejected_trade_is_skipped_and_other_assets_still_trade() {
    // A buys 150 shares at 1.0, then a huge close makes its sell amount overflow.
    let a = vec![
        DailyRecord::new(day(0), 1.0).with_feature("x", 0.9),
        DailyRecord::new(day(1), 1e308).with_feature("x", 0.05),
    ];
    let data = aligned(
        vec![("A", a), ("B", flat(2, 10.0, 0.0))],
        AlignmentMode::Intersection,
    );
    let assets = vec![
        TrackedAsset::new("A", Box::new(FeatureAsProbability)),
        constant("B", 0.9),
    ];
    let result = engine(assets).run(&data).unwrap();

    assert_eq!(result.day_count(), 2);
    assert_eq!(result.skips.len(), 1);
    let skip = &result.skips[0];
    assert_eq!((skip.symbol.as_str(), skip.day), ("A", 1));
    assert!(matches!(&skip.reason, SkipReason::TradeRejected(msg) if msg.contains("inf")));

    let day1 = &result.steps[1];
    assert!((day1.assets[0].holdings - 150.0).abs() < EPS);
    assert!((day1.assets[0].value - 150.0).abs() < EPS);
    assert!(!day1.assets[0].traded);
    // B still buys 30% of its 350 allocation on day 1
    let b_fills: Vec<_> = result.fills.iter().filter(|f| f.symbol == "B").collect();
    assert_eq!(b_fills.len(), 2);
    assert!((b_fills[1].amount - 105.0).abs() < EPS);
    assert!((day1.cash - 595.0).abs() < EPS);
    assert_eq!(result.actions.buy, 3);
    assert_eq!(result.actions.sell, 0);
}

// ── 5. Sample size, price sum, determinism ───────────────────────────

#[test]
fn sample_size_keeps_last_days() {
    let data = aligned(vec![("A", flat(10, 100.0, 0.0))], AlignmentMode::Intersection);
    let engine = SimulationEngine::new(
        EngineConfig::new(1_000.0).with_sample_size(4),
        vec![constant("A", 0.9)],
        FeatureSchema::new(["x"]),
    )
    .unwrap();
    let result = engine.run(&data).unwrap();

    assert_eq!(result.day_count(), 4);
    assert_eq!(result.steps[0].day, 0);
    assert_eq!(result.steps[0].date, Some(day(6)));
    assert!((result.steps[0].cash - 700.0).abs() < EPS);
}

#[test]
fn oversized_sample_uses_all_days() {
    let data = aligned(vec![("A", flat(3, 100.0, 0.0))], AlignmentMode::Intersection);
    let engine = SimulationEngine::new(
        EngineConfig::new(1_000.0).with_sample_size(75),
        vec![constant("A", 0.5)],
        FeatureSchema::new(["x"]),
    )
    .unwrap();
    assert_eq!(engine.run(&data).unwrap().day_count(), 3);
}

#[test]
fn price_sum_adds_closes() {
    let data = aligned(
        vec![("A", flat(2, 100.0, 0.0)), ("B", flat(2, 50.0, 0.0))],
        AlignmentMode::Intersection,
    );
    let result = engine(vec![constant("A", 0.5), constant("B", 0.5)])
        .run(&data)
        .unwrap();
    assert_eq!(result.price_sum_series(), vec![150.0, 150.0]);
    assert!(result.fills.is_empty());
    assert_eq!(result.net_value_series(), vec![0.0, 0.0]);
}

#[test]
fn runs_are_deterministic() {
    let data = aligned(
        vec![("A", flat(20, 100.0, 0.0)), ("B", flat(20, 40.0, 0.0))],
        AlignmentMode::Intersection,
    );
    let engine = engine(vec![constant("B", 0.85), constant("A", 0.7)]);
    let first = engine.run(&data).unwrap();
    let second = engine.run(&data).unwrap();
    assert_eq!(first, second);
    // configured order, not alphabetical
    assert_eq!(first.symbols, vec!["B", "A"]);
    assert_eq!(first.fills[0].symbol, "B");
}

#[test]
fn empty_provider_is_fatal() {
    let data = AlignedData {
        dates: vec![],
        records: HashMap::new(),
        symbols: vec![],
    };
    let err = engine(vec![constant("A", 0.9)]).run(&data).unwrap_err();
    assert!(matches!(err, probsim_core::EngineError::NoTradingDays));
}
