//! CSV loading, synthetic data, and dataset hashing for the runner.
//!
//! Two CSV shapes are understood:
//! - Feature files: a `date` column, a `close` column, and any number of
//!   named numeric feature columns.
//! - OHLCV files (`derive_features = true`): `date, open, high, low, close,
//!   volume`, from which the classic indicator columns are computed.
//!
//! Header matching for the fixed columns is case-insensitive. Empty or
//! non-numeric cells leave the feature absent for that day.

use crate::config::{AssetConfig, SimulationConfig};
use chrono::{Datelike, NaiveDate};
use probsim_core::data::{align_records, AlignedData, DataError};
use probsim_core::domain::{Bar, DailyRecord};
use probsim_core::indicators::{classic_warmup, derive_feature_records};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}, row {row}: invalid date '{value}'")]
    BadDate {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{path}: no data rows")]
    Empty { path: PathBuf },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Aligned data for a whole config, with its fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub aligned: AlignedData,
    /// BLAKE3 over all aligned records, in sorted symbol order.
    pub dataset_hash: String,
}

/// Load, align, and date-filter every asset in `config`.
pub fn load_universe(config: &SimulationConfig) -> Result<LoadedData, LoadError> {
    let mut by_symbol = HashMap::new();
    for asset in &config.assets {
        let records = load_asset(asset, &config.resolve(&asset.data))?;
        tracing::info!(
            symbol = %asset.symbol,
            rows = records.len(),
            derived = asset.derive_features,
            "loaded asset data"
        );
        by_symbol.insert(asset.symbol.clone(), records);
    }

    let sim = &config.simulation;
    let aligned = align_records(by_symbol, sim.alignment)?.filter_dates(sim.start_date, sim.end_date)?;
    for symbol in &aligned.symbols {
        let gaps = aligned.gap_count(symbol);
        if gaps > 0 {
            tracing::warn!(symbol = %symbol, gaps, "asset has no data on some aligned days");
        }
    }
    let dataset_hash = compute_dataset_hash(&aligned);
    Ok(LoadedData {
        aligned,
        dataset_hash,
    })
}

/// Load one asset's records, deriving features when configured.
pub fn load_asset(asset: &AssetConfig, path: &Path) -> Result<Vec<DailyRecord>, LoadError> {
    if asset.derive_features {
        let bars = load_bars_csv(path)?;
        let warmup = classic_warmup();
        if bars.len() <= warmup {
            tracing::warn!(
                symbol = %asset.symbol,
                bars = bars.len(),
                warmup,
                "too few bars for every derived feature; all days will be skipped"
            );
        }
        Ok(derive_feature_records(&bars))
    } else {
        load_asset_csv(path)
    }
}

/// Read a feature CSV. Rows come back sorted by date; a repeated date keeps
/// the last row.
pub fn load_asset_csv(path: &Path) -> Result<Vec<DailyRecord>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    let date_idx = find_column(&headers, "date", path)?;
    let close_idx = find_column(&headers, "close", path)?;

    let feature_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != date_idx && *i != close_idx && !name.trim().is_empty())
        .map(|(i, name)| (i, name.trim().to_string()))
        .collect();

    let mut rows = BTreeMap::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|source| csv_error(path, source))?;
        let date = parse_date(record.get(date_idx).unwrap_or(""), path, row + 1)?;
        let close = parse_number(record.get(close_idx)).unwrap_or(f64::NAN);

        let mut daily = DailyRecord::new(date, close);
        for (idx, name) in &feature_cols {
            if let Some(v) = parse_number(record.get(*idx)) {
                daily.features.insert(name.clone(), v);
            }
        }
        rows.insert(date, daily);
    }

    if rows.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(rows.into_values().collect())
}

/// Read an OHLCV CSV into bars, sorted by date. Unparseable prices become
/// NaN; missing volume reads as zero.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    let date_idx = find_column(&headers, "date", path)?;
    let open_idx = find_column(&headers, "open", path)?;
    let high_idx = find_column(&headers, "high", path)?;
    let low_idx = find_column(&headers, "low", path)?;
    let close_idx = find_column(&headers, "close", path)?;
    let volume_idx = find_column(&headers, "volume", path)?;

    let mut bars = BTreeMap::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|source| csv_error(path, source))?;
        let date = parse_date(record.get(date_idx).unwrap_or(""), path, row + 1)?;
        let price = |idx| parse_number(record.get(idx)).unwrap_or(f64::NAN);
        bars.insert(
            date,
            Bar {
                date,
                open: price(open_idx),
                high: price(high_idx),
                low: price(low_idx),
                close: price(close_idx),
                volume: parse_number(record.get(volume_idx)).unwrap_or(0.0),
            },
        );
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    let bars: Vec<Bar> = bars.into_values().collect();
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        tracing::warn!(path = %path.display(), insane, "bars failed OHLC sanity checks");
    }
    Ok(bars)
}

/// Write bars as an OHLCV CSV that `load_bars_csv` reads back.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| csv_error(path, source))?;
    writer
        .write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(|source| csv_error(path, source))?;
    for bar in bars {
        writer
            .write_record([
                bar.date.to_string(),
                format!("{:.4}", bar.open),
                format!("{:.4}", bar.high),
                format!("{:.4}", bar.low),
                format!("{:.4}", bar.close),
                format!("{:.0}", bar.volume),
            ])
            .map_err(|source| csv_error(path, source))?;
    }
    writer
        .flush()
        .map_err(|e| csv_error(path, csv::Error::from(e)))?;
    Ok(())
}

/// Deterministic random-walk bars on weekdays from `start`, seeded by the
/// symbol name. Starts at 100.0.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, days: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(days);
    let mut price = 100.0_f64;
    let mut current = start;

    while bars.len() < days {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            bars.push(Bar {
                date: current,
                open,
                high: open.max(close) * (1.0 + rng.gen_range(0.0..0.01)),
                low: open.min(close) * (1.0 - rng.gen_range(0.0..0.01)),
                close,
                volume: rng.gen_range(500_000..5_000_000u64) as f64,
            });
            price = close;
        }
        current += chrono::Duration::days(1);
    }

    bars
}

/// BLAKE3 over dates and every record, in sorted symbol order so the hash
/// does not depend on map iteration order.
pub fn compute_dataset_hash(aligned: &AlignedData) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in &aligned.dates {
        hasher.update(date.to_string().as_bytes());
    }
    for symbol in &aligned.symbols {
        hasher.update(symbol.as_bytes());
        let Some(slots) = aligned.records.get(symbol) else {
            continue;
        };
        for slot in slots {
            match slot {
                None => {
                    hasher.update(b"-");
                }
                Some(rec) => {
                    hasher.update(&rec.close.to_le_bytes());
                    for (name, value) in &rec.features {
                        hasher.update(name.as_bytes());
                        hasher.update(&value.to_le_bytes());
                    }
                }
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(path, source))
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn find_column(
    headers: &csv::StringRecord,
    column: &'static str,
    path: &Path,
) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column,
        })
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str, path: &Path, row: usize) -> Result<NaiveDate, LoadError> {
    let day_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").map_err(|_| LoadError::BadDate {
        path: path.to_path_buf(),
        row,
        value: raw.to_string(),
    })
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn feature_csv_loads_sorted_with_named_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "a.csv",
            ",Date,Close,RSI,On Balance Volume\n\
             1,2024-01-03,11.0,55.0,200\n\
             0,2024-01-02,10.0,,100\n",
        );
        let records = load_asset_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(records[0].close, 10.0);
        assert_eq!(records[0].feature("RSI"), None);
        assert_eq!(records[0].feature("On Balance Volume"), Some(100.0));
        assert_eq!(records[1].feature("RSI"), Some(55.0));
        // unnamed index column and fixed columns are not features
        assert_eq!(records[1].features.len(), 2);
    }

    #[test]
    fn duplicate_dates_keep_last_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "a.csv",
            "date,close,x\n2024-01-02,10,1\n2024-01-02,12,2\n",
        );
        let records = load_asset_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].close, 12.0);
        assert_eq!(records[0].feature("x"), Some(2.0));
    }

    #[test]
    fn timestamp_dates_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", "date,close\n2024-01-02 00:00:00,10\n");
        assert_eq!(load_asset_csv(&path).unwrap().len(), 1);
    }

    #[test]
    fn unparseable_close_becomes_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", "date,close\n2024-01-02,n/a\n");
        assert!(load_asset_csv(&path).unwrap()[0].close.is_nan());
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", "date,price\n2024-01-02,10\n");
        assert!(matches!(
            load_asset_csv(&path),
            Err(LoadError::MissingColumn { column: "close", .. })
        ));
    }

    #[test]
    fn bad_date_reports_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", "date,close\n2024-01-02,10\nyesterday,11\n");
        assert!(matches!(
            load_asset_csv(&path),
            Err(LoadError::BadDate { row: 2, .. })
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.csv", "date,close\n");
        assert!(matches!(load_asset_csv(&path), Err(LoadError::Empty { .. })));
    }

    #[test]
    fn synthetic_bars_are_deterministic_weekdays() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = generate_synthetic_bars("AAPL", start, 30);
        let b = generate_synthetic_bars("AAPL", start, 30);
        let c = generate_synthetic_bars("KO", start, 30);
        assert_eq!(a.len(), 30);
        assert_eq!(a[10].close, b[10].close);
        assert_ne!(a[10].close, c[10].close);
        assert!(a.iter().all(|bar| bar.date.weekday().number_from_monday() <= 5));
        assert!(a.iter().all(|bar| bar.is_sane()));
    }

    #[test]
    fn bars_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let bars = generate_synthetic_bars("GE", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 20);
        write_bars_csv(&path, &bars).unwrap();
        let loaded = load_bars_csv(&path).unwrap();
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded[0].date, bars[0].date);
        assert!((loaded[5].close - bars[5].close).abs() < 1e-4);
    }

    #[test]
    fn dataset_hash_is_order_independent() {
        let rec = |d: u32, c: f64| {
            DailyRecord::new(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), c).with_feature("x", c)
        };
        let build = |order: [&str; 2]| {
            let map: HashMap<String, Vec<DailyRecord>> = order
                .iter()
                .map(|s| (s.to_string(), vec![rec(2, 1.0), rec(3, 2.0)]))
                .collect();
            align_records(map, probsim_core::data::AlignmentMode::Intersection).unwrap()
        };
        let h1 = compute_dataset_hash(&build(["A", "B"]));
        let h2 = compute_dataset_hash(&build(["B", "A"]));
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
