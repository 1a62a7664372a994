//! Multi-asset calendar alignment.
//!
//! Assets rarely share an identical calendar. Alignment builds one date axis
//! and, per asset, one slot per date. `Intersection` keeps only dates every
//! asset has. `Union` keeps every date and leaves gaps empty; the engine
//! skips an asset on its empty days. Prices are never forward-filled.

use super::provider::{DataError, MarketSnapshotProvider};
use crate::domain::DailyRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    #[default]
    Intersection,
    Union,
}

/// Records for several assets on a common, ascending date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedData {
    pub dates: Vec<NaiveDate>,
    /// Per symbol, one slot per entry of `dates`.
    pub records: HashMap<String, Vec<Option<DailyRecord>>>,
    /// Symbols in sorted order.
    pub symbols: Vec<String>,
}

/// Align per-symbol records onto a common timeline.
///
/// Input order does not matter. A date repeated within one symbol keeps the
/// last record.
pub fn align_records(
    symbol_records: HashMap<String, Vec<DailyRecord>>,
    mode: AlignmentMode,
) -> Result<AlignedData, DataError> {
    if symbol_records.is_empty() {
        return Err(DataError::NoSymbols);
    }

    let mut by_date: HashMap<String, BTreeMap<NaiveDate, DailyRecord>> = HashMap::new();
    for (symbol, records) in symbol_records {
        if records.is_empty() {
            return Err(DataError::EmptySeries { symbol });
        }
        let map = records.into_iter().map(|r| (r.date, r)).collect();
        by_date.insert(symbol, map);
    }

    let dates: Vec<NaiveDate> = match mode {
        AlignmentMode::Union => by_date
            .values()
            .flat_map(|m| m.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        AlignmentMode::Intersection => {
            let mut maps = by_date.values();
            let first: BTreeSet<NaiveDate> = maps
                .next()
                .map(|m| m.keys().copied().collect())
                .unwrap_or_default();
            maps.fold(first, |acc, m| {
                acc.into_iter().filter(|d| m.contains_key(d)).collect()
            })
            .into_iter()
            .collect()
        }
    };

    let mut symbols: Vec<String> = by_date.keys().cloned().collect();
    symbols.sort();

    let records = by_date
        .into_iter()
        .map(|(symbol, mut map)| {
            let slots = dates.iter().map(|d| map.remove(d)).collect();
            (symbol, slots)
        })
        .collect();

    Ok(AlignedData {
        dates,
        records,
        symbols,
    })
}

impl AlignedData {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Keep only dates within `[start, end]` (either bound optional).
    pub fn filter_dates(
        self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, DataError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DataError::InvalidDateRange { start: s, end: e });
            }
        }
        let keep: Vec<bool> = self
            .dates
            .iter()
            .map(|d| start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e))
            .collect();
        Ok(self.retain_days(&keep))
    }

    fn retain_days(self, keep: &[bool]) -> Self {
        let dates = self
            .dates
            .into_iter()
            .zip(keep)
            .filter_map(|(d, &k)| k.then_some(d))
            .collect();
        let records = self
            .records
            .into_iter()
            .map(|(sym, slots)| {
                let slots = slots
                    .into_iter()
                    .zip(keep)
                    .filter_map(|(r, &k)| k.then_some(r))
                    .collect();
                (sym, slots)
            })
            .collect();
        Self {
            dates,
            records,
            symbols: self.symbols,
        }
    }

    /// Number of empty slots for `symbol`.
    pub fn gap_count(&self, symbol: &str) -> usize {
        self.records
            .get(symbol)
            .map_or(0, |slots| slots.iter().filter(|r| r.is_none()).count())
    }
}

impl MarketSnapshotProvider for AlignedData {
    fn day_count(&self) -> usize {
        self.dates.len()
    }

    fn date(&self, day: usize) -> Option<NaiveDate> {
        self.dates.get(day).copied()
    }

    fn snapshot(&self, symbol: &str, day: usize) -> Option<&DailyRecord> {
        self.records.get(symbol)?.get(day)?.as_ref()
    }
}
