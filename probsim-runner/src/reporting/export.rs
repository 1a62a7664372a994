//! Artifact export: one directory per run id.
//!
//! ```text
//! <output>/<run_id>/
//!   manifest.json    run id, dataset hash, config, metrics
//!   steps.csv        day, date, one column per asset, cash, net_value, price_sum
//!   fills.csv        every executed trade
//!   skips.csv        every skipped (day, asset)
//!   equity.parquet   daily portfolio value
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::prelude::{Column, DataFrame, NamedFrom, ParquetWriter, Series};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::SimulationConfig;
use crate::metrics::PerformanceMetrics;
use crate::runner::SimulationReport;
use crate::sweep::SweepResults;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub steps_csv: PathBuf,
    pub fills_csv: PathBuf,
    pub skips_csv: PathBuf,
    pub equity_parquet: PathBuf,
}

/// Everything about a run except its day-by-day series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub generated_at: DateTime<Utc>,
    pub symbols: Vec<String>,
    pub config: SimulationConfig,
    pub metrics: PerformanceMetrics,
}

/// Write every artifact for `report` under `output_dir/<run_id>/`.
pub fn save_artifacts(report: &SimulationReport, output_dir: &Path) -> Result<ArtifactPaths> {
    let run_dir = output_dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;

    let paths = ArtifactPaths {
        manifest: run_dir.join("manifest.json"),
        steps_csv: run_dir.join("steps.csv"),
        fills_csv: run_dir.join("fills.csv"),
        skips_csv: run_dir.join("skips.csv"),
        equity_parquet: run_dir.join("equity.parquet"),
        run_dir,
    };

    write_manifest(&paths.manifest, report)?;
    write_steps_csv(&paths.steps_csv, report)?;
    write_fills_csv(&paths.fills_csv, report)?;
    write_skips_csv(&paths.skips_csv, report)?;
    write_equity_parquet(&paths.equity_parquet, report)?;

    tracing::info!(dir = %paths.run_dir.display(), "artifacts written");
    Ok(paths)
}

fn write_manifest(path: &Path, report: &SimulationReport) -> Result<()> {
    let manifest = RunManifest {
        schema_version: report.schema_version,
        run_id: report.run_id.clone(),
        dataset_hash: report.dataset_hash.clone(),
        generated_at: report.generated_at,
        symbols: report.result.symbols.clone(),
        config: report.config.clone(),
        metrics: report.metrics.clone(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

fn create_csv(path: &Path) -> Result<csv::Writer<File>> {
    csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn write_steps_csv(path: &Path, report: &SimulationReport) -> Result<()> {
    let mut writer = create_csv(path)?;
    let mut header = vec!["day".to_string(), "date".to_string()];
    header.extend(report.result.symbols.iter().cloned());
    header.extend(["cash", "net_value", "price_sum"].map(String::from));
    writer.write_record(&header)?;

    for step in &report.result.steps {
        let mut row = vec![step.day.to_string(), date_cell(step.date)];
        row.extend(step.assets.iter().map(|a| format!("{:.6}", a.value)));
        row.push(format!("{:.6}", step.cash));
        row.push(format!("{:.6}", step.net_value));
        row.push(format!("{:.6}", step.price_sum));
        writer.write_record(&row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_fills_csv(path: &Path, report: &SimulationReport) -> Result<()> {
    let mut writer = create_csv(path)?;
    writer.write_record([
        "day",
        "date",
        "symbol",
        "action",
        "requested",
        "amount",
        "shares",
        "price",
        "holdings_after",
        "cash_after",
        "clamped",
    ])?;
    for fill in &report.result.fills {
        writer.write_record([
            fill.day.to_string(),
            date_cell(fill.date),
            fill.symbol.clone(),
            fill.action.to_string(),
            format!("{:.6}", fill.requested),
            format!("{:.6}", fill.amount),
            format!("{:.8}", fill.shares),
            format!("{:.4}", fill.price),
            format!("{:.8}", fill.holdings_after),
            format!("{:.6}", fill.cash_after),
            fill.clamped.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_skips_csv(path: &Path, report: &SimulationReport) -> Result<()> {
    let mut writer = create_csv(path)?;
    writer.write_record(["day", "date", "symbol", "reason", "detail"])?;
    for skip in &report.result.skips {
        writer.write_record([
            skip.day.to_string(),
            date_cell(skip.date),
            skip.symbol.clone(),
            skip.reason.kind().to_string(),
            skip.reason.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_equity_parquet(path: &Path, report: &SimulationReport) -> Result<()> {
    let steps = &report.result.steps;
    let days: Vec<u64> = steps.iter().map(|s| s.day as u64).collect();
    let dates: Vec<String> = steps.iter().map(|s| date_cell(s.date)).collect();
    let equity = report.result.equity_series();
    let net_value = report.result.net_value_series();
    let cash = report.result.cash_series();

    let mut df = DataFrame::new(vec![
        Column::from(Series::new("day".into(), days)),
        Column::from(Series::new("date".into(), dates)),
        Column::from(Series::new("equity".into(), equity)),
        Column::from(Series::new("net_value".into(), net_value)),
        Column::from(Series::new("cash".into(), cash)),
    ])
    .context("Failed to build equity dataframe")?;

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create equity parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context("Failed to write equity parquet")?;
    Ok(())
}

/// One row per sweep run, best first.
pub fn write_sweep_csv(path: &Path, results: &SweepResults) -> Result<()> {
    let mut writer = create_csv(path)?;
    writer.write_record([
        "rank",
        "run_id",
        "up_threshold",
        "down_threshold",
        "strong_threshold",
        "final_net_value",
        "total_return",
        "sharpe",
        "max_drawdown",
        "buys",
        "sells",
        "holds",
    ])?;
    for (rank, report) in results.all().iter().enumerate() {
        let p = &report.config.policy;
        let m = &report.metrics;
        writer.write_record([
            (rank + 1).to_string(),
            report.run_id.clone(),
            p.up_threshold.to_string(),
            p.down_threshold.to_string(),
            p.strong_threshold.to_string(),
            format!("{:.4}", m.final_net_value),
            format!("{:.6}", m.total_return),
            format!("{:.4}", m.sharpe),
            format!("{:.6}", m.max_drawdown),
            m.buy_count.to_string(),
            m.sell_count.to_string(),
            m.hold_count.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
