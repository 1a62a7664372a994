//! Plain-text summaries for the terminal.

use std::fmt::Write;

use crate::runner::SimulationReport;
use crate::sweep::SweepResults;

pub fn format_summary(report: &SimulationReport) -> String {
    let m = &report.metrics;
    let result = &report.result;
    let mut out = String::new();

    let span = match (
        result.steps.first().and_then(|s| s.date),
        result.steps.last().and_then(|s| s.date),
    ) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "n/a".to_string(),
    };

    let _ = writeln!(out, "Run {}", &report.run_id[..12.min(report.run_id.len())]);
    let _ = writeln!(out, "  assets:          {}", result.symbols.join(", "));
    let _ = writeln!(out, "  days:            {} ({span})", m.trading_days);
    let _ = writeln!(out, "  initial capital: {:.2}", report.config.simulation.initial_capital);
    let _ = writeln!(out, "  final equity:    {:.2}", m.final_equity);
    let _ = writeln!(out, "  final cash:      {:.2}", m.final_cash);
    let _ = writeln!(out, "  net value:       {:+.2}", m.final_net_value);
    let _ = writeln!(out, "  total return:    {:+.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "  max drawdown:    {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "  sharpe:          {:.3}", m.sharpe);
    let _ = writeln!(out, "  sortino:         {:.3}", m.sortino);
    let _ = writeln!(
        out,
        "  decisions:       {} buy / {} sell / {} hold",
        m.buy_count, m.sell_count, m.hold_count
    );
    let _ = writeln!(out, "  fills:           {}", m.fill_count);
    let _ = writeln!(out, "  skipped:         {}", m.skip_count);
    if m.clamped_buys > 0 {
        let _ = writeln!(out, "  clamped buys:    {}", m.clamped_buys);
    }

    for (symbol, value) in result.symbols.iter().zip(
        result
            .steps
            .last()
            .map(|s| s.assets.iter().map(|a| a.value).collect::<Vec<_>>())
            .unwrap_or_default(),
    ) {
        let _ = writeln!(out, "    {symbol:<8} {value:>12.2}");
    }
    out
}

/// Ranked table of the first `n` sweep runs.
pub fn format_sweep_table(results: &SweepResults, n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>5}  {:>5}  {:>6}  {:>12}  {:>8}  {:>7}",
        "rank", "up", "down", "strong", "net value", "return", "sharpe"
    );
    for (i, report) in results.top_n(n).iter().enumerate() {
        let p = &report.config.policy;
        let m = &report.metrics;
        let _ = writeln!(
            out,
            "{:>4}  {:>5.2}  {:>5.2}  {:>6.2}  {:>12.2}  {:>7.2}%  {:>7.3}",
            i + 1,
            p.up_threshold,
            p.down_threshold,
            p.strong_threshold,
            m.final_net_value,
            m.total_return * 100.0,
            m.sharpe
        );
    }
    out
}
