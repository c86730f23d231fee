//! Plain-text report adapter writing to any `io::Write` (stdout in the CLI).

use std::io::Write;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::ohlcv::DateKey;
use crate::domain::strategy::Strategy;
use crate::domain::sweep::{SweepGrid, SweepOutcome, SweepResult};
use crate::ports::report_port::ReportPort;

pub struct ConsoleReportAdapter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReportAdapter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_result_lines(&mut self, result: &BacktestResult) -> std::io::Result<()> {
        writeln!(self.out, " PnL: {:.2}%", result.pnl)?;
        writeln!(self.out, " Trades: {}", result.trades)?;
        writeln!(self.out, " Max DD: {:.2}%", result.max_drawdown)?;
        writeln!(
            self.out,
            " Start usable date: {}",
            format_date(result.best_start_date)
        )
    }

    fn write_top_row(&mut self, rank: usize, entry: &SweepResult) -> std::io::Result<()> {
        writeln!(
            self.out,
            " {:>3}. score {:>9.3} | {} | PnL {:>8.2}% trades {:>4} DD {:>7.2}%",
            rank,
            entry.score,
            entry.params,
            entry.result.pnl,
            entry.result.trades,
            entry.result.max_drawdown
        )
    }
}

fn format_date(date: Option<DateKey>) -> String {
    match date {
        Some(d) => format!("{:04}-{:02}-{:02}", d / 10_000, d / 100 % 100, d % 100),
        None => "n/a".to_string(),
    }
}

impl<W: Write> ReportPort for ConsoleReportAdapter<W> {
    fn write_backtest(
        &mut self,
        symbol: &str,
        strategy: &Strategy,
        result: &BacktestResult,
    ) -> Result<(), TraderError> {
        writeln!(self.out, "{} on {}", strategy, symbol)?;
        self.write_result_lines(result)?;
        Ok(())
    }

    fn write_sweep(
        &mut self,
        symbol: &str,
        grid: &SweepGrid,
        outcome: &SweepOutcome,
    ) -> Result<(), TraderError> {
        writeln!(
            self.out,
            "Sweep on {}: {} of {} combinations evaluated ({} naive, {} fast>=slow pairs skipped){}",
            symbol,
            outcome.evaluated,
            grid.effective_size(),
            grid.naive_size(),
            outcome.skipped_pairs,
            if outcome.cancelled { " [cancelled]" } else { "" }
        )?;

        let Some(best) = &outcome.best else {
            writeln!(self.out, "No combination evaluated.")?;
            return Ok(());
        };

        writeln!(self.out, "\nBest sweep:")?;
        writeln!(self.out, " {}", best.params)?;
        writeln!(self.out, " Score: {:.3}", best.score)?;
        self.write_result_lines(&best.result)?;

        if !outcome.top.is_empty() {
            writeln!(self.out, "\nTop {}:", outcome.top.len())?;
            for (i, entry) in outcome.top.iter().enumerate() {
                self.write_top_row(i + 1, entry)?;
            }
        }
        Ok(())
    }
}
