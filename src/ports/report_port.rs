//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::strategy::Strategy;
use crate::domain::sweep::{SweepGrid, SweepOutcome};

/// Port for presenting backtest and sweep results.
pub trait ReportPort {
    fn write_backtest(
        &mut self,
        symbol: &str,
        strategy: &Strategy,
        result: &BacktestResult,
    ) -> Result<(), TraderError>;

    fn write_sweep(
        &mut self,
        symbol: &str,
        grid: &SweepGrid,
        outcome: &SweepOutcome,
    ) -> Result<(), TraderError>;
}
