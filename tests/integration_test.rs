//! End-to-end tests: data port -> strategy / sweep -> report port.

mod common;

use approx::assert_relative_eq;
use common::*;
use std::sync::atomic::AtomicBool;
use sweeptrader::cli::{fetch_series, run_backtest_pipeline, run_sweep_pipeline};
use sweeptrader::domain::backtest::Backtester;
use sweeptrader::domain::error::TraderError;
use sweeptrader::domain::indicator::{Indicator, IndicatorSeries, Transform};
use sweeptrader::domain::strategy::{DiffCross, RocSmaCrossover, Strategy, SwingBreakout};
use sweeptrader::domain::sweep::{score, SweepGrid, Sweeper};

fn sweep_grid() -> SweepGrid {
    SweepGrid::new(
        vec![2, 3, 5, 8],
        vec![5, 8, 13, 21],
        vec![1, 2, 4],
        vec![0.0, 0.1, 0.3],
    )
}

mod backtest_pipeline {
    use super::*;

    #[test]
    fn pipeline_reports_result_for_symbol() {
        let port = MockDataPort::new().with_bars("BTCUSD", bars_from_closes(&wave_closes(200)));
        let series = fetch_series(&port, "BTCUSD").unwrap();
        let strategy: Strategy = RocSmaCrossover::new(5, 20, 3, 0.1).into();

        let mut report = MockReportPort::default();
        let result = run_backtest_pipeline("BTCUSD", &series, &strategy, &mut report).unwrap();

        assert_eq!(report.backtests.len(), 1);
        let (symbol, name, reported) = &report.backtests[0];
        assert_eq!(symbol, "BTCUSD");
        assert_eq!(name, "RocSmaCrossover(fast=5, slow=20, roc=3, threshold=0.1)");
        assert_eq!(*reported, result);
        assert!(result.trades > 0);
    }

    #[test]
    fn empty_symbol_is_no_data() {
        let port = MockDataPort::new().with_bars("EMPTY", Vec::new());
        let err = fetch_series(&port, "EMPTY").unwrap_err();
        assert!(matches!(err, TraderError::NoData { symbol } if symbol == "EMPTY"));

        let err = fetch_series(&port, "UNKNOWN").unwrap_err();
        assert!(matches!(err, TraderError::NoData { .. }));
    }

    #[test]
    fn data_port_errors_propagate() {
        let port = MockDataPort::new().with_error("BAD", "disk on fire");
        let err = fetch_series(&port, "BAD").unwrap_err();
        assert!(matches!(err, TraderError::Data { reason } if reason == "disk on fire"));
    }

    #[test]
    fn backtester_delegates_to_strategy() {
        let series = wave_series(180);
        let strategies: Vec<Strategy> = vec![
            RocSmaCrossover::new(3, 12, 2, 0.05).into(),
            DiffCross::new(Indicator::Ema(5), Indicator::Sma(15), 0.5).into(),
            SwingBreakout {
                left_bars: 3,
                right_bars: 3,
                ..SwingBreakout::default()
            }
            .into(),
        ];
        let backtester = Backtester::new();
        for strategy in &strategies {
            assert_eq!(backtester.run(strategy, &series), strategy.run(&series));
        }
    }
}

mod strategies {
    use super::*;

    #[test]
    fn roc_sma_equals_diff_cross_of_composed_indicators() {
        let series = wave_series(250);
        let expr_a: Indicator = "ROC(3, SMA(4))".parse().unwrap();
        let expr_b: Indicator = "roc(3, sma(16))".parse().unwrap();

        let diff = DiffCross::new(expr_a, expr_b, 0.2);
        let roc_sma = RocSmaCrossover::new(4, 16, 3, 0.2);
        assert_eq!(diff.run(&series), roc_sma.run(&series));
    }

    #[test]
    fn custom_transform_composes_with_builtins() {
        let negate = Transform::custom("NEG", |s: &IndicatorSeries| {
            s.values().iter().map(|v| v.map(|x| -x)).collect()
        });
        let series = wave_series(120);

        // -SMA(3) - (-SMA(10)) >= T  <=>  SMA(10) - SMA(3) >= T
        let negated = DiffCross::new(
            Indicator::Sma(3).map(negate.clone()),
            Indicator::Sma(10).map(negate),
            0.5,
        );
        let swapped = DiffCross::new(Indicator::Sma(10), Indicator::Sma(3), 0.5);
        let a = negated.run(&series);
        let b = swapped.run(&series);
        assert_eq!(a.trades, b.trades);
        assert_relative_eq!(a.pnl, b.pnl, epsilon = 1e-9);
        assert_eq!(a.best_start_date, b.best_start_date);
    }

    #[test]
    fn drawdown_never_negative_and_bounded_by_losses() {
        let series = wave_series(300);
        for (fast, slow) in [(2, 5), (3, 9), (5, 21)] {
            let r = RocSmaCrossover::new(fast, slow, 2, 0.0).run(&series);
            assert!(r.max_drawdown >= 0.0);
            if r.trades == 0 {
                assert_eq!(r.pnl, 0.0);
                assert_eq!(r.max_drawdown, 0.0);
            }
        }
    }

    #[test]
    fn swing_breakout_runs_are_repeatable() {
        let series = wave_series(400);
        let strategy = SwingBreakout {
            left_bars: 4,
            right_bars: 4,
            days_above_ema_required: 2,
            gain_threshold_pct: 3.0,
            gain_window_bars: 15,
            max_loss_pct: 6.0,
            use_ema_stop: true,
        };
        let first = strategy.run(&series);
        let second = strategy.run(&series);
        assert_eq!(first, second);
        assert!(first.pnl.is_finite());
        assert!(first.max_drawdown >= 0.0);
    }
}

mod sweep_pipeline {
    use super::*;

    #[test]
    fn sweep_report_receives_outcome() {
        let series = wave_series(240);
        let grid = sweep_grid();
        let sweeper = Sweeper::new().with_top_k(4);

        let mut report = MockReportPort::default();
        let outcome =
            run_sweep_pipeline("SPY", &series, &grid, &sweeper, None, &mut report).unwrap();

        assert_eq!(report.sweeps.len(), 1);
        let (symbol, size, reported) = &report.sweeps[0];
        assert_eq!(symbol, "SPY");
        assert_eq!(*size, grid.effective_size());
        assert_eq!(reported, &outcome);
        assert_eq!(outcome.evaluated, grid.effective_size());
        assert_eq!(outcome.top.len(), 4);
    }

    #[test]
    fn best_result_reproduces_on_rerun() {
        let series = wave_series(240);
        let outcome = Sweeper::new().run(&series, &sweep_grid());
        let best = outcome.best.unwrap();

        let rerun = best.params.strategy().run(&series);
        assert_eq!(rerun, best.result);
        assert_eq!(score(&rerun), best.score);
    }

    #[test]
    fn every_evaluated_pair_has_fast_below_slow() {
        let series = wave_series(200);
        let grid = sweep_grid();
        let outcome = Sweeper::new().with_top_k(grid.effective_size()).run(&series, &grid);

        assert_eq!(outcome.top.len(), grid.effective_size());
        assert!(outcome.top.iter().all(|r| r.params.fast < r.params.slow));
    }

    #[test]
    fn thread_count_does_not_change_outcome() {
        let series = wave_series(300);
        let grid = sweep_grid();
        let baseline = Sweeper::new().with_threads(1).run(&series, &grid);
        for threads in [0, 2, 3, 8] {
            let outcome = Sweeper::new().with_threads(threads).run(&series, &grid);
            assert_eq!(outcome, baseline, "threads={}", threads);
        }
    }

    #[test]
    fn cancelled_sweep_is_flagged() {
        let series = wave_series(100);
        let cancel = AtomicBool::new(true);
        let mut report = MockReportPort::default();
        let outcome = run_sweep_pipeline(
            "SPY",
            &series,
            &sweep_grid(),
            &Sweeper::new(),
            Some(&cancel),
            &mut report,
        )
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.evaluated, 0);
        assert!(report.sweeps[0].2.cancelled);
    }
}
