//! Configuration validation.
//!
//! Validates the `[strategy]` and `[sweep]` sections before anything runs, so
//! the builders in the CLI can read values without re-checking them.

use std::str::FromStr;

use crate::domain::error::{ParseError, TraderError};
use crate::domain::indicator::Indicator;
use crate::domain::sweep::ParamRange;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SWEEP_FAST: &str = "45:55:1";
pub const DEFAULT_SWEEP_SLOW: &str = "55:65:1";
pub const DEFAULT_SWEEP_ROC: &str = "95:105:1";
pub const DEFAULT_SWEEP_THRESHOLD: &str = "0.10:0.20:0.01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RocSma,
    DiffCross,
    SwingBreakout,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "roc_sma" | "roc_sma_crossover" => Ok(StrategyKind::RocSma),
            "diff_cross" => Ok(StrategyKind::DiffCross),
            "swing_breakout" => Ok(StrategyKind::SwingBreakout),
            other => Err(format!(
                "unknown strategy type '{}', expected roc_sma, diff_cross or swing_breakout",
                other
            )),
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> TraderError {
    TraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// `[strategy] type`, defaulting to the ROC-of-SMA crossover.
pub fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, TraderError> {
    match config.get_string("strategy", "type") {
        Some(s) if !s.trim().is_empty() => {
            s.parse().map_err(|reason: String| invalid("strategy", "type", reason))
        }
        _ => Ok(StrategyKind::RocSma),
    }
}

fn check_int(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), TraderError> {
    let raw = config.get_string(section, key).unwrap_or_default();
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, format!("{} must be an integer", key)))?;
    if value < min {
        return Err(invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        ));
    }
    Ok(())
}

fn require_int(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), TraderError> {
    if !config.has_value(section, key) {
        return Err(missing(section, key));
    }
    check_int(config, section, key, min)
}

fn optional_int(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), TraderError> {
    if config.has_value(section, key) {
        check_int(config, section, key, min)?;
    }
    Ok(())
}

fn optional_double<F>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    accept: F,
    reason: &str,
) -> Result<(), TraderError>
where
    F: Fn(f64) -> bool,
{
    let Some(raw) = config.get_string(section, key).filter(|s| !s.trim().is_empty()) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && accept(v) => Ok(()),
        Ok(_) => Err(invalid(section, key, format!("{} {}", key, reason))),
        Err(_) => Err(invalid(section, key, format!("{} must be a number", key))),
    }
}

/// Parse a required indicator expression from `[strategy] key`.
pub fn indicator(config: &dyn ConfigPort, key: &str) -> Result<Indicator, TraderError> {
    let expr = config
        .get_string("strategy", key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("strategy", key))?;
    Ok(expr.parse::<Indicator>()?)
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match strategy_kind(config)? {
        StrategyKind::RocSma => {
            require_int(config, "strategy", "fast", 1)?;
            require_int(config, "strategy", "slow", 1)?;
            require_int(config, "strategy", "roc", 1)?;
            validate_threshold(config)?;
        }
        StrategyKind::DiffCross => {
            indicator(config, "indicator_a")?;
            indicator(config, "indicator_b")?;
            validate_threshold(config)?;
        }
        StrategyKind::SwingBreakout => {
            optional_int(config, "strategy", "left_bars", 0)?;
            optional_int(config, "strategy", "right_bars", 0)?;
            optional_int(config, "strategy", "days_above_ema", 0)?;
            optional_int(config, "strategy", "gain_window_bars", 0)?;
            optional_double(
                config,
                "strategy",
                "gain_threshold_pct",
                |_| true,
                "must be finite",
            )?;
            optional_double(
                config,
                "strategy",
                "max_loss_pct",
                |v| v > 0.0,
                "must be positive",
            )?;
        }
    }
    Ok(())
}

fn validate_threshold(config: &dyn ConfigPort) -> Result<(), TraderError> {
    optional_double(
        config,
        "strategy",
        "threshold",
        |v| v >= 0.0,
        "must be non-negative",
    )
}

fn range_text(config: &dyn ConfigPort, key: &str, default: &str) -> String {
    config
        .get_string("sweep", key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Values of an integer period range in `[sweep]`, e.g. `fast = 10:50:5`.
pub fn period_range(config: &dyn ConfigPort, key: &str, default: &str) -> Result<Vec<usize>, TraderError> {
    let text = range_text(config, key, default);
    let range: ParamRange<usize> = text
        .parse()
        .map_err(|e: ParseError| invalid("sweep", key, e.message))?;
    if range.start == 0 {
        return Err(invalid("sweep", key, "periods must be at least 1"));
    }
    let values = range.values();
    if values.is_empty() {
        return Err(invalid("sweep", key, format!("range '{}' is empty", text)));
    }
    Ok(values)
}

/// Values of the threshold range in `[sweep]`, e.g. `threshold = 0.0:1.0:0.25`.
pub fn threshold_range(config: &dyn ConfigPort, default: &str) -> Result<Vec<f64>, TraderError> {
    let text = range_text(config, "threshold", default);
    let range: ParamRange<f64> = text
        .parse()
        .map_err(|e: ParseError| invalid("sweep", "threshold", e.message))?;
    if range.start < 0.0 {
        return Err(invalid("sweep", "threshold", "threshold must be non-negative"));
    }
    let values = range.values();
    if values.is_empty() {
        return Err(invalid(
            "sweep",
            "threshold",
            format!("range '{}' is empty", text),
        ));
    }
    Ok(values)
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    period_range(config, "fast", DEFAULT_SWEEP_FAST)?;
    period_range(config, "slow", DEFAULT_SWEEP_SLOW)?;
    period_range(config, "roc", DEFAULT_SWEEP_ROC)?;
    threshold_range(config, DEFAULT_SWEEP_THRESHOLD)?;
    optional_int(config, "sweep", "top_k", 0)?;
    optional_int(config, "sweep", "progress_every", 0)?;
    optional_int(config, "sweep", "threads", 0)?;
    optional_int(config, "sweep", "max_combinations", 1)?;
    Ok(())
}
