pub mod backtest;
pub mod catalog;
mod fields;
pub mod signals;
pub mod walkforward;

pub use backtest::{
    merge_equity_curve, normalize_backtest_run, normalize_equity_curve, BacktestResult,
    EquityPoint,
};
pub use catalog::{normalize_alpha_catalog, normalize_strategy_catalog};
pub use signals::{normalize_signal_response, SignalSet, Trend};
pub use walkforward::{normalize_walkforward, WalkForwardRow};

/// 响应结构不符合预期
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("unexpected response shape: {0}")]
pub struct ShapeError(pub String);

impl ShapeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
