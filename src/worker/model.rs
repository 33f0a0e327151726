use crate::app_state::Page;
use crate::normalize::{
    normalize_alpha_catalog, normalize_backtest_run, normalize_equity_curve,
    normalize_signal_response, normalize_strategy_catalog, normalize_walkforward, BacktestResult,
    EquityPoint, SignalSet, WalkForwardRow,
};
use crate::request::{EngineRequest, Operation};
use crate::session::ApiError;
use crate::strategy::{AlphaDescriptor, StrategyTemplate};
use serde_json::Value;

/// 一次需要发往引擎的任务，带页面归属与序号
#[derive(Debug, Clone)]
pub struct EngineJob {
    pub page: Page,
    pub seq: u64,
    pub request: EngineRequest,
}

/// 后台 actor 接收的指令
#[derive(Debug, Clone)]
pub enum ServiceCommand {
    Run(EngineJob),
    LoadCatalogs,
}

/// 归一化后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    Signals(SignalSet),
    Backtest(BacktestResult),
    EquityCurve(Vec<EquityPoint>),
    WalkForward(Vec<WalkForwardRow>),
    Strategies(Vec<StrategyTemplate>),
    Alphas(Vec<AlphaDescriptor>),
}

impl EngineOutcome {
    /// 按操作类型归一化原始响应
    pub fn from_response(operation: Operation, response: &Value) -> Result<Self, ApiError> {
        Ok(match operation {
            Operation::RunBacktest => Self::Backtest(normalize_backtest_run(response)?),
            Operation::EquityCurve => Self::EquityCurve(normalize_equity_curve(response)),
            Operation::LiveSignals | Operation::DatedSignals => {
                Self::Signals(normalize_signal_response(response))
            }
            Operation::WalkForward => Self::WalkForward(normalize_walkforward(response)),
            Operation::StrategyCatalog => Self::Strategies(normalize_strategy_catalog(response)),
            Operation::AlphaCatalog => Self::Alphas(normalize_alpha_catalog(response)),
        })
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Signals(set) => format!("信号 {} 行", set.rows.len()),
            Self::Backtest(r) => format!("回测完成: {} 笔交易", r.trades),
            Self::EquityCurve(curve) => format!("权益曲线 {} 个点", curve.len()),
            Self::WalkForward(rows) => format!("walk-forward {} 个区间", rows.len()),
            Self::Strategies(list) => format!("策略模板 {} 个", list.len()),
            Self::Alphas(list) => format!("alpha 目录 {} 项", list.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::engine_api::ApiErrorKind;
    use serde_json::json;

    #[test]
    fn outcomes_follow_the_operation() {
        let curve = EngineOutcome::from_response(
            Operation::EquityCurve,
            &json!({"equity_curve": [{"Date": "2024-01-02", "Equity": 1.0, "Drawdown": 0.0}]}),
        )
        .unwrap();
        assert!(matches!(curve, EngineOutcome::EquityCurve(ref c) if c.len() == 1));

        let wf = EngineOutcome::from_response(Operation::WalkForward, &json!([])).unwrap();
        assert_eq!(wf, EngineOutcome::WalkForward(Vec::new()));

        let signals =
            EngineOutcome::from_response(Operation::LiveSignals, &json!({"signals": []})).unwrap();
        assert!(matches!(signals, EngineOutcome::Signals(ref s) if s.is_empty()));
    }

    #[test]
    fn run_without_metrics_is_a_shape_failure() {
        let err = EngineOutcome::from_response(Operation::RunBacktest, &json!({"detail": "x"}))
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Shape);
    }
}
