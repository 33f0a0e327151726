use crate::normalize::fields::{collection, count, number, text};
use crate::normalize::ShapeError;
use log::warn;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: String,
    pub equity: f64,
    /// 相对历史高点的回撤比例，<= 0
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BacktestResult {
    pub trades: u64,
    pub win_rate: f64,
    pub avg_return: f64,
    pub final_equity: f64,
    pub max_drawdown: f64,
    pub equity_curve: Vec<EquityPoint>,
}

const METRIC_KEYS: [&str; 5] = [
    "trades",
    "win_rate",
    "avg_return",
    "final_equity",
    "max_drawdown",
];

/// 曲线点字段名大小写不敏感：`Date/Equity/Drawdown` -> `date/equity/drawdown`
pub fn normalize_equity_point(raw: &Value) -> Option<EquityPoint> {
    let obj = raw.as_object()?;
    let mut date = None;
    let mut equity = None;
    let mut drawdown = None;
    for (key, value) in obj {
        match key.to_ascii_lowercase().as_str() {
            "date" => date = text(value),
            "equity" => equity = number(value),
            "drawdown" => drawdown = number(value),
            _ => {}
        }
    }
    Some(EquityPoint {
        date: date?,
        equity: equity?,
        drawdown: drawdown?,
    })
}

/// 取响应中的 `equity_curve`；缺失时返回空曲线
pub fn normalize_equity_curve(response: &Value) -> Vec<EquityPoint> {
    let raw = collection(response, "equity_curve");
    let curve: Vec<EquityPoint> = raw.iter().filter_map(normalize_equity_point).collect();
    if curve.len() < raw.len() {
        warn!(
            "权益曲线归一化: 跳过 {} 个缺少 date/equity/drawdown 的点",
            raw.len() - curve.len()
        );
    }
    curve
}

/// 归一化 `/backtest/run` 响应
///
/// 至少需要一个指标字段，否则视为结构异常；个别缺失的指标按 0 填充。
pub fn normalize_backtest_run(response: &Value) -> Result<BacktestResult, ShapeError> {
    let obj = response
        .as_object()
        .ok_or_else(|| ShapeError::new("回测结果不是 JSON 对象"))?;
    if !METRIC_KEYS.iter().any(|k| obj.contains_key(*k)) {
        let detail = obj
            .get("error")
            .and_then(text)
            .unwrap_or_else(|| "缺少回测指标字段".to_string());
        return Err(ShapeError::new(detail));
    }
    let metric = |key: &str| obj.get(key).and_then(number).unwrap_or(0.0);
    Ok(BacktestResult {
        trades: obj.get("trades").and_then(count).unwrap_or(0),
        win_rate: metric("win_rate"),
        avg_return: metric("avg_return"),
        final_equity: metric("final_equity"),
        max_drawdown: metric("max_drawdown"),
        equity_curve: normalize_equity_curve(response),
    })
}

/// 把新曲线并入已有结果，只替换 `equity_curve`
///
/// 没有已有结果时生成全零外壳承载曲线。
pub fn merge_equity_curve(
    prior: Option<&BacktestResult>,
    curve: Vec<EquityPoint>,
) -> BacktestResult {
    match prior {
        Some(prev) => BacktestResult {
            equity_curve: curve,
            ..prev.clone()
        },
        None => BacktestResult {
            equity_curve: curve,
            ..BacktestResult::default()
        },
    }
}
