use crate::normalize::fields::{count, number, text};
use log::warn;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkForwardRow {
    pub start: String,
    pub end: String,
    pub trades: u64,
    pub avg_return: f64,
    pub win_rate: f64,
    pub final_equity: f64,
}

fn normalize_row(raw: &Value) -> Result<WalkForwardRow, Vec<&'static str>> {
    let Some(obj) = raw.as_object() else {
        return Err(vec!["<object>"]);
    };
    let mut missing = Vec::new();
    let mut field = |name: &'static str| {
        let v = obj.get(name);
        if v.is_none() {
            missing.push(name);
        }
        v.unwrap_or(&Value::Null)
    };

    let start = text(field("start"));
    let end = text(field("end"));
    let trades = count(field("trades"));
    let avg_return = number(field("avg_return"));
    let win_rate = number(field("win_rate"));
    let final_equity = number(field("final_equity"));

    match (start, end, trades, avg_return, win_rate, final_equity) {
        (Some(start), Some(end), Some(trades), Some(avg_return), Some(win_rate), Some(final_equity)) => {
            Ok(WalkForwardRow {
                start,
                end,
                trades,
                avg_return,
                win_rate,
                final_equity,
            })
        }
        _ => {
            if missing.is_empty() {
                missing.push("<invalid value>");
            }
            Err(missing)
        }
    }
}

/// 归一化 walk-forward 结果：只校验字段，不派生，保持交付顺序
pub fn normalize_walkforward(response: &Value) -> Vec<WalkForwardRow> {
    let Some(raw_rows) = response.as_array() else {
        if !response.is_null() {
            warn!("walk-forward 响应不是数组，按空结果处理");
        }
        return Vec::new();
    };

    raw_rows
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| match normalize_row(raw) {
            Ok(row) => Some(row),
            Err(missing) => {
                warn!("walk-forward 第 {} 行无效，缺少/异常字段: {:?}", idx + 1, missing);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(start: &str, trades: u64, final_equity: f64) -> Value {
        json!({
            "start": start,
            "end": "2099-01-01",
            "trades": trades,
            "avg_return": 0.01,
            "win_rate": 0.5,
            "final_equity": final_equity
        })
    }

    #[test]
    fn delivered_order_is_preserved() {
        let rows = normalize_walkforward(&json!([
            row("2023-01-01", 9, 90.0),
            row("2023-02-01", 1, 300.0),
            row("2023-03-01", 5, 10.0),
        ]));
        let starts: Vec<&str> = rows.iter().map(|r| r.start.as_str()).collect();
        assert_eq!(starts, vec!["2023-01-01", "2023-02-01", "2023-03-01"]);
    }

    #[test]
    fn unsorted_input_is_not_resorted() {
        let rows = normalize_walkforward(&json!([
            row("2023-03-01", 1, 1.0),
            row("2023-01-01", 1, 1.0),
        ]));
        assert_eq!(rows[0].start, "2023-03-01");
    }

    #[test]
    fn rows_missing_fields_are_skipped() {
        let rows = normalize_walkforward(&json!([
            {"start": "2023-01-01", "end": "2023-01-31", "trades": 3},
            row("2023-02-01", 4, 100.0),
            {"start": "2023-03-01", "end": "2023-03-31", "trades": -1, "avg_return": 0.0, "win_rate": 0.0, "final_equity": 1.0},
        ]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trades, 4);
    }

    #[test]
    fn pandas_style_integral_floats_are_accepted() {
        let rows = normalize_walkforward(&json!([
            {"start": "2023-01-01", "end": "2023-01-31", "trades": 12.0, "avg_return": 0.0, "win_rate": 1.0, "final_equity": 5.0}
        ]));
        assert_eq!(rows[0].trades, 12);
    }

    #[test]
    fn non_array_responses_are_empty() {
        assert!(normalize_walkforward(&json!({"detail": "x"})).is_empty());
        assert!(normalize_walkforward(&Value::Null).is_empty());
    }
}
