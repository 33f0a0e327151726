use crate::normalize::fields::{collection, integer, number, text};
use log::warn;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

pub const CURRENT_PRICE: &str = "current_price";
const MAX_CHANGE: &str = "max_change_pct";
const MIN_CHANGE: &str = "min_change_pct";

fn price_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^price_\d{4}-?\d{2}-?\d{2}").expect("valid price column pattern"))
}

/// `price_` 加日期后缀（`YYYY-MM-DD` 或 `YYYYMMDD`）的列
pub fn is_dated_price_column(key: &str) -> bool {
    price_column_re().is_match(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// 按分数分类：`> 0.5` 看涨，`< 0` 看跌，其余（含 [0, 0.5]）中性
pub fn classify_score(score: f64) -> Trend {
    if score > 0.5 {
        Trend::Bullish
    } else if score < 0.0 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub symbol: String,
    pub final_score: f64,
    /// 显式 rank 原样保留，缺失时为输入中的 1-based 位置
    pub rank: i64,
    pub current_price: Option<f64>,
    pub max_change_pct: Option<f64>,
    pub min_change_pct: Option<f64>,
    pub dated_prices: BTreeMap<String, f64>,
}

impl SignalRow {
    pub fn trend(&self) -> Trend {
        classify_score(self.final_score)
    }

    /// 按列名取价格；`None` 表示该行没有数据
    pub fn price(&self, column: &str) -> Option<f64> {
        if column == CURRENT_PRICE {
            self.current_price
        } else {
            self.dated_prices.get(column).copied()
        }
    }
}

/// 归一化后的信号集合
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSet {
    pub date: Option<String>,
    pub target_date: Option<String>,
    pub mode: Option<String>,
    /// 后端返回的 `error` 提示（如所选日期无数据）
    pub notice: Option<String>,
    pub rows: Vec<SignalRow>,
    /// 所有行出现过的价格列并集，按字典序排列（日期后缀即时间顺序）
    pub price_columns: Vec<String>,
    /// 任一行带 `max_change_pct` 时整组开启涨跌幅列
    pub has_change_data: bool,
    pub skipped: usize,
}

impl SignalSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 以原始行的形式输出，每行带齐所有已发现列（缺失为 null）
    #[cfg(test)]
    pub fn to_raw_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                obj.insert("symbol".to_string(), Value::String(row.symbol.clone()));
                obj.insert("final_score".to_string(), Value::from(row.final_score));
                obj.insert("rank".to_string(), Value::from(row.rank));
                for column in &self.price_columns {
                    let v = row.price(column).map(Value::from).unwrap_or(Value::Null);
                    obj.insert(column.clone(), v);
                }
                if self.has_change_data {
                    let max = row.max_change_pct.map(Value::from).unwrap_or(Value::Null);
                    let min = row.min_change_pct.map(Value::from).unwrap_or(Value::Null);
                    obj.insert(MAX_CHANGE.to_string(), max);
                    obj.insert(MIN_CHANGE.to_string(), min);
                }
                Value::Object(obj)
            })
            .collect()
    }
}

fn normalize_row(position: usize, raw: &Value) -> Option<SignalRow> {
    let obj = raw.as_object()?;
    let symbol = obj.get("symbol").and_then(|v| v.as_str())?.to_string();
    let final_score = obj.get("final_score").and_then(number)?;
    let rank = obj
        .get("rank")
        .and_then(integer)
        .unwrap_or(position as i64 + 1);

    let dated_prices = obj
        .iter()
        .filter(|(k, _)| is_dated_price_column(k))
        .filter_map(|(k, v)| number(v).map(|p| (k.clone(), p)))
        .collect();

    Some(SignalRow {
        symbol,
        final_score,
        rank,
        current_price: obj.get(CURRENT_PRICE).and_then(number),
        max_change_pct: obj.get(MAX_CHANGE).and_then(number),
        min_change_pct: obj.get(MIN_CHANGE).and_then(number),
        dated_prices,
    })
}

/// 归一化一组原始信号行
///
/// 列发现基于字段是否出现（值为 null 也算出现），行内缺值按"无数据"处理。
pub fn normalize_signals(raw_rows: &[Value], date: Option<&str>) -> SignalSet {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut columns = BTreeSet::new();
    let mut has_change_data = false;
    let mut skipped = 0usize;

    for (position, raw) in raw_rows.iter().enumerate() {
        // 列发现覆盖所有行，包括随后被跳过的行
        if let Some(obj) = raw.as_object() {
            for key in obj.keys() {
                if key == CURRENT_PRICE || is_dated_price_column(key) {
                    columns.insert(key.clone());
                }
            }
            has_change_data |= obj.contains_key(MAX_CHANGE);
        }
        match normalize_row(position, raw) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("信号归一化: 跳过 {} 条缺少 symbol/final_score 的行", skipped);
    }

    SignalSet {
        date: date.map(|d| d.to_string()),
        rows,
        price_columns: columns.into_iter().collect(),
        has_change_data,
        skipped,
        ..SignalSet::default()
    }
}

/// 归一化 `/signals/live` 与 `/signals/date` 的完整响应
pub fn normalize_signal_response(response: &Value) -> SignalSet {
    let date = response.get("date").and_then(text);
    let mut set = normalize_signals(collection(response, "signals"), date.as_deref());
    set.mode = response.get("mode").and_then(text);
    set.target_date = response.get("target_date").and_then(text);
    set.notice = response.get("error").and_then(text);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skipped_rows_still_contribute_columns() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 0.7, "current_price": 10.0}),
            json!({"final_score": 0.1, "price_2024-01-03": 11.0, "max_change_pct": 2.0}),
        ];
        let set = normalize_signals(&raw, None);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.skipped, 1);
        assert_eq!(set.price_columns, vec!["current_price", "price_2024-01-03"]);
        assert!(set.has_change_data);
        assert_eq!(set.rows[0].price("price_2024-01-03"), None);

        let again = normalize_signals(&set.to_raw_rows(), None);
        assert_eq!(again.price_columns, set.price_columns);
    }

    #[test]
    fn columns_are_the_sorted_union_across_rows() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 0.7, "current_price": 10.0}),
            json!({"symbol": "B", "final_score": 0.2, "price_2024-01-02": 12.0}),
        ];
        let set = normalize_signals(&raw, None);
        assert_eq!(set.price_columns, vec!["current_price", "price_2024-01-02"]);
        let b = &set.rows[1];
        assert_eq!(b.price("current_price"), None);
        assert_eq!(b.price("price_2024-01-02"), Some(12.0));
        assert_eq!(set.rows[0].price("price_2024-01-02"), None);
    }

    #[test]
    fn dated_columns_sort_chronologically() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 1.0, "price_2024-02-01": 3.0, "price_2023-12-29": 1.0}),
            json!({"symbol": "B", "final_score": 1.0, "price_2024-01-15": 2.0}),
        ];
        let set = normalize_signals(&raw, None);
        assert_eq!(
            set.price_columns,
            vec!["price_2023-12-29", "price_2024-01-15", "price_2024-02-01"]
        );
    }

    #[test]
    fn non_date_price_keys_are_not_columns() {
        let raw = vec![json!({"symbol": "A", "final_score": 1.0, "price_target": 5.0, "price_20240105": 4.0})];
        let set = normalize_signals(&raw, None);
        assert_eq!(set.price_columns, vec!["price_20240105"]);
    }

    #[test]
    fn null_price_declares_the_column_but_has_no_data() {
        let raw = vec![json!({"symbol": "A", "final_score": 0.1, "current_price": null})];
        let set = normalize_signals(&raw, None);
        assert_eq!(set.price_columns, vec!["current_price"]);
        assert_eq!(set.rows[0].current_price, None);
    }

    #[test]
    fn score_boundaries() {
        assert_eq!(classify_score(-0.1), Trend::Bearish);
        assert_eq!(classify_score(0.0), Trend::Neutral);
        assert_eq!(classify_score(0.5), Trend::Neutral);
        assert_eq!(classify_score(0.5001), Trend::Bullish);
    }

    #[test]
    fn rank_falls_back_to_input_position() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 0.9, "rank": 7}),
            json!({"symbol": "B", "final_score": 0.8}),
            json!({"symbol": "C", "final_score": 0.7, "rank": 7}),
            json!({"symbol": "D", "final_score": 0.6}),
        ];
        let ranks: Vec<i64> = normalize_signals(&raw, None)
            .rows
            .iter()
            .map(|r| r.rank)
            .collect();
        assert_eq!(ranks, vec![7, 2, 7, 4]);
    }

    #[test]
    fn malformed_rows_are_skipped_without_renumbering() {
        let raw = vec![
            json!({"final_score": 0.9}),
            json!({"symbol": "B", "final_score": null}),
            json!("junk"),
            json!({"symbol": "D", "final_score": 0.6}),
        ];
        let set = normalize_signals(&raw, None);
        assert_eq!(set.skipped, 3);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0].rank, 4);
    }

    #[test]
    fn change_data_flag_applies_to_the_whole_set() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 0.9}),
            json!({"symbol": "B", "final_score": 0.8, "max_change_pct": 4.2, "min_change_pct": -1.5}),
        ];
        let set = normalize_signals(&raw, Some("2024-01-02"));
        assert!(set.has_change_data);
        assert_eq!(set.rows[0].max_change_pct, None);
        assert_eq!(set.rows[1].min_change_pct, Some(-1.5));
        assert_eq!(set.date.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn renormalizing_output_keeps_columns() {
        let raw = vec![
            json!({"symbol": "A", "final_score": 0.9, "current_price": 10.0, "max_change_pct": 1.0}),
            json!({"symbol": "B", "final_score": -0.2, "price_2024-01-03": 11.0}),
            json!({"symbol": "C", "final_score": 0.3, "price_2024-01-02": null}),
        ];
        let first = normalize_signals(&raw, None);
        let second = normalize_signals(&first.to_raw_rows(), None);
        assert_eq!(first.price_columns, second.price_columns);
        assert_eq!(first.has_change_data, second.has_change_data);
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn empty_and_missing_signals_normalize_to_empty() {
        let empty = normalize_signal_response(&json!({"signals": []}));
        let missing = normalize_signal_response(&json!({}));
        assert!(empty.is_empty());
        assert!(missing.is_empty());
        assert!(missing.price_columns.is_empty());
        assert!(!missing.has_change_data);
    }

    #[test]
    fn response_metadata_is_carried() {
        let set = normalize_signal_response(&json!({
            "mode": "DATE",
            "date": "2024-01-05",
            "target_date": "2024-01-06",
            "signals": [{"symbol": "A", "final_score": 0.2}]
        }));
        assert_eq!(set.mode.as_deref(), Some("DATE"));
        assert_eq!(set.date.as_deref(), Some("2024-01-05"));
        assert_eq!(set.target_date.as_deref(), Some("2024-01-06"));
        assert_eq!(set.rows.len(), 1);

        let err = normalize_signal_response(&json!({"error": "No data available on or before 1990-01-01"}));
        assert!(err.is_empty());
        assert!(err.notice.unwrap().contains("1990-01-01"));
    }
}
