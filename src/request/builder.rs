use crate::request::urls::*;
use crate::strategy::{AlphaConfiguration, StrategyParameters};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 引擎支持的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RunBacktest,
    EquityCurve,
    LiveSignals,
    DatedSignals,
    WalkForward,
    StrategyCatalog,
    AlphaCatalog,
}

impl Operation {
    pub fn method(&self) -> Method {
        match self {
            Self::StrategyCatalog | Self::AlphaCatalog => Method::Get,
            _ => Method::Post,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::RunBacktest => PATH_BACKTEST_RUN,
            Self::EquityCurve => PATH_BACKTEST_EQUITY,
            Self::LiveSignals => PATH_SIGNALS_LIVE,
            Self::DatedSignals => PATH_SIGNALS_DATE,
            Self::WalkForward => PATH_WALKFORWARD_RUN,
            Self::StrategyCatalog => PATH_STRATEGIES,
            Self::AlphaCatalog => PATH_ALPHAS,
        }
    }
}

/// 信号查询参数，与请求体并列传递，不并入 `alphas`
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuery {
    pub date: Option<String>,
    /// 返回的信号行数
    pub top_k: i64,
    pub min_price: f64,
    pub min_volume: i64,
}

impl Default for SignalQuery {
    fn default() -> Self {
        Self {
            date: None,
            top_k: 5,
            min_price: 0.0,
            min_volume: 0,
        }
    }
}

impl SignalQuery {
    fn to_pairs(&self, include_date: bool) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if include_date {
            if let Some(date) = self.date.as_deref().filter(|d| !d.trim().is_empty()) {
                pairs.push(("date".to_string(), date.trim().to_string()));
            }
        }
        pairs.push(("top_k".to_string(), self.top_k.to_string()));
        pairs.push(("min_price".to_string(), self.min_price.to_string()));
        pairs.push(("min_volume".to_string(), self.min_volume.to_string()));
        pairs
    }
}

/// 一次待发送的引擎请求，与具体传输无关
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub operation: Operation,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl EngineRequest {
    pub fn method(&self) -> Method {
        self.operation.method()
    }

    pub fn path(&self) -> &'static str {
        self.operation.path()
    }
}

/// 组装请求体：`alphas` 为完整配置，执行参数平铺在顶层
///
/// 纯函数，不做校验，越界值原样透传。
pub fn build_payload(alphas: &AlphaConfiguration, params: &StrategyParameters) -> Value {
    let mut body = Map::new();
    body.insert("alphas".to_string(), json!(alphas));
    if let Ok(Value::Object(fields)) = serde_json::to_value(params) {
        body.extend(fields);
    }
    Value::Object(body)
}

/// 信号请求体只携带 `alphas`
pub fn build_signal_payload(alphas: &AlphaConfiguration) -> Value {
    json!({ "alphas": alphas })
}

pub fn build_request(
    operation: Operation,
    alphas: &AlphaConfiguration,
    params: &StrategyParameters,
    query: &SignalQuery,
) -> EngineRequest {
    let (query, body) = match operation {
        Operation::RunBacktest | Operation::EquityCurve | Operation::WalkForward => {
            (Vec::new(), Some(build_payload(alphas, params)))
        }
        Operation::LiveSignals => (query.to_pairs(false), Some(build_signal_payload(alphas))),
        Operation::DatedSignals => (query.to_pairs(true), Some(build_signal_payload(alphas))),
        Operation::StrategyCatalog | Operation::AlphaCatalog => (Vec::new(), None),
    };
    EngineRequest {
        operation,
        query,
        body,
    }
}

/// 目录读取请求（GET，无请求体）
pub fn catalog_request(operation: Operation) -> EngineRequest {
    EngineRequest {
        operation,
        query: Vec::new(),
        body: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::alpha::{AlphaEntry, AlphaField};
    use crate::strategy::ParamField;

    fn alphas() -> AlphaConfiguration {
        AlphaConfiguration::from_entries([
            ("momentum", AlphaEntry::new(true, 0.6)),
            ("ml", AlphaEntry::new(false, 0.4)),
        ])
    }

    #[test]
    fn payload_spreads_params_next_to_alphas() {
        let body = build_payload(&alphas(), &StrategyParameters::default());
        let obj = body.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "alphas",
                "top_k",
                "hold_days",
                "trade_notional",
                "round_trip_cost",
                "use_trend_filter",
                "use_vol_filter",
                "no_trade_lookback"
            ]
        );
        assert_eq!(body["alphas"]["ml"]["enabled"], Value::Bool(false));
        assert_eq!(body["alphas"]["ml"]["weight"], Value::from(0.4));
        assert_eq!(body["top_k"], Value::from(3));
        let alpha_keys: Vec<&str> = body["alphas"]
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(alpha_keys, vec!["momentum", "ml"]);
    }

    #[test]
    fn payload_uses_the_serialized_form_of_both_types() {
        let params = StrategyParameters::default();
        let body = build_payload(&alphas(), &params);
        assert_eq!(body["alphas"], serde_json::to_value(alphas()).unwrap());
        let fields = serde_json::to_value(&params).unwrap();
        for (key, value) in fields.as_object().unwrap() {
            assert_eq!(&body[key], value);
        }
        assert_eq!(build_signal_payload(&alphas())["alphas"], body["alphas"]);
    }

    #[test]
    fn payload_passes_out_of_range_values_through() {
        let params = StrategyParameters::default()
            .set(ParamField::TopK, "-2")
            .unwrap()
            .set(ParamField::RoundTripCost, "3.5")
            .unwrap();
        let cfg = alphas()
            .update("momentum", AlphaField::Weight(7.0))
            .unwrap();
        let body = build_payload(&cfg, &params);
        assert_eq!(body["top_k"], Value::from(-2));
        assert_eq!(body["round_trip_cost"], Value::from(3.5));
        assert_eq!(body["alphas"]["momentum"]["weight"], Value::from(7.0));
    }

    #[test]
    fn signal_requests_carry_query_beside_alphas() {
        let query = SignalQuery {
            date: Some("2024-03-01".to_string()),
            top_k: 10,
            min_price: 50.5,
            min_volume: 1000,
        };
        let req = build_request(
            Operation::DatedSignals,
            &alphas(),
            &StrategyParameters::default(),
            &query,
        );
        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.path(), "/signals/date");
        let body = req.body.unwrap();
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert!(body["alphas"].get("top_k").is_none());
        assert_eq!(
            req.query,
            vec![
                ("date".to_string(), "2024-03-01".to_string()),
                ("top_k".to_string(), "10".to_string()),
                ("min_price".to_string(), "50.5".to_string()),
                ("min_volume".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn live_signals_never_send_a_date() {
        let query = SignalQuery {
            date: Some("2024-03-01".to_string()),
            ..SignalQuery::default()
        };
        let req = build_request(
            Operation::LiveSignals,
            &alphas(),
            &StrategyParameters::default(),
            &query,
        );
        assert!(req.query.iter().all(|(k, _)| k != "date"));
        assert_eq!(req.query[0], ("top_k".to_string(), "5".to_string()));
        assert_eq!(req.query[1], ("min_price".to_string(), "0".to_string()));
    }

    #[test]
    fn dated_signals_without_date_omit_it() {
        let req = build_request(
            Operation::DatedSignals,
            &alphas(),
            &StrategyParameters::default(),
            &SignalQuery::default(),
        );
        assert_eq!(req.query.len(), 3);
    }

    #[test]
    fn backtest_operations_share_the_full_payload() {
        let params = StrategyParameters::default();
        let query = SignalQuery::default();
        for op in [
            Operation::RunBacktest,
            Operation::EquityCurve,
            Operation::WalkForward,
        ] {
            let req = build_request(op, &alphas(), &params, &query);
            assert!(req.query.is_empty());
            assert_eq!(req.body, Some(build_payload(&alphas(), &params)));
        }
    }

    #[test]
    fn catalogs_are_bodyless_gets() {
        let req = catalog_request(Operation::AlphaCatalog);
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.path(), "/alphas");
        assert!(req.body.is_none());
    }
}
