use crate::normalize::fields::collection;
use crate::strategy::{AlphaDescriptor, StrategyTemplate};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

fn entries<T: DeserializeOwned>(response: &Value, key: &str) -> Vec<T> {
    collection(response, key)
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| match serde_json::from_value::<T>(raw.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("{} 目录第 {} 项无法解析: {}", key, idx + 1, e);
                None
            }
        })
        .collect()
}

/// `{strategies: [...]}`，缺失时为空
pub fn normalize_strategy_catalog(response: &Value) -> Vec<StrategyTemplate> {
    entries(response, "strategies")
}

/// `{alphas: [...]}`，缺失时为空
pub fn normalize_alpha_catalog(response: &Value) -> Vec<AlphaDescriptor> {
    entries(response, "alphas")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alpha_catalog_keeps_valid_entries() {
        let alphas = normalize_alpha_catalog(&json!({
            "alphas": [
                {"key": "ml", "name": "Machine Learning Alpha", "requires_model": true},
                {"name": "no key"},
                {"key": "momentum", "name": "Momentum Alpha", "requires_model": false}
            ]
        }));
        let keys: Vec<&str> = alphas.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["ml", "momentum"]);
        assert!(alphas[0].requires_model);
    }

    #[test]
    fn strategy_catalog_parses_templates() {
        let strategies = normalize_strategy_catalog(&json!({
            "strategies": [{
                "id": "multi_alpha_default",
                "name": "Multi-Alpha (ML + Momentum + Breakout)",
                "alphas": {
                    "ml": {"enabled": true, "weight": 0.5},
                    "momentum": {"enabled": true, "weight": 0.3},
                    "breakout": {"enabled": true, "weight": 0.2}
                },
                "execution": {"top_k": 3, "hold_days": 10, "round_trip_cost": 0.003, "no_trade_lookback": 20}
            }]
        }));
        assert_eq!(strategies.len(), 1);
        let t = &strategies[0];
        assert_eq!(t.alphas.keys().collect::<Vec<_>>(), vec!["ml", "momentum", "breakout"]);
        assert_eq!(t.execution.hold_days, Some(10));
    }

    #[test]
    fn missing_catalogs_are_empty() {
        assert!(normalize_strategy_catalog(&json!({})).is_empty());
        assert!(normalize_alpha_catalog(&json!({"alphas": null})).is_empty());
    }
}
