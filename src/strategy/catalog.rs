use crate::strategy::alpha::AlphaConfiguration;
use crate::strategy::params::StrategyParameters;
use serde::{Deserialize, Serialize};

/// 后端 alpha 目录中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaDescriptor {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub requires_model: bool,
}

/// 策略模板中的执行预设，缺省字段沿用当前参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPreset {
    pub top_k: Option<i64>,
    pub hold_days: Option<i64>,
    pub round_trip_cost: Option<f64>,
    pub no_trade_lookback: Option<i64>,
}

/// 后端提供的策略模板（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alphas: AlphaConfiguration,
    #[serde(default)]
    pub execution: ExecutionPreset,
}

impl StrategyTemplate {
    /// 把模板的执行预设叠加到现有参数上，返回新参数
    pub fn apply_to(&self, params: &StrategyParameters) -> StrategyParameters {
        let preset = &self.execution;
        StrategyParameters {
            top_k: preset.top_k.unwrap_or(params.top_k),
            hold_days: preset.hold_days.unwrap_or(params.hold_days),
            round_trip_cost: preset.round_trip_cost.unwrap_or(params.round_trip_cost),
            no_trade_lookback: preset.no_trade_lookback.unwrap_or(params.no_trade_lookback),
            ..params.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_overrides_only_preset_fields() {
        let template: StrategyTemplate = serde_json::from_value(serde_json::json!({
            "id": "multi_alpha_default",
            "name": "Multi-Alpha",
            "alphas": {"ml": {"enabled": true, "weight": 0.5}},
            "execution": {"top_k": 5, "hold_days": 15}
        }))
        .unwrap();
        let params = StrategyParameters {
            trade_notional: 50_000.0,
            ..StrategyParameters::default()
        };
        let applied = template.apply_to(&params);
        assert_eq!(applied.top_k, 5);
        assert_eq!(applied.hold_days, 15);
        assert_eq!(applied.round_trip_cost, params.round_trip_cost);
        assert_eq!(applied.trade_notional, 50_000.0);
    }
}
