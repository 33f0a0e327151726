use crate::strategy::alpha::ConfigError;
use serde::{Deserialize, Serialize};

/// 提示性校验结果，仅用于界面提示
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 执行侧参数
///
/// 整数字段使用有符号类型，越界值原样透传给后端。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub top_k: i64,
    pub hold_days: i64,
    pub trade_notional: f64,
    pub round_trip_cost: f64,
    pub use_trend_filter: bool,
    pub use_vol_filter: bool,
    pub no_trade_lookback: i64,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            top_k: 3,
            hold_days: 10,
            trade_notional: 100_000.0,
            round_trip_cost: 0.003,
            use_trend_filter: true,
            use_vol_filter: true,
            no_trade_lookback: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    TopK,
    HoldDays,
    TradeNotional,
    RoundTripCost,
    TrendFilter,
    VolFilter,
    NoTradeLookback,
}

impl ParamField {
    pub const ALL: [ParamField; 7] = [
        ParamField::TopK,
        ParamField::HoldDays,
        ParamField::TradeNotional,
        ParamField::RoundTripCost,
        ParamField::TrendFilter,
        ParamField::VolFilter,
        ParamField::NoTradeLookback,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top_k" | "topk" => Some(Self::TopK),
            "hold_days" | "hold" => Some(Self::HoldDays),
            "trade_notional" | "notional" => Some(Self::TradeNotional),
            "round_trip_cost" | "cost" => Some(Self::RoundTripCost),
            "use_trend_filter" | "trend_filter" | "trend" => Some(Self::TrendFilter),
            "use_vol_filter" | "vol_filter" | "vol" => Some(Self::VolFilter),
            "no_trade_lookback" | "lookback" => Some(Self::NoTradeLookback),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TopK => "top_k",
            Self::HoldDays => "hold_days",
            Self::TradeNotional => "trade_notional",
            Self::RoundTripCost => "round_trip_cost",
            Self::TrendFilter => "use_trend_filter",
            Self::VolFilter => "use_vol_filter",
            Self::NoTradeLookback => "no_trade_lookback",
        }
    }
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl StrategyParameters {
    /// 按字段名修改，返回新值；解析失败时 `self` 不受影响
    pub fn set(&self, field: ParamField, raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: field.name().to_string(),
            value: raw.to_string(),
        };
        let raw = raw.trim();
        let mut next = self.clone();
        match field {
            ParamField::TopK => next.top_k = raw.parse().map_err(|_| invalid())?,
            ParamField::HoldDays => next.hold_days = raw.parse().map_err(|_| invalid())?,
            ParamField::TradeNotional => {
                next.trade_notional = raw.parse().map_err(|_| invalid())?
            }
            ParamField::RoundTripCost => {
                next.round_trip_cost = raw.parse().map_err(|_| invalid())?
            }
            ParamField::TrendFilter => next.use_trend_filter = parse_flag(raw).ok_or_else(invalid)?,
            ParamField::VolFilter => next.use_vol_filter = parse_flag(raw).ok_or_else(invalid)?,
            ParamField::NoTradeLookback => {
                next.no_trade_lookback = raw.parse().map_err(|_| invalid())?
            }
        }
        Ok(next)
    }

    /// 当前字段值的展示文本
    pub fn display(&self, field: ParamField) -> String {
        match field {
            ParamField::TopK => self.top_k.to_string(),
            ParamField::HoldDays => self.hold_days.to_string(),
            ParamField::TradeNotional => self.trade_notional.to_string(),
            ParamField::RoundTripCost => self.round_trip_cost.to_string(),
            ParamField::TrendFilter => self.use_trend_filter.to_string(),
            ParamField::VolFilter => self.use_vol_filter.to_string(),
            ParamField::NoTradeLookback => self.no_trade_lookback.to_string(),
        }
    }

    /// 提示性校验，不阻止请求
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.top_k <= 0 {
            issues.push(ValidationIssue::new("top_k", "top_k 应为正整数"));
        }
        if self.hold_days <= 0 {
            issues.push(ValidationIssue::new("hold_days", "hold_days 应为正整数"));
        }
        if !(self.trade_notional.is_finite() && self.trade_notional > 0.0) {
            issues.push(ValidationIssue::new("trade_notional", "trade_notional 应大于 0"));
        }
        if !self.round_trip_cost.is_finite() || !(0.0..=1.0).contains(&self.round_trip_cost) {
            issues.push(ValidationIssue::new(
                "round_trip_cost",
                "round_trip_cost 应在 [0, 1] 区间",
            ));
        }
        if self.no_trade_lookback < 0 {
            issues.push(ValidationIssue::new(
                "no_trade_lookback",
                "no_trade_lookback 不能为负",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyParameters::default().validate().is_empty());
    }

    #[test]
    fn set_parses_by_field() {
        let p = StrategyParameters::default();
        let p = p.set(ParamField::TopK, "7").unwrap();
        let p = p.set(ParamField::RoundTripCost, "0.01").unwrap();
        let p = p.set(ParamField::VolFilter, "off").unwrap();
        assert_eq!(p.top_k, 7);
        assert_eq!(p.round_trip_cost, 0.01);
        assert!(!p.use_vol_filter);
        assert!(p.use_trend_filter);
    }

    #[test]
    fn set_rejects_garbage_and_keeps_input() {
        let p = StrategyParameters::default();
        let err = p.set(ParamField::HoldDays, "ten").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: "hold_days".to_string(),
                value: "ten".to_string()
            }
        );
        assert_eq!(p, StrategyParameters::default());
    }

    #[test]
    fn out_of_range_values_are_accepted_but_flagged() {
        let p = StrategyParameters::default()
            .set(ParamField::TopK, "0")
            .unwrap()
            .set(ParamField::RoundTripCost, "1.5")
            .unwrap()
            .set(ParamField::NoTradeLookback, "-3")
            .unwrap();
        assert_eq!(p.top_k, 0);
        let fields: Vec<String> = p.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["top_k", "round_trip_cost", "no_trade_lookback"]);
    }

    #[test]
    fn field_aliases_resolve() {
        assert_eq!(ParamField::parse("cost"), Some(ParamField::RoundTripCost));
        assert_eq!(ParamField::parse("TOP_K"), Some(ParamField::TopK));
        assert_eq!(ParamField::parse("leverage"), None);
    }
}
