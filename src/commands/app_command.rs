use crate::app_state::Page;
use chrono::NaiveDate;
use std::str::FromStr;

/// 对单个 alpha 的操作
#[derive(Debug, Clone, PartialEq)]
pub enum AlphaAction {
    On,
    Off,
    Toggle,
    Weight(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    LiveSignals,
    DatedSignals {
        date: Option<String>,
    },
    Set {
        field: String,
        value: String,
    },
    Alpha {
        key: String,
        action: AlphaAction,
    },
    RunBacktest,
    EquityCurve,
    WalkForward,
    ReloadCatalogs,
    ApplyTemplate {
        id: String,
    },
    SwitchPage(Page),
    Validate,
    Undo,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "可用命令: live | analyze [YYYY-MM-DD] | set <字段> <值> | alpha <key> on|off|toggle|<权重> | backtest | equity | wf | strategies | template <id> | page <signals|backtest|wf|strategies> | validate | undo | quit";

/// 数字一律视为权重，`1`/`0` 不当作开关
fn parse_alpha_action(raw: &str) -> Option<AlphaAction> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "enable" | "true" | "yes" => Some(AlphaAction::On),
        "off" | "disable" | "false" | "no" => Some(AlphaAction::Off),
        "toggle" | "t" => Some(AlphaAction::Toggle),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite())
            .map(AlphaAction::Weight),
    }
}

/// `YYYY-MM-DD`，其余格式拒绝
pub fn parse_date_arg(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "live" => Ok(AppCommand::LiveSignals),
            "analyze" | "signals" => match parts.get(1) {
                None => Ok(AppCommand::DatedSignals { date: None }),
                Some(raw) => match parse_date_arg(raw) {
                    Some(date) => Ok(AppCommand::DatedSignals { date: Some(date) }),
                    None => Ok(AppCommand::Unknown(format!(
                        "日期格式应为 YYYY-MM-DD: {}",
                        raw
                    ))),
                },
            },
            "set" => match (parts.get(1), parts.get(2)) {
                (Some(field), Some(_)) => Ok(AppCommand::Set {
                    field: field.to_string(),
                    value: parts[2..].join(" "),
                }),
                _ => Ok(AppCommand::Unknown("用法: set <字段> <值>".to_string())),
            },
            "alpha" => match (parts.get(1), parts.get(2)) {
                (Some(key), Some(raw)) => match parse_alpha_action(raw) {
                    Some(action) => Ok(AppCommand::Alpha {
                        key: key.to_string(),
                        action,
                    }),
                    None => Ok(AppCommand::Unknown(format!(
                        "无法识别的 alpha 操作: {}",
                        raw
                    ))),
                },
                _ => Ok(AppCommand::Unknown(
                    "用法: alpha <key> on|off|toggle|<权重>".to_string(),
                )),
            },
            "backtest" | "bt" => Ok(AppCommand::RunBacktest),
            "equity" => Ok(AppCommand::EquityCurve),
            "walkforward" | "wf" => Ok(AppCommand::WalkForward),
            "strategies" | "reload" => Ok(AppCommand::ReloadCatalogs),
            "template" => match parts.get(1) {
                Some(id) => Ok(AppCommand::ApplyTemplate { id: id.to_string() }),
                None => Ok(AppCommand::Unknown("用法: template <id>".to_string())),
            },
            "page" => match parts.get(1).and_then(|p| Page::parse(p)) {
                Some(page) => Ok(AppCommand::SwitchPage(page)),
                None => Ok(AppCommand::Unknown(
                    "用法: page <signals|backtest|wf|strategies>".to_string(),
                )),
            },
            "validate" | "check" => Ok(AppCommand::Validate),
            "undo" | "u" => Ok(AppCommand::Undo),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}
