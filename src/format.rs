use crate::normalize::signals::CURRENT_PRICE;
use regex::Regex;
use std::sync::OnceLock;

/// 缺失值的统一显示，区别于 0
pub const NO_DATA: &str = "-";

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("valid date pattern"))
}

fn group_thousands(int_part: &str) -> String {
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// 单价：`₹123.45`
pub fn format_price(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("₹{:.2}", v),
        None => NO_DATA.to_string(),
    }
}

/// 金额，带千分位：`₹ 1,234,567.89`
pub fn format_currency(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NO_DATA.to_string();
    };
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("₹ {}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// 比例转百分比：0.553 -> `55.3%`
pub fn format_ratio_pct(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.*}%", decimals, v * 100.0),
        None => NO_DATA.to_string(),
    }
}

/// 已是百分数的涨跌幅，正数带 `+`
pub fn format_change_pct(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) if v > 0.0 => format!("+{:.2}%", v),
        Some(v) => format!("{:.2}%", v),
        None => NO_DATA.to_string(),
    }
}

pub fn format_score(value: f64) -> String {
    format!("{:.4}", value)
}

/// `YYYY-MM-DD` -> `DD/MM/YYYY`，其他文本原样返回
pub fn format_date(value: Option<&str>) -> String {
    let Some(s) = value.filter(|s| !s.is_empty()) else {
        return NO_DATA.to_string();
    };
    match iso_date_re().captures(s) {
        Some(caps) => format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]),
        None => s.to_string(),
    }
}

/// 价格列表头
pub fn column_header(column: &str) -> String {
    if column == CURRENT_PRICE {
        return "当前价".to_string();
    }
    match column.strip_prefix("price_") {
        Some(date) => format_date(Some(date)),
        None => column.to_string(),
    }
}
