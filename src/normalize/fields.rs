use serde_json::Value;

/// 取有限数值；null、NaN 与非数值一律视为缺失
pub(crate) fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// 整数，兼容 pandas 输出的 `12.0`
pub(crate) fn integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    number(value)
        .filter(|v| v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64)
        .map(|v| v as i64)
}

/// 非负计数
pub(crate) fn count(value: &Value) -> Option<u64> {
    integer(value).and_then(|v| u64::try_from(v).ok())
}

/// 文本字段；数值按原样转成字符串
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 取响应中的数组字段；缺失或类型不符时返回空切片
pub(crate) fn collection<'a>(response: &'a Value, key: &str) -> &'a [Value] {
    response
        .get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}
