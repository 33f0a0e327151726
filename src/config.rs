use crate::request::DEFAULT_API_URL;
use anyhow::{bail, Context};
use std::time::Duration;

pub const ENV_API_URL: &str = "ALPHADESK_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "ALPHADESK_TIMEOUT_SECS";
pub const ENV_SIGNAL_ROWS: &str = "ALPHADESK_SIGNAL_ROWS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNAL_ROWS: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout: Duration,
    /// 信号查询默认返回行数
    pub signal_rows: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            signal_rows: DEFAULT_SIGNAL_ROWS,
        }
    }
}

impl AppConfig {
    /// 加载 `.env`（若存在）后读取环境变量，启动信息写入 `startup`
    pub fn load(startup: &mut Vec<String>) -> anyhow::Result<Self> {
        match dotenv::dotenv() {
            Ok(path) => startup.push(format!("✓ 找到 .env 文件: {}", path.display())),
            Err(_) => startup.push("⚠ 未找到 .env 文件，从系统环境变量读取".to_string()),
        }
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        startup.push(format!("✓ 引擎地址: {}", config.api_url));
        startup.push(format!(
            "✓ 请求超时: {}s, 信号行数: {}",
            config.timeout.as_secs(),
            config.signal_rows
        ));
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_URL) {
            let url = url.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{} 必须以 http:// 或 https:// 开头: {}", ENV_API_URL, url);
            }
            config.api_url = url.to_string();
        }
        if let Some(raw) = non_empty(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} 不是有效的秒数: {}", ENV_TIMEOUT_SECS, raw))?;
            config.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(raw) = non_empty(ENV_SIGNAL_ROWS) {
            config.signal_rows = raw
                .trim()
                .parse()
                .with_context(|| format!("{} 不是有效的整数: {}", ENV_SIGNAL_ROWS, raw))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.signal_rows, 5);
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://engine.local/api"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_SIGNAL_ROWS, "20"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://engine.local/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.signal_rows, 20);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_API_URL, "engine.local")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_SIGNAL_ROWS, "1.5")])).is_err());
    }
}
