use crate::strategy::catalog::AlphaDescriptor;
use crate::strategy::params::ValidationIssue;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown alpha: {0}")]
    UnknownAlpha(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

fn default_weight() -> f64 {
    1.0
}

/// 单个 alpha 的开关与权重
///
/// 关闭的 alpha 保留权重（静音而非删除），只是不参与聚合计算。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaEntry {
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl AlphaEntry {
    pub fn new(enabled: bool, weight: f64) -> Self {
        Self { enabled, weight }
    }
}

/// 对单个 alpha 的一次编辑
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaField {
    Enabled(bool),
    Weight(f64),
}

/// alpha key -> AlphaEntry 的有序映射
///
/// key 集合由后端 alpha 目录决定，编辑不会增删 key，也不会改变顺序。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlphaConfiguration {
    entries: Vec<(String, AlphaEntry)>,
}

impl AlphaConfiguration {
    /// 按给定顺序构建；重复 key 以后出现的值为准，位置保持第一次出现处
    pub fn from_entries<I, K>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, AlphaEntry)>,
        K: Into<String>,
    {
        let mut entries: Vec<(String, AlphaEntry)> = Vec::new();
        for (key, entry) in iter {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = entry,
                None => entries.push((key, entry)),
            }
        }
        Self { entries }
    }

    /// 启动时的默认组合，目录加载后会被整体替换
    pub fn default_set() -> Self {
        Self::from_entries([
            ("ml", AlphaEntry::new(true, 0.4)),
            ("momentum", AlphaEntry::new(true, 0.4)),
            ("breakout", AlphaEntry::new(false, 0.2)),
        ])
    }

    /// 根据后端 alpha 目录重建 key 集合
    ///
    /// 顺序跟随目录；已有 key 沿用 `previous` 中的设置，新 key 默认启用、等权。
    pub fn from_catalog(descriptors: &[AlphaDescriptor], previous: &AlphaConfiguration) -> Self {
        let n = descriptors.len().max(1) as f64;
        Self::from_entries(descriptors.iter().map(|d| {
            let entry = previous
                .get(&d.key)
                .copied()
                .unwrap_or_else(|| AlphaEntry::new(true, 1.0 / n));
            (d.key.clone(), entry)
        }))
    }

    pub fn get(&self, key: &str) -> Option<&AlphaEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AlphaEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 返回只修改了 `key` 一个字段的新配置，`self` 不变
    ///
    /// 关闭状态下也允许修改权重。
    pub fn update(&self, key: &str, field: AlphaField) -> Result<Self, ConfigError> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k == key)
            .ok_or_else(|| ConfigError::UnknownAlpha(key.to_string()))?;

        let mut next = self.clone();
        let entry = &mut next.entries[idx].1;
        match field {
            AlphaField::Enabled(enabled) => entry.enabled = enabled,
            AlphaField::Weight(weight) => entry.weight = weight,
        }
        Ok(next)
    }

    pub fn enabled(&self) -> impl Iterator<Item = (&str, &AlphaEntry)> {
        self.iter().filter(|(_, e)| e.enabled)
    }

    /// 已启用 alpha 的权重合计，关闭的条目不计入
    pub fn total_enabled_weight(&self) -> f64 {
        self.enabled().map(|(_, e)| e.weight).sum()
    }

    /// 提示性校验，不阻止请求
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (key, entry) in self.iter() {
            if !entry.weight.is_finite() || !(0.0..=1.0).contains(&entry.weight) {
                issues.push(ValidationIssue::new(
                    format!("alphas.{}.weight", key),
                    format!("权重 {} 不在 [0, 1] 区间", entry.weight),
                ));
            }
        }
        if !self.is_empty() && self.enabled().next().is_none() {
            issues.push(ValidationIssue::new("alphas", "没有启用任何 alpha"));
        }
        issues
    }
}

impl Serialize for AlphaConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AlphaConfiguration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let entry: AlphaEntry = serde_json::from_value(value)
                .map_err(|e| <D::Error as DeError>::custom(format!("alpha {}: {}", key, e)))?;
            entries.push((key, entry));
        }
        Ok(Self::from_entries(entries))
    }
}
