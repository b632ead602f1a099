//! Prayer Context - Value Objects

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 自定义祈祷文 ID 前缀
pub const CUSTOM_ID_PREFIX: &str = "custom_";

/// 祈祷文唯一标识
///
/// 内置祈祷文使用固定 ID（如 `salmo23`），用户添加的使用 `custom_<毫秒时间戳>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrayerId(String);

impl PrayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 基于当前时间生成自定义 ID
    pub fn generate() -> Self {
        Self::from_millis(Utc::now().timestamp_millis())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(format!("{}{}", CUSTOM_ID_PREFIX, millis))
    }

    /// 解析自定义 ID 中的时间戳部分
    pub fn custom_millis(&self) -> Option<i64> {
        self.0.strip_prefix(CUSTOM_ID_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PrayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 祈祷文来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerOrigin {
    /// 内置（不可删除）
    BuiltIn,
    /// 用户添加
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_custom() {
        let id = PrayerId::from_millis(1_700_000_000_123);
        assert_eq!(id.as_str(), "custom_1700000000123");
        assert_eq!(id.custom_millis(), Some(1_700_000_000_123));
    }

    #[test]
    fn test_builtin_id_has_no_millis() {
        assert_eq!(PrayerId::from("salmo23").custom_millis(), None);
    }
}
