//! Prayer Context - Aggregate Root

use serde::{Deserialize, Serialize};

use super::{PrayerError, PrayerId, PrayerOrigin};

/// 标题最大长度（字符）
const MAX_TITLE_CHARS: usize = 200;

/// 祈祷文记录
///
/// 不变量:
/// - 标题、正文去除首尾空白后非空
/// - 合并视图中 id 唯一，用户记录覆盖同 id 的内置记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerRecord {
    pub id: PrayerId,
    pub title: String,
    pub text: String,
    pub origin: PrayerOrigin,
}

impl PrayerRecord {
    /// 创建用户祈祷文（校验并去除首尾空白）
    pub fn custom(id: PrayerId, title: &str, text: &str) -> Result<Self, PrayerError> {
        let title = title.trim();
        let text = text.trim();

        if title.is_empty() {
            return Err(PrayerError::InvalidTitle("标题不能为空".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(PrayerError::InvalidTitle(format!(
                "标题长度不能超过{}字符",
                MAX_TITLE_CHARS
            )));
        }
        if text.is_empty() {
            return Err(PrayerError::InvalidContent("正文不能为空".to_string()));
        }

        Ok(Self {
            id,
            title: title.to_string(),
            text: text.to_string(),
            origin: PrayerOrigin::Custom,
        })
    }

    pub(crate) fn builtin(id: &str, title: &str, text: &str) -> Self {
        Self {
            id: PrayerId::new(id),
            title: title.to_string(),
            text: text.to_string(),
            origin: PrayerOrigin::BuiltIn,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == PrayerOrigin::BuiltIn
    }

    /// 可朗读的文本
    pub fn narration_text(&self) -> &str {
        self.text.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_trims_fields() {
        let record = PrayerRecord::custom(PrayerId::from("custom_1"), "  Padre Nuestro ", "\nAmén\n")
            .unwrap();
        assert_eq!(record.title, "Padre Nuestro");
        assert_eq!(record.text, "Amén");
        assert!(!record.is_builtin());
    }

    #[test]
    fn test_custom_rejects_blank() {
        assert!(matches!(
            PrayerRecord::custom(PrayerId::from("custom_1"), "   ", "texto"),
            Err(PrayerError::InvalidTitle(_))
        ));
        assert!(matches!(
            PrayerRecord::custom(PrayerId::from("custom_1"), "T", " \n "),
            Err(PrayerError::InvalidContent(_))
        ));
    }
}
