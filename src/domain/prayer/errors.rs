//! Prayer Context - Errors

use thiserror::Error;

use super::PrayerId;

#[derive(Debug, Error)]
pub enum PrayerError {
    #[error("祈祷文不存在: {0}")]
    NotFound(PrayerId),

    #[error("内置祈祷文不可删除: {0}")]
    Immutable(PrayerId),

    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的文本内容: {0}")]
    InvalidContent(String),

    #[error("存储错误: {0}")]
    StorageError(String),
}
