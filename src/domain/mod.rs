//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Prayer Context: 祈祷文（内置 + 用户自定义）
//! - Audio Context: 解码样本与片段拼接

pub mod audio;
pub mod prayer;
