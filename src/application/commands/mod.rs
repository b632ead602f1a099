//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod cache_commands;
mod playback_commands;
mod prayer_commands;

pub mod handlers;

pub use cache_commands::*;
pub use playback_commands::*;
pub use prayer_commands::*;
