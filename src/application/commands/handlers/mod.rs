//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod cache_handlers;
mod playback_handlers;
mod prayer_handlers;

pub use cache_handlers::*;
pub use playback_handlers::*;
pub use prayer_handlers::*;
