//! Audio Context - 音频限界上下文
//!
//! 职责:
//! - 解码片段的样本缓冲区
//! - 片段拼接（保序、无损）

mod assembler;
mod errors;
mod pcm;

pub use assembler::assemble;
pub use errors::AssembleError;
pub use pcm::{AssembledAudio, PcmBuffer};
