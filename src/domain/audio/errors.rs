//! Audio Context - Errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("没有可拼接的音频片段")]
    EmptyInput,

    #[error(
        "片段 {index} 格式不一致: 期望 {expected_rate}Hz/{expected_channels}ch, 实际 {actual_rate}Hz/{actual_channels}ch"
    )]
    IncompatibleFormat {
        index: usize,
        expected_rate: u32,
        expected_channels: usize,
        actual_rate: u32,
        actual_channels: usize,
    },

    #[error("片段 {0} 的声道长度不一致或没有声道")]
    MalformedBuffer(usize),
}
