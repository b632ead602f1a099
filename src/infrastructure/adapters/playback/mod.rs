//! Playback Adapter - 播放输出实现

mod clocked_sink;

pub use clocked_sink::ClockedSink;
