//! 播放控制 - 状态机与控制循环

mod sequencer;
mod state;

pub use sequencer::PlaybackSequencer;
pub use state::{
    milestones, sequence_progress, PlaybackMode, PlaybackSession, PlaybackSnapshot,
    PlaybackState, SessionTicket,
};
