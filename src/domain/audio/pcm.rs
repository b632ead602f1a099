//! Audio Context - PCM 样本缓冲区

use serde::{Deserialize, Serialize};

/// 解码后的单个音频片段（平面布局，每声道一个样本序列）
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// 单声道缓冲区
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    /// 从交错样本构建（L R L R ...）
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, interleaved: &[f32]) -> Self {
        let channel_count = channel_count.max(1);
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, sample) in frame.iter().enumerate() {
                channels[ch].push(*sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 每声道帧数（以第一个声道为准）
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// 所有声道长度是否一致
    pub(crate) fn is_rectangular(&self) -> bool {
        let frames = self.frames();
        self.channels.iter().all(|c| c.len() == frames)
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }
}

/// 拼接完成的完整波形
///
/// 不变量: 所有声道长度相同，`channel_count == samples.len()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledAudio {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub samples: Vec<Vec<f32>>,
}

impl AssembledAudio {
    /// 每声道帧数
    pub fn frames(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }

    /// 交错输出（立体声 L/R 交替；单声道原样）
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let channels = self.samples.len();
        if channels == 1 {
            return self.samples[0].clone();
        }
        let mut out = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for channel in &self.samples {
                out.push(channel[i]);
            }
        }
        out
    }
}

impl From<PcmBuffer> for AssembledAudio {
    fn from(buffer: PcmBuffer) -> Self {
        Self {
            sample_rate: buffer.sample_rate,
            channel_count: buffer.channels.len() as u16,
            samples: buffer.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_splits_channels() {
        let buffer = PcmBuffer::from_interleaved(8000, 2, &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2, -0.3]);
    }

    #[test]
    fn test_interleave_stereo() {
        let audio = AssembledAudio {
            sample_rate: 8000,
            channel_count: 2,
            samples: vec![vec![1.0, 2.0], vec![-1.0, -2.0]],
        };
        assert_eq!(audio.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_duration() {
        let buffer = PcmBuffer::mono(16000, vec![0.0; 8000]);
        assert_eq!(buffer.duration_ms(), 500);
    }
}
