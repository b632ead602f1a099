//! 音频拼接器
//!
//! 把按请求顺序解码好的片段首尾相接成一段连续波形。
//! 位置 i 的片段紧跟在位置 i-1 之后，顺序即朗读顺序。

use super::{AssembleError, AssembledAudio, PcmBuffer};

/// 拼接解码后的片段
///
/// 所有片段必须与第一个片段的采样率、声道数一致，否则拒绝拼接
/// （直接拼接会得到变调/错位的音频）。
pub fn assemble(buffers: &[PcmBuffer]) -> Result<AssembledAudio, AssembleError> {
    let first = buffers.first().ok_or(AssembleError::EmptyInput)?;

    let sample_rate = first.sample_rate();
    let channel_count = first.channel_count();

    for (index, buffer) in buffers.iter().enumerate() {
        if buffer.channel_count() == 0 || !buffer.is_rectangular() {
            return Err(AssembleError::MalformedBuffer(index));
        }
        if buffer.sample_rate() != sample_rate || buffer.channel_count() != channel_count {
            return Err(AssembleError::IncompatibleFormat {
                index,
                expected_rate: sample_rate,
                expected_channels: channel_count,
                actual_rate: buffer.sample_rate(),
                actual_channels: buffer.channel_count(),
            });
        }
    }

    let total_frames: usize = buffers.iter().map(PcmBuffer::frames).sum();

    let mut samples: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(total_frames))
        .collect();

    for buffer in buffers {
        for (out, input) in samples.iter_mut().zip(buffer.channels()) {
            out.extend_from_slice(input);
        }
    }

    tracing::debug!(
        chunks = buffers.len(),
        sample_rate = sample_rate,
        channels = channel_count,
        frames = total_frames,
        "Audio chunks assembled"
    );

    Ok(AssembledAudio {
        sample_rate,
        channel_count: channel_count as u16,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, offset: f32) -> Vec<f32> {
        (0..len).map(|i| offset + i as f32 / 10_000.0).collect()
    }

    #[test]
    fn test_length_is_sum_and_order_preserved() {
        let a = PcmBuffer::mono(16000, ramp(1000, 0.0));
        let b = PcmBuffer::mono(16000, ramp(1000, 0.2));
        let c = PcmBuffer::mono(16000, ramp(500, -0.5));

        let assembled = assemble(&[a.clone(), b.clone(), c.clone()]).unwrap();

        assert_eq!(assembled.frames(), 2500);
        assert_eq!(assembled.channel_count, 1);
        assert_eq!(&assembled.samples[0][..1000], a.channel(0).unwrap());
        assert_eq!(&assembled.samples[0][1000..2000], b.channel(0).unwrap());
        assert_eq!(&assembled.samples[0][2000..], c.channel(0).unwrap());
    }

    #[test]
    fn test_stereo_channels_stay_separate() {
        let a = PcmBuffer::new(22050, vec![vec![0.1; 10], vec![-0.1; 10]]);
        let b = PcmBuffer::new(22050, vec![vec![0.2; 5], vec![-0.2; 5]]);

        let assembled = assemble(&[a, b]).unwrap();

        assert_eq!(assembled.channel_count, 2);
        assert_eq!(assembled.samples[0].len(), 15);
        assert_eq!(assembled.samples[1].len(), 15);
        assert_eq!(assembled.samples[0][12], 0.2);
        assert_eq!(assembled.samples[1][3], -0.1);
    }

    #[test]
    fn test_single_buffer_is_identity() {
        let a = PcmBuffer::mono(8000, ramp(64, 0.0));
        let assembled = assemble(std::slice::from_ref(&a)).unwrap();
        assert_eq!(assembled, AssembledAudio::from(a));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(assemble(&[]), Err(AssembleError::EmptyInput));
    }

    #[test]
    fn test_mismatched_channels_rejected() {
        let mono = PcmBuffer::mono(16000, vec![0.0; 10]);
        let stereo = PcmBuffer::new(16000, vec![vec![0.0; 10], vec![0.0; 10]]);

        let err = assemble(&[mono, stereo]).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::IncompatibleFormat {
                index: 1,
                expected_channels: 1,
                actual_channels: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_mismatched_sample_rate_rejected() {
        let a = PcmBuffer::mono(16000, vec![0.0; 10]);
        let b = PcmBuffer::mono(24000, vec![0.0; 10]);

        let err = assemble(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::IncompatibleFormat {
                expected_rate: 16000,
                actual_rate: 24000,
                ..
            }
        ));
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let a = PcmBuffer::new(16000, vec![vec![0.0; 10], vec![0.0; 9]]);
        assert_eq!(assemble(&[a]), Err(AssembleError::MalformedBuffer(0)));
    }
}
