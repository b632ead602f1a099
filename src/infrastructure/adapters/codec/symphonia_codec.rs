//! Symphonia Codec - 基于 symphonia 的片段解码器 + WAV 编码器
//!
//! 支持：
//! - WAV / MP3 片段解码（按调用方声明的 mime 选择容器）
//! - WAV 头解析和信息提取
//! - 拼接结果编码为 16-bit PCM WAV

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, AudioInfo, ChunkMimeType, CodecError};
use crate::domain::audio::{AssembledAudio, PcmBuffer};

/// 标准 WAV 头长度（RIFF + fmt(16) + data 头）
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// 浮点样本量化为 16 位整数
///
/// 先钳制到 [-1, 1]；负值乘 32768，非负值乘 32767，向零截断。
pub fn quantize_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0) as f64;
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Symphonia 编解码器
#[derive(Debug, Clone, Default)]
pub struct SymphoniaCodec;

impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }

    /// 解析 WAV 文件头
    fn parse_wav_header(&self, data: &[u8]) -> Result<WavHeader, CodecError> {
        if data.len() < 12 {
            return Err(CodecError::InvalidInput("WAV data too short".to_string()));
        }

        // 验证 RIFF 头
        if &data[0..4] != b"RIFF" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing RIFF header".to_string(),
            ));
        }

        // 验证 WAVE 标识
        if &data[8..12] != b"WAVE" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing WAVE identifier".to_string(),
            ));
        }

        // 逐个遍历 chunk，直到找到 data
        let mut pos = 12;
        let mut fmt_chunk: Option<FmtChunk> = None;
        let mut data_chunk: Option<(usize, usize)> = None;

        while pos + 8 <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size = read_u32(data, pos + 4) as usize;
            let body_start = pos + 8;

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || body_start + 16 > data.len() {
                        return Err(CodecError::InvalidInput(
                            "Invalid WAV: truncated fmt chunk".to_string(),
                        ));
                    }
                    fmt_chunk = Some(FmtChunk {
                        audio_format: read_u16(data, body_start),
                        num_channels: read_u16(data, body_start + 2),
                        sample_rate: read_u32(data, body_start + 4),
                        bits_per_sample: read_u16(data, body_start + 14),
                    });
                }
                b"data" => {
                    // 流式写出的 WAV 可能声明超长的 data，按实际可用字节截断
                    let available = data.len() - body_start;
                    data_chunk = Some((body_start, chunk_size.min(available)));
                    break;
                }
                _ => {}
            }

            pos = body_start.saturating_add(chunk_size);
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos = pos.saturating_add(1);
            }
        }

        let fmt = fmt_chunk
            .ok_or_else(|| CodecError::InvalidInput("Invalid WAV: missing fmt chunk".to_string()))?;
        let (data_start, data_size) = data_chunk
            .ok_or_else(|| CodecError::InvalidInput("Invalid WAV: missing data chunk".to_string()))?;

        if fmt.num_channels == 0 || fmt.sample_rate == 0 {
            return Err(CodecError::InvalidInput(format!(
                "Invalid WAV: {} channels at {}Hz",
                fmt.num_channels, fmt.sample_rate
            )));
        }

        Ok(WavHeader {
            fmt,
            data_start,
            data_size,
        })
    }

    /// 使用 symphonia 解码容器，输出平面 f32 样本
    fn decode_with_symphonia(
        &self,
        data: &[u8],
        mime: ChunkMimeType,
    ) -> Result<PcmBuffer, CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(mime.extension());
        hint.mime_type(mime.as_str());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_rate = codec_params.sample_rate;
        let mut channel_count = codec_params.channels.map(|c| c.count());

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(CodecError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(mime = %mime, "Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(format!("Decode failed: {}", e)));
                }
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }

            sample_rate.get_or_insert(spec.rate);
            let channels = *channel_count.get_or_insert(spec.channels.count());
            if spec.channels.count() != channels {
                return Err(CodecError::DecodingError(format!(
                    "Channel layout changed mid-stream: {} -> {}",
                    channels,
                    spec.channels.count()
                )));
            }

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            // 只取实际样本，不取整个缓冲区容量
            let actual_samples = num_frames * channels;
            interleaved.extend(&sample_buf.samples()[..actual_samples]);
        }

        let sample_rate = sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;
        let channel_count = channel_count
            .ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        if interleaved.is_empty() {
            return Err(CodecError::DecodingError(
                "No audio frames decoded".to_string(),
            ));
        }

        Ok(PcmBuffer::from_interleaved(
            sample_rate,
            channel_count,
            &interleaved,
        ))
    }
}

#[derive(Debug)]
struct WavHeader {
    fmt: FmtChunk,
    #[allow(dead_code)]
    data_start: usize,
    data_size: usize,
}

#[derive(Debug)]
struct FmtChunk {
    audio_format: u16,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

impl AudioCodecPort for SymphoniaCodec {
    fn decode(&self, data: &[u8], mime: ChunkMimeType) -> Result<PcmBuffer, CodecError> {
        if mime == ChunkMimeType::Wav {
            // 先做结构校验，给出比 probe 失败更明确的错误
            let header = self.parse_wav_header(data)?;
            tracing::trace!(
                audio_format = header.fmt.audio_format,
                channels = header.fmt.num_channels,
                sample_rate = header.fmt.sample_rate,
                data_size = header.data_size,
                "WAV chunk header parsed"
            );
        }
        self.decode_with_symphonia(data, mime)
    }

    fn encode_wav(&self, audio: &AssembledAudio) -> Result<Vec<u8>, CodecError> {
        if audio.channel_count == 0 || audio.samples.len() != audio.channel_count as usize {
            return Err(CodecError::EncodingError(format!(
                "channel_count {} does not match {} sample channels",
                audio.channel_count,
                audio.samples.len()
            )));
        }
        if audio.sample_rate == 0 {
            return Err(CodecError::EncodingError("sample rate is 0".to_string()));
        }

        let num_channels = audio.channel_count;
        let sample_rate = audio.sample_rate;
        let bytes_per_sample = (BITS_PER_SAMPLE / 8) as u32;
        let byte_rate = sample_rate * num_channels as u32 * bytes_per_sample;
        let block_align = num_channels * (BITS_PER_SAMPLE / 8);

        // 立体声先交错再量化
        let interleaved = audio.interleaved();

        let data_size = interleaved.len() * 2;
        let file_size = 36 + data_size;
        if file_size > u32::MAX as usize {
            return Err(CodecError::EncodingError(format!(
                "audio too large for WAV: {} bytes",
                data_size
            )));
        }

        let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for sample in interleaved {
            wav.extend_from_slice(&quantize_sample(sample).to_le_bytes());
        }

        tracing::debug!(
            sample_rate = sample_rate,
            channels = num_channels,
            frames = audio.frames(),
            wav_size = wav.len(),
            "Encoded WAV"
        );

        Ok(wav)
    }

    fn probe_wav(&self, data: &[u8]) -> Result<AudioInfo, CodecError> {
        let header = self.parse_wav_header(data)?;

        // 计算时长
        let bytes_per_sample = (header.fmt.bits_per_sample as usize / 8).max(1);
        let samples_per_channel =
            header.data_size / bytes_per_sample / header.fmt.num_channels as usize;

        let duration_ms = (samples_per_channel as u64 * 1000) / header.fmt.sample_rate as u64;

        Ok(AudioInfo {
            duration_ms,
            sample_rate: header.fmt.sample_rate,
            channels: header.fmt.num_channels,
            bits_per_sample: header.fmt.bits_per_sample,
            data_size: header.data_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AudioChunk;
    use crate::domain::audio::assemble;

    fn sine(frames: usize, freq: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    fn wav_chunk(codec: &SymphoniaCodec, index: usize, frames: usize) -> AudioChunk {
        let audio = AssembledAudio::from(PcmBuffer::mono(16000, sine(frames, 440.0, 16000, 0.5)));
        let wav = codec.encode_wav(&audio).unwrap();
        AudioChunk::from_bytes(index, &wav, ChunkMimeType::Wav)
    }

    #[test]
    fn test_quantization_is_asymmetric() {
        assert_eq!(quantize_sample(1.0), 32767);
        assert_eq!(quantize_sample(-1.0), -32768);
        assert_eq!(quantize_sample(0.0), 0);
        assert_eq!(quantize_sample(0.5), 16383);
        assert_eq!(quantize_sample(-0.5), -16384);
        assert_eq!(quantize_sample(2.5), 32767);
        assert_eq!(quantize_sample(-7.0), -32768);
        assert_eq!(quantize_sample(f32::NAN), 0);
    }

    #[test]
    fn test_encode_header_layout() {
        let codec = SymphoniaCodec::new();
        let audio = AssembledAudio {
            sample_rate: 22050,
            channel_count: 2,
            samples: vec![vec![0.25; 10], vec![-0.25; 10]],
        };

        let wav = codec.encode_wav(&audio).unwrap();

        assert_eq!(wav.len(), WAV_HEADER_LEN + 10 * 2 * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32(&wav, 4), 36 + 40);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(read_u32(&wav, 16), 16);
        assert_eq!(read_u16(&wav, 20), 1);
        assert_eq!(read_u16(&wav, 22), 2);
        assert_eq!(read_u32(&wav, 24), 22050);
        assert_eq!(read_u32(&wav, 28), 22050 * 2 * 2);
        assert_eq!(read_u16(&wav, 32), 4);
        assert_eq!(read_u16(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32(&wav, 40), 40);

        // 交错: L R L R
        let left = i16::from_le_bytes([wav[44], wav[45]]);
        let right = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(left, quantize_sample(0.25));
        assert_eq!(right, quantize_sample(-0.25));
    }

    #[test]
    fn test_encode_rejects_inconsistent_channels() {
        let codec = SymphoniaCodec::new();
        let audio = AssembledAudio {
            sample_rate: 16000,
            channel_count: 2,
            samples: vec![vec![0.0; 4]],
        };
        assert!(matches!(
            codec.encode_wav(&audio),
            Err(CodecError::EncodingError(_))
        ));
    }

    #[test]
    fn test_encode_decode_roundtrip_within_quantization_step() {
        let codec = SymphoniaCodec::new();
        let left = sine(4000, 220.0, 16000, 0.9);
        let right = sine(4000, 330.0, 16000, -0.7);
        let audio = AssembledAudio {
            sample_rate: 16000,
            channel_count: 2,
            samples: vec![left.clone(), right.clone()],
        };

        let wav = codec.encode_wav(&audio).unwrap();
        let decoded = codec.decode(&wav, ChunkMimeType::Wav).unwrap();

        assert_eq!(decoded.sample_rate(), 16000);
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.frames(), 4000);

        // 非负值按 32767 量化、按 32768 还原，最坏误差略超 1/32768
        let tolerance = 2.0 / 32768.0;
        for (original, restored) in [(&left, decoded.channel(0)), (&right, decoded.channel(1))] {
            let restored = restored.unwrap();
            for (a, b) in original.iter().zip(restored) {
                assert!((a - b).abs() <= tolerance, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_probe_wav() {
        let codec = SymphoniaCodec::new();
        let audio = AssembledAudio::from(PcmBuffer::mono(16000, vec![0.0; 16000]));
        let wav = codec.encode_wav(&audio).unwrap();

        let info = codec.probe_wav(&wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.data_size, 32000);
        assert_eq!(info.duration_ms, 1000);
    }

    #[test]
    fn test_three_chunks_assemble_to_5044_byte_wav() {
        let codec = SymphoniaCodec::new();
        let chunks = vec![
            wav_chunk(&codec, 0, 1000),
            wav_chunk(&codec, 1, 1000),
            wav_chunk(&codec, 2, 500),
        ];

        let buffers: Vec<PcmBuffer> = chunks
            .iter()
            .map(|c| codec.decode_chunk(c).unwrap())
            .collect();
        assert_eq!(buffers.iter().map(PcmBuffer::frames).sum::<usize>(), 2500);

        let assembled = assemble(&buffers).unwrap();
        let wav = codec.encode_wav(&assembled).unwrap();

        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32(&wav, 40), 5000);
        assert_eq!(wav.len(), 5044);
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let codec = SymphoniaCodec::new();
        let audio = AssembledAudio::from(PcmBuffer::mono(16000, vec![0.1; 100]));
        let wav = codec.encode_wav(&audio).unwrap();

        assert!(codec.decode(&wav[..30], ChunkMimeType::Wav).is_err());
        assert!(codec.decode(b"RIFX0000WAVE", ChunkMimeType::Wav).is_err());
    }

    #[test]
    fn test_decode_rejects_corrupt_base64() {
        let codec = SymphoniaCodec::new();
        let chunk = AudioChunk::new(0, "%%%", ChunkMimeType::Wav);
        assert!(matches!(
            codec.decode_chunk(&chunk),
            Err(CodecError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_mpeg() {
        let codec = SymphoniaCodec::new();
        let garbage = vec![0x42u8; 2048];
        assert!(codec.decode(&garbage, ChunkMimeType::Mpeg).is_err());
    }
}
