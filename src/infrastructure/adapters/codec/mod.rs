//! Codec Adapter - symphonia 片段解码 / WAV 编码

mod symphonia_codec;

pub use symphonia_codec::{quantize_sample, SymphoniaCodec, WAV_HEADER_LEN};
