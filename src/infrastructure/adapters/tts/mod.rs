//! TTS Adapter - HTTP 代理客户端 + 离线 Fake 实现

mod fake_tts_client;
mod http_tts_client;

pub use fake_tts_client::{FakeTtsClient, FakeTtsClientConfig};
pub use http_tts_client::{HttpTtsClient, HttpTtsClientConfig};
