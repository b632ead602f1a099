//! In-Memory Implementations
//!
//! 内存实现（测试与无持久化运行）

mod prayer_store;

pub use prayer_store::InMemoryPrayerStore;
