//! Prayer Context - 祈祷文限界上下文
//!
//! 职责:
//! - 祈祷文记录与 ID
//! - 内置祈祷文常量表

mod aggregate;
mod builtin;
mod errors;
mod value_objects;

pub use aggregate::PrayerRecord;
pub use builtin::{builtin_prayers, is_builtin_id, DEFAULT_PRAYER_ID};
pub use errors::PrayerError;
pub use value_objects::{PrayerId, PrayerOrigin, CUSTOM_ID_PREFIX};
