//! Cache Decorators
//!
//! Each decorator wraps a `SharedCache` and adds exactly one policy:
//! - `LruCache` / `FifoCache` / `ReferenceCache`: eviction
//! - `SerializedCache`: copy-on-read isolation
//! - `LoggingCache`: hit ratio
//! - `SynchronizedCache`: one mutex around the whole chain
//! - `BlockingCache`: per-key population lock
//! - `ScheduledCache`: periodic wipe

pub mod blocking;
pub mod fifo;
pub mod logging;
pub mod lru;
pub mod reference;
pub mod scheduled;
pub mod serialized;
pub mod synchronized;

pub use blocking::BlockingCache;
pub use fifo::FifoCache;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use reference::{ReferenceCache, ReferenceStrength};
pub use scheduled::ScheduledCache;
pub use serialized::SerializedCache;
pub use synchronized::SynchronizedCache;
