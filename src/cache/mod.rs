//! Local cache: the persistent, synchronous fast path for every read.
//!
//! This module is collection-agnostic:
//! - Stores serialized JSON under fixed string keys
//! - Survives process restarts (SQLite file)
//! - Decodes missing or corrupt entries as the empty default

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::Cacheable;
