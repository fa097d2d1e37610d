//! Core traits for typed cache entries.

use serde::{de::DeserializeOwned, Serialize};

/// A value stored under a single, fixed cache key.
///
/// `Default` is the value readers observe when the entry is missing or cannot
/// be decoded.
pub trait Cacheable: Clone + Default + Send + Sync + Serialize + DeserializeOwned {
  /// Key of the entry in the local cache (e.g. "content", "heroSlides")
  fn cache_key() -> &'static str;
}
