//! Typed JSON view over a cache storage backend.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::Cacheable;

/// Cache layer that encodes typed collections as JSON entries.
///
/// Reads never fail: a missing, unreadable or malformed entry yields the
/// type's empty default. Writes go straight to storage.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Read the current value of a typed entry.
  pub fn read<T: Cacheable>(&self) -> T {
    let key = T::cache_key();
    let raw = match self.storage.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return T::default(),
      Err(e) => {
        warn!("Cache read for {} failed, using empty value: {}", key, e);
        return T::default();
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => value,
      Err(e) => {
        warn!("Malformed cache entry {}, using empty value: {}", key, e);
        T::default()
      }
    }
  }

  /// Replace a typed entry.
  pub fn write<T: Cacheable>(&self, value: &T) -> Result<()> {
    let key = T::cache_key();
    let raw =
      serde_json::to_string(value).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
    self.storage.set(key, &raw)?;
    debug!("Cache entry {} written ({} bytes)", key, raw.len());
    Ok(())
  }

  /// Replace an entry with an arbitrary JSON value.
  pub fn write_raw(&self, key: &str, value: &Value) -> Result<()> {
    self.storage.set(key, &value.to_string())?;
    debug!("Cache entry {} overwritten", key);
    Ok(())
  }

  /// Whether an entry exists for `key`, regardless of whether it decodes.
  pub fn contains(&self, key: &str) -> bool {
    matches!(self.storage.get(key), Ok(Some(_)))
  }

  pub fn remove(&self, key: &str) -> Result<()> {
    self.storage.remove(key)
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
