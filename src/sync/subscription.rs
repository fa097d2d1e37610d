//! Live reconciliation: remote aggregate changes overwrite the local cache.

use color_eyre::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, CacheStorage};
use crate::model::Collection;
use crate::remote::{Document, DocumentSnapshot};

/// Overwrite the cache entry of every known collection field in `data`
/// whose value is an object or array. Last writer wins; nothing is merged.
///
/// Returns the collections whose entry was replaced.
pub(super) fn apply_aggregate<S: CacheStorage>(
  cache: &CacheLayer<S>,
  data: &Document,
) -> Result<Vec<Collection>> {
  let mut applied = Vec::new();
  for (field, value) in data {
    if !(value.is_object() || value.is_array()) {
      continue;
    }
    match Collection::from_aggregate_field(field) {
      Some(collection) => {
        cache.write_raw(collection.cache_key(), value)?;
        applied.push(collection);
      }
      None => debug!("Ignoring unknown aggregate field {}", field),
    }
  }
  Ok(applied)
}

/// Apply every snapshot received on `rx` until the remote side closes it.
pub(super) fn spawn<S: CacheStorage>(
  cache: CacheLayer<S>,
  mut rx: mpsc::UnboundedReceiver<DocumentSnapshot>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    while let Some(snapshot) = rx.recv().await {
      let Some(data) = snapshot.data() else {
        continue;
      };
      match apply_aggregate(&cache, data) {
        Ok(applied) => info!("Local cache refreshed from remote ({} collections)", applied.len()),
        Err(e) => warn!("Failed to apply remote update: {}", e),
      }
    }
    debug!("Remote subscription closed");
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::model::{Category, ContentKey, ContentMap, Slide};
  use serde_json::json;

  #[test]
  fn test_apply_replaces_whole_collections() {
    let cache = CacheLayer::new(SqliteStorage::open_in_memory().unwrap());
    cache
      .write(&ContentMap::new().with(ContentKey::IntroText, "local"))
      .unwrap();

    let data = json!({
      "content": { "hero-title": "remote" },
      "slides": [{ "id": "5", "title": "Remote slide", "active": true }],
      "adminCredentials": { "username": "x" },
      "version": 3
    });
    let applied = apply_aggregate(&cache, data.as_object().unwrap()).unwrap();

    assert_eq!(applied, vec![Collection::Content, Collection::Slides]);
    let content = cache.read::<ContentMap>();
    assert_eq!(content.get(ContentKey::HeroTitle), Some("remote"));
    assert_eq!(content.get(ContentKey::IntroText), None);
    assert_eq!(cache.read::<Vec<Slide>>()[0].id, "5");
    assert!(!cache.contains("adminCredentials"));
    assert!(cache.read::<Vec<Category>>().is_empty());
  }
}
