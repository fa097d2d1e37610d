//! Closed-key collections: the content map and the footer fields.

use color_eyre::Result;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use super::engine::SyncEngine;
use crate::cache::CacheStorage;
use crate::model::{FieldKey, FieldMap};
use crate::remote::SetOptions;

/// Handle on the content map or the footer of a [`SyncEngine`].
pub struct FieldSet<'a, S: CacheStorage, K: FieldKey> {
  engine: &'a SyncEngine<S>,
  _key: PhantomData<K>,
}

impl<'a, S: CacheStorage, K: FieldKey> FieldSet<'a, S, K> {
  pub(super) fn new(engine: &'a SyncEngine<S>) -> Self {
    Self {
      engine,
      _key: PhantomData,
    }
  }

  pub fn read(&self) -> FieldMap<K> {
    self.engine.cache.read()
  }

  /// Fetch the collection's own remote document and cache it.
  ///
  /// Falls back to the local view when offline, when the document does not
  /// exist, or on any remote failure.
  pub async fn read_authoritative(&self) -> FieldMap<K> {
    let Some(remote) = self.engine.online_remote() else {
      return self.read();
    };

    let path = self.engine.options.layout.collection_document(K::COLLECTION);
    let data = match remote.get_document(&path).await {
      Ok(snapshot) => match snapshot.into_data() {
        Some(data) => data,
        None => {
          debug!("{} does not exist remotely, using local copy", path);
          return self.read();
        }
      },
      Err(e) => {
        warn!("Failed to fetch {}, using local copy: {}", path, e);
        return self.read();
      }
    };

    let fields = FieldMap::from_json_map(&data);
    if let Err(e) = self.engine.cache.write(&fields) {
      warn!("Failed to cache {}: {}", path, e);
    }
    fields
  }

  /// Shallow-merge `updates` into the stored map and return the result.
  ///
  /// Keys not named in `updates` keep their current values.
  pub async fn update(&self, updates: &FieldMap<K>) -> Result<FieldMap<K>> {
    let mut merged = self.read();
    merged.merge(updates);
    self.engine.cache.write(&merged)?;
    info!("Updated {} field(s) of {}", updates.len(), K::COLLECTION);

    if let Some(remote) = self.engine.online_remote() {
      let path = self.engine.options.layout.collection_document(K::COLLECTION);
      futures::join!(
        self.engine.best_effort(
          "update",
          &path,
          remote.set_document(&path, updates.to_json_map(), SetOptions::merge()),
        ),
        self.engine.mirror(
          remote.as_ref(),
          K::COLLECTION,
          Value::Object(merged.to_json_map())
        ),
      );
    }
    Ok(merged)
  }
}
