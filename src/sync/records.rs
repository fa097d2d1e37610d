//! Id-keyed collections: categories, products and slides.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use super::engine::SyncEngine;
use crate::cache::CacheStorage;
use crate::model::{self, Category, Product, Record, Slide};
use crate::remote::{Document, SetOptions};

/// Handle on one record collection of a [`SyncEngine`].
pub struct RecordSet<'a, S: CacheStorage, T: Record> {
  engine: &'a SyncEngine<S>,
  _record: PhantomData<T>,
}

impl<'a, S: CacheStorage, T: Record> RecordSet<'a, S, T> {
  pub(super) fn new(engine: &'a SyncEngine<S>) -> Self {
    Self {
      engine,
      _record: PhantomData,
    }
  }

  /// Local view; empty when nothing is cached.
  pub fn read(&self) -> Vec<T> {
    self.engine.cache.read()
  }

  pub fn find(&self, id: &str) -> Option<T> {
    self.read().into_iter().find(|item| item.id() == id)
  }

  /// Fetch the item collection from the remote and refresh the cache with it.
  ///
  /// Falls back to the local view when offline or on any remote failure.
  pub async fn read_authoritative(&self) -> Vec<T> {
    let Some(remote) = self.engine.online_remote() else {
      return self.read();
    };

    let path = self.engine.options.layout.items(T::COLLECTION);
    let docs = match remote.list_collection_items(&path).await {
      Ok(docs) => docs,
      Err(e) => {
        warn!("Failed to list {}, using local copy: {}", path, e);
        return self.read();
      }
    };

    let items: Vec<T> = docs
      .into_iter()
      .filter_map(|doc| match serde_json::from_value(Value::Object(doc)) {
        Ok(item) => Some(item),
        Err(e) => {
          warn!("Skipping malformed item in {}: {}", path, e);
          None
        }
      })
      .collect();

    if let Err(e) = self.engine.cache.write(&items) {
      warn!("Failed to cache {}: {}", path, e);
    }
    debug!("Fetched {} items from {}", items.len(), path);
    items
  }

  /// Append `item` under a fresh id and return it as stored.
  ///
  /// Any id already set on `item` is replaced.
  pub async fn create(&self, mut item: T) -> Result<T> {
    let mut items = self.read();
    let id = self
      .engine
      .ids
      .next_id(|candidate| items.iter().any(|existing| existing.id() == candidate));
    item.set_id(id);
    items.push(item.clone());
    self.engine.cache.write(&items)?;
    info!("Created {} {}", T::COLLECTION, item.id());

    if let Some(remote) = self.engine.online_remote() {
      let path = self.engine.options.layout.items(T::COLLECTION).doc(item.id());
      let doc = to_document(&item)?;
      futures::join!(
        self
          .engine
          .best_effort("create", &path, remote.set_document(&path, doc, SetOptions::replace())),
        self.engine.mirror(remote.as_ref(), T::COLLECTION, to_value(&items)?),
      );
    }
    Ok(item)
  }

  /// Replace the record with id `id` by `item`, keeping the id.
  ///
  /// An unknown id leaves the collection unchanged and skips the remote.
  pub async fn update(&self, id: &str, mut item: T) -> Result<()> {
    item.set_id(id.to_string());
    let mut items = self.read();
    let slot = items.iter_mut().find(|existing| existing.id() == id);
    let found = match slot {
      Some(slot) => {
        *slot = item.clone();
        true
      }
      None => false,
    };
    self.engine.cache.write(&items)?;

    if !found {
      debug!("No {} with id {}, nothing updated", T::COLLECTION, id);
      return Ok(());
    }
    info!("Updated {} {}", T::COLLECTION, id);

    if let Some(remote) = self.engine.online_remote() {
      let path = self.engine.options.layout.items(T::COLLECTION).doc(id);
      let doc = to_document(&item)?;
      futures::join!(
        self
          .engine
          .best_effort("update", &path, remote.set_document(&path, doc, SetOptions::merge())),
        self.engine.mirror(remote.as_ref(), T::COLLECTION, to_value(&items)?),
      );
    }
    Ok(())
  }

  /// Remove the record with id `id`. Returns whether anything was removed;
  /// unknown ids are a no-op locally.
  pub async fn delete(&self, id: &str) -> Result<bool> {
    let mut items = self.read();
    let before = items.len();
    items.retain(|existing| existing.id() != id);
    let removed = items.len() != before;
    self.engine.cache.write(&items)?;
    if removed {
      info!("Deleted {} {}", T::COLLECTION, id);
    }

    if let Some(remote) = self.engine.online_remote() {
      let path = self.engine.options.layout.items(T::COLLECTION).doc(id);
      self
        .engine
        .best_effort("delete", &path, remote.delete_document(&path))
        .await;
      if removed {
        self
          .engine
          .mirror(remote.as_ref(), T::COLLECTION, to_value(&items)?)
          .await;
      }
    }
    Ok(removed)
  }
}

impl<S: CacheStorage> RecordSet<'_, S, Slide> {
  /// Flip the `active` flag of a slide. Returns the updated slide, or `None`
  /// if no slide has that id.
  pub async fn toggle(&self, id: &str) -> Result<Option<Slide>> {
    let Some(mut slide) = self.find(id) else {
      return Ok(None);
    };
    slide.active = !slide.active;
    self.update(id, slide.clone()).await?;
    Ok(Some(slide))
  }

  /// Slides shown on the homepage.
  pub fn active(&self) -> Vec<Slide> {
    self.read().into_iter().filter(|s| s.active).collect()
  }
}

impl<S: CacheStorage> RecordSet<'_, S, Product> {
  /// Name of the product's category from the local cache.
  pub fn category_name(&self, product: &Product) -> String {
    let categories: Vec<Category> = self.engine.cache.read();
    model::category_name(product, &categories).to_string()
  }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
  serde_json::to_value(value).map_err(|e| eyre!("Failed to encode record: {}", e))
}

fn to_document<T: Record>(item: &T) -> Result<Document> {
  match to_value(item)? {
    Value::Object(doc) => Ok(doc),
    other => Err(eyre!("Record encoded as {} instead of an object", other)),
  }
}

#[cfg(test)]
mod tests {
  use crate::cache::{CacheStorage, SqliteStorage};
  use crate::model::{Category, Collection, Product, Slide};
  use crate::remote::{
    MemoryRemoteStore, RemoteConnector, RemoteLayout, RemoteStore, SetOptions, Unconfigured,
  };
  use crate::sync::{SyncEngine, SyncOptions};
  use serde_json::json;
  use std::time::Duration;

  fn options() -> SyncOptions {
    SyncOptions {
      connect_timeout: Duration::from_millis(200),
      ..Default::default()
    }
  }

  /// Engine over an empty-but-initialized cache, so seeding stays out of the way.
  async fn engine_with(connector: impl RemoteConnector + 'static) -> SyncEngine<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("content", r#"{"hero-title":"Test"}"#).unwrap();
    let engine = SyncEngine::new(storage, connector, options());
    engine.initialize().await.unwrap();
    engine
  }

  fn category(name: &str) -> Category {
    Category {
      name: name.into(),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_create_on_empty_collection() {
    let engine = engine_with(Unconfigured).await;

    let created = engine.categories().create(category("Glassware")).await.unwrap();

    let categories = engine.categories().read();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0], created);
    assert!(!created.id.is_empty());
  }

  #[tokio::test]
  async fn test_create_read_delete_round_trip() {
    let engine = engine_with(Unconfigured).await;
    let input = Product {
      name: "Centrifuge".into(),
      specs: "6000 rpm".into(),
      ..Default::default()
    };

    let created = engine.products().create(input.clone()).await.unwrap();
    let stored = engine.products().find(&created.id).unwrap();
    assert_eq!(
      stored,
      Product {
        id: created.id.clone(),
        ..input
      }
    );

    assert!(engine.products().delete(&created.id).await.unwrap());
    assert!(engine.products().find(&created.id).is_none());
  }

  #[tokio::test]
  async fn test_interleaved_whole_record_updates_lose_earlier_change() {
    let engine = engine_with(Unconfigured).await;
    let created = engine.categories().create(category("Base")).await.unwrap();

    // Both writers read before either writes
    let seen_by_a = engine.categories().find(&created.id).unwrap();
    let seen_by_b = engine.categories().find(&created.id).unwrap();

    engine
      .categories()
      .update(
        &created.id,
        Category {
          name: "A".into(),
          ..seen_by_a
        },
      )
      .await
      .unwrap();
    engine
      .categories()
      .update(
        &created.id,
        Category {
          description: "B".into(),
          ..seen_by_b
        },
      )
      .await
      .unwrap();

    let stored = engine.categories().find(&created.id).unwrap();
    assert_eq!(stored.description, "B");
    assert_eq!(stored.name, "Base");
  }

  #[tokio::test]
  async fn test_unreachable_remote_still_applies_every_operation() {
    let remote = MemoryRemoteStore::new();
    remote.set_available(false);
    let engine = engine_with(remote.clone()).await;

    let created = engine.categories().create(category("Offline")).await.unwrap();
    engine
      .categories()
      .update(&created.id, category("Renamed"))
      .await
      .unwrap();
    assert_eq!(engine.categories().find(&created.id).unwrap().name, "Renamed");

    engine.categories().delete(&created.id).await.unwrap();
    assert!(engine.categories().read().is_empty());
    assert_eq!(remote.write_count(), 0);
  }

  #[tokio::test]
  async fn test_create_replaces_caller_id() {
    let engine = engine_with(Unconfigured).await;
    let first = engine.categories().create(category("A")).await.unwrap();

    let mut clash = category("B");
    clash.id = first.id.clone();
    let second = engine.categories().create(clash).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(engine.categories().read().len(), 2);
  }

  #[tokio::test]
  async fn test_rapid_creates_get_distinct_ids() {
    let engine = engine_with(Unconfigured).await;
    for i in 0..20 {
      engine
        .slides()
        .create(Slide {
          title: format!("Slide {}", i),
          ..Default::default()
        })
        .await
        .unwrap();
    }

    let mut ids: Vec<String> = engine.slides().read().into_iter().map(|s| s.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
  }

  #[tokio::test]
  async fn test_update_replaces_record_and_keeps_id() {
    let engine = engine_with(Unconfigured).await;
    let created = engine.categories().create(category("Old")).await.unwrap();

    let mut changed = category("New");
    changed.id = "ignored".into();
    engine.categories().update(&created.id, changed).await.unwrap();

    let stored = engine.categories().find(&created.id).unwrap();
    assert_eq!(stored.name, "New");
    assert!(engine.categories().find("ignored").is_none());
  }

  #[tokio::test]
  async fn test_update_twice_is_idempotent() {
    let engine = engine_with(Unconfigured).await;
    let created = engine.categories().create(category("Old")).await.unwrap();

    engine.categories().update(&created.id, category("New")).await.unwrap();
    let once = engine.categories().read();
    engine.categories().update(&created.id, category("New")).await.unwrap();

    assert_eq!(engine.categories().read(), once);
  }

  #[tokio::test]
  async fn test_update_unknown_id_changes_nothing() {
    let remote = MemoryRemoteStore::new();
    let engine = engine_with(remote.clone()).await;
    engine.categories().create(category("Only")).await.unwrap();
    let before = engine.categories().read();
    let writes = remote.write_count();

    engine.categories().update("missing", category("Ghost")).await.unwrap();

    assert_eq!(engine.categories().read(), before);
    assert_eq!(remote.write_count(), writes);
  }

  #[tokio::test]
  async fn test_delete_unknown_id_changes_nothing() {
    let engine = engine_with(Unconfigured).await;
    engine.categories().create(category("Keep")).await.unwrap();
    let before = engine.categories().read();

    assert!(!engine.categories().delete("missing").await.unwrap());

    assert_eq!(engine.categories().read(), before);
  }

  #[tokio::test]
  async fn test_delete_removes_locally_and_remotely() {
    let remote = MemoryRemoteStore::new();
    let engine = engine_with(remote.clone()).await;
    let created = engine.categories().create(category("Temp")).await.unwrap();
    let layout = RemoteLayout::new("websiteData");
    let item_path = layout.items(Collection::Categories).doc(&created.id);
    assert!(remote.document(&item_path).is_some());

    engine.categories().delete(&created.id).await.unwrap();

    assert!(engine.categories().read().is_empty());
    assert!(remote.document(&item_path).is_none());
    let aggregate = remote.document(&layout.aggregate()).unwrap();
    assert_eq!(aggregate["categories"], json!([]));
  }

  #[tokio::test]
  async fn test_create_writes_item_and_mirrors_aggregate() {
    let remote = MemoryRemoteStore::new();
    let engine = engine_with(remote.clone()).await;

    let created = engine
      .products()
      .create(Product {
        name: "Microscope".into(),
        price: "1200".into(),
        ..Default::default()
      })
      .await
      .unwrap();

    let layout = RemoteLayout::new("websiteData");
    let item = remote
      .document(&layout.items(Collection::Products).doc(&created.id))
      .unwrap();
    assert_eq!(item["name"], json!("Microscope"));
    let aggregate = remote.document(&layout.aggregate()).unwrap();
    assert_eq!(aggregate["products"][0]["id"], json!(created.id));
  }

  #[tokio::test]
  async fn test_mirroring_can_be_disabled() {
    let remote = MemoryRemoteStore::new();
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("content", r#"{"hero-title":"Test"}"#).unwrap();
    let engine = SyncEngine::new(
      storage,
      remote.clone(),
      SyncOptions {
        mirror_aggregate: false,
        ..options()
      },
    );
    engine.initialize().await.unwrap();

    engine.categories().create(category("Quiet")).await.unwrap();

    assert!(remote
      .document(&RemoteLayout::new("websiteData").aggregate())
      .is_none());
  }

  #[tokio::test]
  async fn test_remote_write_failure_is_swallowed() {
    let remote = MemoryRemoteStore::new();
    let engine = engine_with(remote.clone()).await;
    remote.set_fail_writes(true);

    let created = engine.categories().create(category("Local only")).await.unwrap();

    assert_eq!(engine.categories().read(), vec![created]);
  }

  #[tokio::test]
  async fn test_read_authoritative_refreshes_cache() {
    let remote = MemoryRemoteStore::new();
    let engine = engine_with(remote.clone()).await;
    let layout = RemoteLayout::new("websiteData");
    remote
      .set_document(
        &layout.items(Collection::Categories).doc("77"),
        json!({ "name": "Remote" }).as_object().cloned().unwrap(),
        SetOptions::replace(),
      )
      .await
      .unwrap();

    let fetched = engine.categories().read_authoritative().await;

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, "77");
    assert_eq!(engine.categories().read(), fetched);
  }

  #[tokio::test]
  async fn test_read_authoritative_falls_back_offline() {
    let engine = engine_with(Unconfigured).await;
    engine.categories().create(category("Cached")).await.unwrap();

    let fetched = engine.categories().read_authoritative().await;
    assert_eq!(fetched, engine.categories().read());
  }

  #[tokio::test]
  async fn test_toggle_and_active_slides() {
    let engine = engine_with(Unconfigured).await;
    let slide = engine
      .slides()
      .create(Slide {
        title: "Hero".into(),
        active: true,
        ..Default::default()
      })
      .await
      .unwrap();

    let toggled = engine.slides().toggle(&slide.id).await.unwrap().unwrap();
    assert!(!toggled.active);
    assert!(engine.slides().active().is_empty());
    assert!(engine.slides().toggle("missing").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_dangling_category_reference() {
    let engine = engine_with(Unconfigured).await;
    let cat = engine.categories().create(category("Optics")).await.unwrap();
    let product = engine
      .products()
      .create(Product {
        category_id: cat.id.clone(),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(engine.products().category_name(&product), "Optics");

    engine.categories().delete(&cat.id).await.unwrap();

    assert_eq!(engine.products().read().len(), 1);
    assert_eq!(engine.products().category_name(&product), "unknown category");
  }
}
