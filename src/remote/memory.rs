//! In-process remote store with switchable failures.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::path::{CollectionPath, DocPath};
use super::{Document, DocumentSnapshot, RemoteConnector, RemoteStore, SetOptions};

struct Inner {
  docs: Mutex<BTreeMap<DocPath, Document>>,
  watchers: Mutex<Vec<(DocPath, mpsc::UnboundedSender<DocumentSnapshot>)>>,
  available: AtomicBool,
  fail_writes: AtomicBool,
  write_count: AtomicUsize,
}

/// Remote store kept entirely in memory.
///
/// Clones share the same documents, so one clone can stand in for "another
/// browser session" writing to the shared store.
#[derive(Clone)]
pub struct MemoryRemoteStore {
  inner: Arc<Inner>,
}

impl Default for MemoryRemoteStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryRemoteStore {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        docs: Mutex::new(BTreeMap::new()),
        watchers: Mutex::new(Vec::new()),
        available: AtomicBool::new(true),
        fail_writes: AtomicBool::new(false),
        write_count: AtomicUsize::new(0),
      }),
    }
  }

  /// Simulate the backend being unreachable (connect and every call fail).
  pub fn set_available(&self, available: bool) {
    self.inner.available.store(available, Ordering::SeqCst);
  }

  /// Simulate writes being rejected (e.g. permission denied).
  pub fn set_fail_writes(&self, fail: bool) {
    self.inner.fail_writes.store(fail, Ordering::SeqCst);
  }

  /// Number of successful set/delete calls so far.
  pub fn write_count(&self) -> usize {
    self.inner.write_count.load(Ordering::SeqCst)
  }

  /// Direct read for assertions, bypassing availability.
  pub fn document(&self, path: &DocPath) -> Option<Document> {
    self.lock_docs().ok()?.get(path).cloned()
  }

  fn lock_docs(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<DocPath, Document>>> {
    self
      .inner
      .docs
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn ensure_available(&self) -> Result<()> {
    if self.inner.available.load(Ordering::SeqCst) {
      Ok(())
    } else {
      Err(eyre!("Remote store unavailable"))
    }
  }

  fn ensure_writable(&self) -> Result<()> {
    self.ensure_available()?;
    if self.inner.fail_writes.load(Ordering::SeqCst) {
      return Err(eyre!("Permission denied"));
    }
    Ok(())
  }

  fn snapshot(&self, path: &DocPath) -> Result<DocumentSnapshot> {
    Ok(match self.lock_docs()?.get(path) {
      Some(doc) => DocumentSnapshot::found(doc.clone()),
      None => DocumentSnapshot::missing(),
    })
  }

  fn notify(&self, path: &DocPath) -> Result<()> {
    let snapshot = self.snapshot(path)?;
    let mut watchers = self
      .inner
      .watchers
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    watchers.retain(|(watched, tx)| watched != path || tx.send(snapshot.clone()).is_ok());
    Ok(())
  }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
  async fn get_document(&self, path: &DocPath) -> Result<DocumentSnapshot> {
    self.ensure_available()?;
    self.snapshot(path)
  }

  async fn set_document(
    &self,
    path: &DocPath,
    value: Document,
    options: SetOptions,
  ) -> Result<()> {
    self.ensure_writable()?;
    {
      let mut docs = self.lock_docs()?;
      let existing = docs.entry(path.clone()).or_default();
      if options.merge {
        existing.extend(value);
      } else {
        *existing = value;
      }
    }
    self.inner.write_count.fetch_add(1, Ordering::SeqCst);
    self.notify(path)
  }

  async fn delete_document(&self, path: &DocPath) -> Result<()> {
    self.ensure_writable()?;
    self.lock_docs()?.remove(path);
    self.inner.write_count.fetch_add(1, Ordering::SeqCst);
    self.notify(path)
  }

  async fn list_collection_items(&self, path: &CollectionPath) -> Result<Vec<Document>> {
    self.ensure_available()?;
    let docs = self.lock_docs()?;
    let items = docs
      .iter()
      .filter_map(|(doc_path, doc)| {
        let id = doc_path
          .as_str()
          .strip_prefix(path.as_str())?
          .strip_prefix('/')
          .filter(|id| !id.contains('/'))?;
        let mut item = doc.clone();
        item.insert("id".to_string(), Value::String(id.to_string()));
        Some(item)
      })
      .collect();
    Ok(items)
  }

  async fn subscribe(&self, path: &DocPath) -> Result<mpsc::UnboundedReceiver<DocumentSnapshot>> {
    self.ensure_available()?;
    let (tx, rx) = mpsc::unbounded_channel();
    // Initial snapshot
    let _ = tx.send(self.snapshot(path)?);
    self
      .inner
      .watchers
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?
      .push((path.clone(), tx));
    Ok(rx)
  }
}

#[async_trait]
impl RemoteConnector for MemoryRemoteStore {
  async fn connect(&self) -> Result<Arc<dyn RemoteStore>> {
    self.ensure_available()?;
    Ok(Arc::new(self.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Collection;
  use crate::remote::RemoteLayout;
  use serde_json::json;

  fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
  }

  #[tokio::test]
  async fn test_merge_and_replace() {
    let store = MemoryRemoteStore::new();
    let path = RemoteLayout::new("root").document("content");

    store
      .set_document(&path, doc(json!({"a": "1", "b": "2"})), SetOptions::replace())
      .await
      .unwrap();
    store
      .set_document(&path, doc(json!({"b": "3"})), SetOptions::merge())
      .await
      .unwrap();
    assert_eq!(store.document(&path).unwrap(), doc(json!({"a": "1", "b": "3"})));

    store
      .set_document(&path, doc(json!({"c": "4"})), SetOptions::replace())
      .await
      .unwrap();
    assert_eq!(store.document(&path).unwrap(), doc(json!({"c": "4"})));
  }

  #[tokio::test]
  async fn test_list_items_only_direct_children() {
    let store = MemoryRemoteStore::new();
    let layout = RemoteLayout::new("root");
    let items = layout.items(Collection::Categories);

    store
      .set_document(&items.doc("1"), doc(json!({"name": "A"})), SetOptions::replace())
      .await
      .unwrap();
    store
      .set_document(
        &layout.items(Collection::Products).doc("2"),
        doc(json!({"name": "B"})),
        SetOptions::replace(),
      )
      .await
      .unwrap();

    let listed = store.list_collection_items(&items).await.unwrap();
    assert_eq!(listed, vec![doc(json!({"name": "A", "id": "1"}))]);
  }

  #[tokio::test]
  async fn test_unavailable_store_fails_calls() {
    let store = MemoryRemoteStore::new();
    store.set_available(false);
    let path = RemoteLayout::new("root").aggregate();

    assert!(store.connect().await.is_err());
    assert!(store.get_document(&path).await.is_err());
    assert!(store
      .set_document(&path, Document::new(), SetOptions::merge())
      .await
      .is_err());
  }

  #[tokio::test]
  async fn test_subscription_gets_initial_and_changes() {
    let store = MemoryRemoteStore::new();
    let path = RemoteLayout::new("root").aggregate();
    let mut rx = store.subscribe(&path).await.unwrap();

    assert!(rx.recv().await.unwrap().data().is_none());

    store
      .set_document(&path, doc(json!({"content": {}})), SetOptions::replace())
      .await
      .unwrap();
    let snapshot = rx.recv().await.unwrap();
    assert!(snapshot.data().unwrap().contains_key("content"));
  }
}
