//! Remote document store client contract.
//!
//! The engine only talks to the remote through [`RemoteStore`]; how a store is
//! reached is hidden behind [`RemoteConnector`].

mod http;
#[cfg(test)]
mod memory;
mod path;

pub use http::HttpConnector;
#[cfg(test)]
pub use memory::MemoryRemoteStore;
pub use path::{CollectionPath, DocPath, RemoteLayout};

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

/// JSON object as stored in a remote document.
pub type Document = Map<String, Value>;

/// Point-in-time view of a remote document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
  data: Option<Document>,
}

impl DocumentSnapshot {
  pub fn found(data: Document) -> Self {
    Self { data: Some(data) }
  }

  pub fn missing() -> Self {
    Self { data: None }
  }

  pub fn data(&self) -> Option<&Document> {
    self.data.as_ref()
  }

  pub fn into_data(self) -> Option<Document> {
    self.data
  }
}

/// Options for [`RemoteStore::set_document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
  /// Merge top-level fields into the existing document instead of replacing it
  pub merge: bool,
}

impl SetOptions {
  pub fn merge() -> Self {
    Self { merge: true }
  }

  pub fn replace() -> Self {
    Self { merge: false }
  }
}

/// Operations the sync engine needs from a hosted document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  async fn get_document(&self, path: &DocPath) -> Result<DocumentSnapshot>;

  async fn set_document(&self, path: &DocPath, value: Document, options: SetOptions)
    -> Result<()>;

  async fn delete_document(&self, path: &DocPath) -> Result<()>;

  /// All documents of a collection, each carrying its id in an `id` field.
  async fn list_collection_items(&self, path: &CollectionPath) -> Result<Vec<Document>>;

  /// Register for change notifications on a document.
  ///
  /// The current snapshot is delivered first, then one per change. The
  /// registration lasts until the receiver is dropped.
  async fn subscribe(&self, path: &DocPath) -> Result<mpsc::UnboundedReceiver<DocumentSnapshot>>;
}

/// Produces a connected store, or fails if the backend is unavailable.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
  async fn connect(&self) -> Result<Arc<dyn RemoteStore>>;
}

/// Connector used when no remote store is configured.
pub struct Unconfigured;

#[async_trait]
impl RemoteConnector for Unconfigured {
  async fn connect(&self) -> Result<Arc<dyn RemoteStore>> {
    Err(eyre!("No remote store configured"))
  }
}
