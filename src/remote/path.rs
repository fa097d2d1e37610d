//! Remote document/collection path layout.

use std::fmt;

use crate::model::Collection;

const AGGREGATE_DOCUMENT: &str = "allData";
const CONNECTION_TEST_DOCUMENT: &str = "connectionTest";
const ITEMS_COLLECTION: &str = "items";

/// Slash-separated path to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

/// Slash-separated path to a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl DocPath {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl CollectionPath {
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Path of the document `id` inside this collection.
  pub fn doc(&self, id: &str) -> DocPath {
    DocPath(format!("{}/{}", self.0, id))
  }
}

impl fmt::Display for DocPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Display for CollectionPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Where each collection lives under the root collection.
///
/// ```text
/// {root}/content                 content map
/// {root}/footer                  footer fields
/// {root}/allData                 aggregate of all five collections
/// {root}/connectionTest          connectivity check target
/// {root}/{categories|products|slides}/items/{id}
/// ```
#[derive(Debug, Clone)]
pub struct RemoteLayout {
  root: String,
}

impl RemoteLayout {
  pub fn new(root: impl Into<String>) -> Self {
    Self { root: root.into() }
  }

  pub fn document(&self, name: &str) -> DocPath {
    DocPath(format!("{}/{}", self.root, name))
  }

  /// Named document that owns (or is) the collection.
  pub fn collection_document(&self, collection: Collection) -> DocPath {
    self.document(collection.remote_document())
  }

  /// Item sub-collection of a record collection.
  pub fn items(&self, collection: Collection) -> CollectionPath {
    CollectionPath(format!(
      "{}/{}/{}",
      self.root,
      collection.remote_document(),
      ITEMS_COLLECTION
    ))
  }

  pub fn aggregate(&self) -> DocPath {
    self.document(AGGREGATE_DOCUMENT)
  }

  pub fn connection_test(&self) -> DocPath {
    self.document(CONNECTION_TEST_DOCUMENT)
  }
}
