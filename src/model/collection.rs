use std::fmt;

/// The five logical collections the engine keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Content,
  Footer,
  Categories,
  Products,
  Slides,
}

impl Collection {
  pub const ALL: [Collection; 5] = [
    Collection::Content,
    Collection::Footer,
    Collection::Categories,
    Collection::Products,
    Collection::Slides,
  ];

  /// Key of the local cache entry holding this collection.
  pub fn cache_key(self) -> &'static str {
    match self {
      Collection::Content => "content",
      Collection::Footer => "footerContent",
      Collection::Categories => "categories",
      Collection::Products => "products",
      Collection::Slides => "heroSlides",
    }
  }

  /// Field name inside the `allData` aggregate document.
  pub fn aggregate_field(self) -> &'static str {
    match self {
      Collection::Content => "content",
      Collection::Footer => "footerContent",
      Collection::Categories => "categories",
      Collection::Products => "products",
      Collection::Slides => "slides",
    }
  }

  /// Named document under the remote root collection.
  pub fn remote_document(self) -> &'static str {
    match self {
      Collection::Content => "content",
      Collection::Footer => "footer",
      Collection::Categories => "categories",
      Collection::Products => "products",
      Collection::Slides => "slides",
    }
  }

  pub fn from_aggregate_field(field: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|c| c.aggregate_field() == field)
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.remote_document())
  }
}
