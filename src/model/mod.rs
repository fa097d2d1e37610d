//! Typed shapes of the five synced collections.

mod collection;
mod defaults;
mod fields;
mod records;

pub use collection::Collection;
pub use defaults::{seed_dataset, Dataset};
pub use fields::{ContentKey, ContentMap, FieldKey, FieldMap, FooterContent, FooterField};
pub use records::{category_name, Category, Product, Record, Slide};

use crate::cache::Cacheable;

impl<K: FieldKey> Cacheable for FieldMap<K> {
  fn cache_key() -> &'static str {
    K::COLLECTION.cache_key()
  }
}

impl<T: Record> Cacheable for Vec<T> {
  fn cache_key() -> &'static str {
    T::COLLECTION.cache_key()
  }
}
