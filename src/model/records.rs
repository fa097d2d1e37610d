use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::collection::Collection;

/// A record stored in one of the id-keyed collections.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  const COLLECTION: Collection;

  fn id(&self) -> &str;

  fn set_id(&mut self, id: String);
}

/// Product category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
  pub id: String,
  pub name: String,
  pub description: String,
  pub image: String,
}

/// Product entry. `category_id` is a weak reference, never checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
  pub id: String,
  pub category_id: String,
  pub name: String,
  pub description: String,
  pub specs: String,
  pub price: String,
  pub image: String,
}

/// Homepage hero slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Slide {
  pub id: String,
  pub image: String,
  pub title: String,
  pub subtitle: String,
  pub active: bool,
}

impl Record for Category {
  const COLLECTION: Collection = Collection::Categories;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }
}

impl Record for Product {
  const COLLECTION: Collection = Collection::Products;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }
}

impl Record for Slide {
  const COLLECTION: Collection = Collection::Slides;

  fn id(&self) -> &str {
    &self.id
  }

  fn set_id(&mut self, id: String) {
    self.id = id;
  }
}

/// Label shown for a product whose category no longer exists.
pub const UNKNOWN_CATEGORY: &str = "unknown category";

/// Resolve a product's category name, tolerating dangling references.
pub fn category_name<'a>(product: &Product, categories: &'a [Category]) -> &'a str {
  categories
    .iter()
    .find(|c| c.id == product.category_id)
    .map_or(UNKNOWN_CATEGORY, |c| c.name.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_product_uses_camel_case_wire_names() {
    let product: Product = serde_json::from_value(json!({
      "id": "1700000000000",
      "categoryId": "42",
      "name": "Microscope",
      "price": "120"
    }))
    .unwrap();

    assert_eq!(product.category_id, "42");
    assert_eq!(product.specs, "");
    assert_eq!(
      serde_json::to_value(&product).unwrap()["categoryId"],
      json!("42")
    );
  }

  #[test]
  fn test_dangling_category_reference() {
    let categories = vec![Category {
      id: "1".into(),
      name: "Glassware".into(),
      ..Default::default()
    }];
    let mut product = Product {
      category_id: "1".into(),
      ..Default::default()
    };
    assert_eq!(category_name(&product, &categories), "Glassware");

    product.category_id = "missing".into();
    assert_eq!(category_name(&product, &categories), UNKNOWN_CATEGORY);
  }
}
