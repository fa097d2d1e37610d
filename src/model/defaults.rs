//! Baseline data written on first start.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use super::collection::Collection;
use super::fields::{ContentKey, ContentMap, FieldKey, FooterContent, FooterField};
use super::records::{Category, Product, Slide};

const SAMPLE_CATEGORY_ID: &str = "1";

/// A complete dataset for all five collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub content: ContentMap,
  pub footer: FooterContent,
  pub categories: Vec<Category>,
  pub products: Vec<Product>,
  pub slides: Vec<Slide>,
}

impl Dataset {
  /// Wire value of one collection, as stored in the aggregate and the cache.
  pub fn field(&self, collection: Collection) -> Result<Value> {
    let value = match collection {
      Collection::Content => Value::Object(self.content.to_json_map()),
      Collection::Footer => Value::Object(self.footer.to_json_map()),
      Collection::Categories => encode(&self.categories)?,
      Collection::Products => encode(&self.products)?,
      Collection::Slides => encode(&self.slides)?,
    };
    Ok(value)
  }

  /// Shape of the `allData` aggregate document.
  pub fn to_aggregate(&self) -> Result<Map<String, Value>> {
    let mut aggregate = Map::new();
    for collection in Collection::ALL {
      aggregate.insert(
        collection.aggregate_field().to_string(),
        self.field(collection)?,
      );
    }
    Ok(aggregate)
  }
}

fn encode<T: Serialize>(records: &[T]) -> Result<Value> {
  serde_json::to_value(records).map_err(|e| eyre!("Failed to encode records: {}", e))
}

fn default_content(key: ContentKey) -> &'static str {
  use ContentKey::*;
  match key {
    WebsiteName => "Chemec Scientific",
    HeroTitle => "Laboratory equipment you can rely on",
    HeroSubtitle => "Instruments, glassware and chemicals for research and industry",
    IntroTitle => "Who we are",
    IntroText => "We supply laboratories with quality scientific equipment and expert support.",
    ServicesTitle => "Our services",
    Service1Title => "Equipment supply",
    Service1Desc => "Sourcing of certified laboratory instruments and consumables.",
    Service2Title => "Installation",
    Service2Desc => "On-site installation and calibration by trained engineers.",
    Service3Title => "Maintenance",
    Service3Desc => "Preventive maintenance contracts and fast repairs.",
    PageAboutTitle => "About us",
    PageAboutDesc => "Learn more about our history and values",
    PageProductsTitle => "Products",
    PageProductsDesc => "Browse our catalogue",
    PageAchievementsTitle => "Achievements",
    PageAchievementsDesc => "Projects, certifications and milestones",
    PageAdminTitle => "Administration",
    PageAdminDesc => "Manage website content",
    AboutHistoryTitle => "Our history",
    AboutHistoryText => "Founded to bring reliable lab equipment to local institutions.",
    AboutMissionTitle => "Our mission",
    AboutMissionText => "Enable better science through dependable tools and service.",
    AboutVisionTitle => "Our vision",
    AboutVisionText => "To be the first choice of every laboratory in the region.",
    ProjectsTitle => "Projects",
    CertificationsTitle => "Certifications",
    MilestonesTitle => "Milestones",
  }
}

fn default_footer(field: FooterField) -> &'static str {
  use FooterField::*;
  match field {
    CompanyName => "Chemec Scientific",
    CompanyDescription => "Scientific and laboratory equipment supplier.",
    Email => "info@chemec-scientific.com",
    Phone => "+000 000 0000",
    Address => "Main Street, Industrial Area",
    Facebook => "https://facebook.com/chemecscientific",
    Whatsapp => "+000 000 0000",
    Copyright => "© Chemec Scientific. All rights reserved.",
  }
}

/// The fixed baseline: full content and footer key sets, one category, one
/// product referencing it and one active slide.
pub fn seed_dataset() -> Dataset {
  let content = ContentKey::ALL
    .iter()
    .fold(ContentMap::new(), |map, k| map.with(*k, default_content(*k)));
  let footer = FooterField::ALL
    .iter()
    .fold(FooterContent::new(), |map, f| map.with(*f, default_footer(*f)));

  Dataset {
    content,
    footer,
    categories: vec![Category {
      id: SAMPLE_CATEGORY_ID.to_string(),
      name: "Laboratory Equipment".to_string(),
      description: "Instruments for everyday laboratory work".to_string(),
      image: "images/category-lab.jpg".to_string(),
    }],
    products: vec![Product {
      id: "1".to_string(),
      category_id: SAMPLE_CATEGORY_ID.to_string(),
      name: "Digital Microscope".to_string(),
      description: "High resolution digital microscope with USB output".to_string(),
      specs: "Magnification 40x-1000x, LED illumination".to_string(),
      price: "Contact us".to_string(),
      image: "images/product-microscope.jpg".to_string(),
    }],
    slides: vec![Slide {
      id: "1".to_string(),
      image: "images/hero-1.jpg".to_string(),
      title: "Laboratory equipment you can rely on".to_string(),
      subtitle: "Quality instruments for research and industry".to_string(),
      active: true,
    }],
  }
}
