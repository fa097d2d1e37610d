//! Closed-key string maps for the content and footer collections.

use color_eyre::{eyre::eyre, Result};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::collection::Collection;

/// A key drawn from a fixed, compile-time known set.
pub trait FieldKey: Copy + Ord + fmt::Debug + Send + Sync + 'static {
  /// Every key in the set, in display order.
  const ALL: &'static [Self];

  /// The collection a map of these keys belongs to.
  const COLLECTION: Collection;

  /// Wire name of the key.
  fn as_str(&self) -> &'static str;

  fn parse(name: &str) -> Option<Self> {
    Self::ALL.iter().copied().find(|k| k.as_str() == name)
  }
}

macro_rules! field_keys {
  (
    $(#[$meta:meta])*
    $name:ident => $collection:expr, $what:literal {
      $( $variant:ident = $wire:literal ),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum $name {
      $( $variant ),+
    }

    impl FieldKey for $name {
      const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];
      const COLLECTION: Collection = $collection;

      fn as_str(&self) -> &'static str {
        match self {
          $( $name::$variant => $wire ),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = color_eyre::Report;

      fn from_str(s: &str) -> Result<Self> {
        <$name as FieldKey>::parse(s).ok_or_else(|| eyre!("Unknown {}: {}", $what, s))
      }
    }
  };
}

field_keys! {
  /// Keys of the site-wide text content map.
  ContentKey => Collection::Content, "content key" {
    WebsiteName = "website-name",
    HeroTitle = "hero-title",
    HeroSubtitle = "hero-subtitle",
    IntroTitle = "intro-title",
    IntroText = "intro-text",
    ServicesTitle = "services-title",
    Service1Title = "service-1-title",
    Service1Desc = "service-1-desc",
    Service2Title = "service-2-title",
    Service2Desc = "service-2-desc",
    Service3Title = "service-3-title",
    Service3Desc = "service-3-desc",
    PageAboutTitle = "page-about-title",
    PageAboutDesc = "page-about-desc",
    PageProductsTitle = "page-products-title",
    PageProductsDesc = "page-products-desc",
    PageAchievementsTitle = "page-achievements-title",
    PageAchievementsDesc = "page-achievements-desc",
    PageAdminTitle = "page-admin-title",
    PageAdminDesc = "page-admin-desc",
    AboutHistoryTitle = "about-history-title",
    AboutHistoryText = "about-history-text",
    AboutMissionTitle = "about-mission-title",
    AboutMissionText = "about-mission-text",
    AboutVisionTitle = "about-vision-title",
    AboutVisionText = "about-vision-text",
    ProjectsTitle = "projects-title",
    CertificationsTitle = "certifications-title",
    MilestonesTitle = "milestones-title",
  }
}

field_keys! {
  /// Fields of the footer block.
  FooterField => Collection::Footer, "footer field" {
    CompanyName = "companyName",
    CompanyDescription = "companyDescription",
    Email = "email",
    Phone = "phone",
    Address = "address",
    Facebook = "facebook",
    Whatsapp = "whatsapp",
    Copyright = "copyright",
  }
}

/// Ordered mapping from a closed key set to string values.
///
/// Entries outside the key set, or known keys holding something other than a
/// string, are kept aside in `extra`. They are invisible to every accessor but
/// written back unchanged, so a document shared with an older or newer admin
/// keeps its foreign entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap<K: FieldKey> {
  fields: BTreeMap<K, String>,
  extra: Map<String, Value>,
}

pub type ContentMap = FieldMap<ContentKey>;
pub type FooterContent = FieldMap<FooterField>;

impl<K: FieldKey> Default for FieldMap<K> {
  fn default() -> Self {
    Self {
      fields: BTreeMap::new(),
      extra: Map::new(),
    }
  }
}

impl<K: FieldKey> FieldMap<K> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: K) -> Option<&str> {
    self.fields.get(&key).map(String::as_str)
  }

  pub fn set(&mut self, key: K, value: impl Into<String>) {
    self.extra.remove(key.as_str());
    self.fields.insert(key, value.into());
  }

  /// Builder-style `set`.
  pub fn with(mut self, key: K, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  /// Number of keys of the closed set that hold a value.
  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (K, &str)> {
    self.fields.iter().map(|(k, v)| (*k, v.as_str()))
  }

  /// Shallow merge: every entry present in `updates` overwrites ours, every
  /// other entry is kept.
  pub fn merge(&mut self, updates: &FieldMap<K>) {
    for (key, value) in &updates.fields {
      self.set(*key, value.clone());
    }
    for (name, value) in &updates.extra {
      self.fields.retain(|k, _| k.as_str() != name);
      self.extra.insert(name.clone(), value.clone());
    }
  }

  /// Keys of the closed set that are absent or empty.
  pub fn missing(&self) -> Vec<K> {
    K::ALL
      .iter()
      .copied()
      .filter(|k| self.get(*k).map_or(true, str::is_empty))
      .collect()
  }

  pub fn to_json_map(&self) -> Map<String, Value> {
    let mut map = self.extra.clone();
    for (key, value) in &self.fields {
      map.insert(key.as_str().to_string(), Value::String(value.clone()));
    }
    map
  }

  pub fn from_json_map(map: &Map<String, Value>) -> Self {
    let mut decoded = Self::default();
    for (name, value) in map {
      match (K::parse(name), value.as_str()) {
        (Some(key), Some(text)) => {
          decoded.fields.insert(key, text.to_string());
        }
        _ => {
          decoded.extra.insert(name.clone(), value.clone());
        }
      }
    }
    decoded
  }
}

impl<K: FieldKey> Serialize for FieldMap<K> {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.to_json_map().serialize(serializer)
  }
}

impl<'de, K: FieldKey> Deserialize<'de> for FieldMap<K> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let raw = Map::<String, Value>::deserialize(deserializer)?;
    Ok(Self::from_json_map(&raw))
  }
}
