//! REST-backed remote document store.
//!
//! Wire mapping, relative to the configured base URL:
//!
//! | call                    | request                                  |
//! |-------------------------|------------------------------------------|
//! | `get_document`          | `GET {path}` (404 = missing)             |
//! | `set_document`          | `PUT {path}?merge=true\|false` JSON body |
//! | `delete_document`       | `DELETE {path}` (404 ignored)            |
//! | `list_collection_items` | `GET {collection}` → JSON array          |
//!
//! The endpoint has no push channel, so `subscribe` polls the document and
//! emits a snapshot whenever its content changes.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use super::path::{CollectionPath, DocPath};
use super::{Document, DocumentSnapshot, RemoteConnector, RemoteStore, SetOptions};
use crate::config::{Config, RemoteConfig};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connects to the REST endpoint named in the config.
pub struct HttpConnector {
  config: RemoteConfig,
}

impl HttpConnector {
  pub fn new(config: &RemoteConfig) -> Self {
    Self {
      config: config.clone(),
    }
  }
}

#[async_trait]
impl RemoteConnector for HttpConnector {
  async fn connect(&self) -> Result<Arc<dyn RemoteStore>> {
    let url = self
      .config
      .url
      .as_deref()
      .ok_or_else(|| eyre!("No remote store URL configured"))?;

    let store = HttpRemoteStore::new(url, Config::get_remote_token(), self.config.poll_interval())?;
    Ok(Arc::new(store))
  }
}

/// Remote store client speaking JSON over HTTP.
#[derive(Clone)]
pub struct HttpRemoteStore {
  client: reqwest::Client,
  base: Url,
  token: Option<String>,
  poll_interval: Duration,
}

impl HttpRemoteStore {
  pub fn new(base: &str, token: Option<String>, poll_interval: Duration) -> Result<Self> {
    // Url::join drops the last segment unless the base ends with a slash
    let base = if base.ends_with('/') {
      base.to_string()
    } else {
      format!("{}/", base)
    };
    let base = Url::parse(&base).map_err(|e| eyre!("Invalid remote URL {}: {}", base, e))?;

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base,
      token,
      poll_interval,
    })
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
    let url = self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid remote path {}: {}", path, e))?;

    let builder = self.client.request(method, url);
    Ok(match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    })
  }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
  async fn get_document(&self, path: &DocPath) -> Result<DocumentSnapshot> {
    let response = self
      .request(Method::GET, path.as_str())?
      .send()
      .await
      .map_err(|e| eyre!("Failed to get document {}: {}", path, e))?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(DocumentSnapshot::missing());
    }

    let data: Document = response
      .error_for_status()
      .map_err(|e| eyre!("Failed to get document {}: {}", path, e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse document {}: {}", path, e))?;

    Ok(DocumentSnapshot::found(data))
  }

  async fn set_document(
    &self,
    path: &DocPath,
    value: Document,
    options: SetOptions,
  ) -> Result<()> {
    self
      .request(Method::PUT, path.as_str())?
      .query(&[("merge", options.merge)])
      .json(&value)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to write document {}: {}", path, e))?;

    Ok(())
  }

  async fn delete_document(&self, path: &DocPath) -> Result<()> {
    let response = self
      .request(Method::DELETE, path.as_str())?
      .send()
      .await
      .map_err(|e| eyre!("Failed to delete document {}: {}", path, e))?;

    if response.status() != StatusCode::NOT_FOUND {
      response
        .error_for_status()
        .map_err(|e| eyre!("Failed to delete document {}: {}", path, e))?;
    }

    Ok(())
  }

  async fn list_collection_items(&self, path: &CollectionPath) -> Result<Vec<Document>> {
    let response = self
      .request(Method::GET, path.as_str())?
      .send()
      .await
      .map_err(|e| eyre!("Failed to list collection {}: {}", path, e))?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(Vec::new());
    }

    response
      .error_for_status()
      .map_err(|e| eyre!("Failed to list collection {}: {}", path, e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse collection {}: {}", path, e))
  }

  async fn subscribe(&self, path: &DocPath) -> Result<mpsc::UnboundedReceiver<DocumentSnapshot>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let store = self.clone();
    let path = path.clone();

    tokio::spawn(async move {
      let mut last: Option<DocumentSnapshot> = None;
      let mut interval = tokio::time::interval(store.poll_interval.max(MIN_POLL_INTERVAL));

      while !tx.is_closed() {
        interval.tick().await;

        match store.get_document(&path).await {
          Ok(snapshot) if last.as_ref() != Some(&snapshot) => {
            debug!("Remote document {} changed", path);
            if tx.send(snapshot.clone()).is_err() {
              break;
            }
            last = Some(snapshot);
          }
          Ok(_) => {}
          Err(e) => warn!("Polling {} failed: {}", path, e),
        }
      }
    });

    Ok(rx)
  }
}
