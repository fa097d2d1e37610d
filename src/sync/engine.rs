//! The sync engine: owns the five collections and mediates every read and
//! write between callers, the local cache and the remote store.
//!
//! Policy is local-first, remote best-effort:
//! - reads come from the local cache and never wait on the network
//! - writes land in the local cache before any remote call is attempted
//! - remote failures are logged and swallowed, never retried or queued

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fields::FieldSet;
use super::ids::IdGenerator;
use super::records::RecordSet;
use super::state::ConnectionState;
use super::subscription;
use crate::cache::{CacheLayer, CacheStorage};
use crate::config::Config;
use crate::model::{
  seed_dataset, Category, Collection, ContentKey, ContentMap, Dataset, FooterField, Product, Slide,
};
use crate::remote::{
  DocPath, Document, RemoteConnector, RemoteLayout, RemoteStore, SetOptions,
};

/// Cache marker recording that defaults were seeded while offline.
const PENDING_SEED_KEY: &str = "pendingSeedPush";

/// Outcome of reading the aggregate document during bootstrap.
enum RemoteAggregate {
  /// Read failed; remote state unknown
  Unreadable,
  Absent,
  /// Collections whose local entry was replaced
  Pulled(Vec<Collection>),
}

/// Tunables for a [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
  /// Single deadline for connecting and probing the remote store
  pub connect_timeout: Duration,
  pub layout: RemoteLayout,
  /// Mirror every changed collection into the aggregate document
  pub mirror_aggregate: bool,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      connect_timeout: Duration::from_secs(5),
      layout: RemoteLayout::new("websiteData"),
      mirror_aggregate: true,
    }
  }
}

impl SyncOptions {
  pub fn from_config(config: &Config) -> Self {
    Self {
      connect_timeout: config.remote.connect_timeout(),
      layout: RemoteLayout::new(config.remote.root.clone()),
      mirror_aggregate: config.sync.mirror_aggregate,
    }
  }
}

/// Explicit context object for all collection reads and writes.
///
/// Construct once, call [`SyncEngine::initialize`], then hand out references.
pub struct SyncEngine<S: CacheStorage> {
  pub(super) cache: CacheLayer<S>,
  pub(super) ids: IdGenerator,
  pub(super) options: SyncOptions,
  connector: Box<dyn RemoteConnector>,
  remote: RwLock<Option<Arc<dyn RemoteStore>>>,
  state: watch::Sender<ConnectionState>,
  /// Serializes bootstrap and reconnect attempts
  bootstrap: tokio::sync::Mutex<()>,
  subscription: Mutex<Option<JoinHandle<()>>>,
}

impl<S: CacheStorage> SyncEngine<S> {
  pub fn new(
    storage: S,
    connector: impl RemoteConnector + 'static,
    options: SyncOptions,
  ) -> Self {
    let (state, _) = watch::channel(ConnectionState::Uninitialized);
    Self {
      cache: CacheLayer::new(storage),
      ids: IdGenerator::new(),
      options,
      connector: Box::new(connector),
      remote: RwLock::new(None),
      state,
      bootstrap: tokio::sync::Mutex::new(()),
      subscription: Mutex::new(None),
    }
  }

  pub fn state(&self) -> ConnectionState {
    *self.state.borrow()
  }

  /// Receiver that observes every state transition.
  pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
    self.state.subscribe()
  }

  fn set_state(&self, state: ConnectionState) {
    let previous = self.state.send_replace(state);
    if previous != state {
      info!("Sync engine {} -> {}", previous, state);
    }
  }

  /// Bootstrap: connect to the remote and write a connection test under one deadline, then either
  /// pull everything and start live updates, or continue from the cache alone.
  /// Seeds defaults when the cache has no content.
  ///
  /// Runs once; later calls return the current state.
  pub async fn initialize(&self) -> Result<ConnectionState> {
    let _guard = self.bootstrap.lock().await;
    if self.state() != ConnectionState::Uninitialized {
      return Ok(self.state());
    }

    self.set_state(ConnectionState::Connecting);
    match self.connect_and_check().await {
      Some(remote) => self.enter_online(remote).await?,
      None => self.enter_offline()?,
    }

    info!("Sync engine initialized ({})", self.state());
    Ok(self.state())
  }

  /// Try the remote store again after having gone offline.
  ///
  /// Nothing calls this automatically; offline stays offline until a caller
  /// asks. Any other state is returned unchanged.
  pub async fn reconnect(&self) -> Result<ConnectionState> {
    let _guard = self.bootstrap.lock().await;
    if self.state() != ConnectionState::Offline {
      return Ok(self.state());
    }

    self.set_state(ConnectionState::Connecting);
    match self.connect_and_check().await {
      Some(remote) => self.enter_online(remote).await?,
      None => self.set_state(ConnectionState::Offline),
    }
    Ok(self.state())
  }

  async fn connect_and_check(&self) -> Option<Arc<dyn RemoteStore>> {
    let test_path = self.options.layout.connection_test();
    let attempt = async {
      let remote = self.connector.connect().await?;

      let mut check = Document::new();
      check.insert("test".to_string(), Value::Bool(true));
      check.insert(
        "timestamp".to_string(),
        Value::String(Utc::now().to_rfc3339()),
      );
      remote
        .set_document(&test_path, check, SetOptions::replace())
        .await?;

      Ok::<_, color_eyre::Report>(remote)
    };

    match tokio::time::timeout(self.options.connect_timeout, attempt).await {
      Ok(Ok(remote)) => Some(remote),
      Ok(Err(e)) => {
        warn!("Remote store not available, running offline: {}", e);
        None
      }
      Err(_) => {
        warn!(
          "Remote store did not respond within {:?}, running offline",
          self.options.connect_timeout
        );
        None
      }
    }
  }

  async fn enter_online(&self, remote: Arc<dyn RemoteStore>) -> Result<()> {
    *self
      .remote
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))? = Some(Arc::clone(&remote));
    self.set_state(ConnectionState::Online);

    let local_was_empty = self.needs_seed();
    let aggregate = self.pull_all(remote.as_ref()).await;
    let pending = self.cache.contains(PENDING_SEED_KEY);

    match aggregate {
      RemoteAggregate::Pulled(pulled) => {
        // Remote data wins; defaults only fill collections it does not carry
        if local_was_empty {
          let seeded = self.seed_missing(&pulled)?;
          self.push_collections(remote.as_ref(), &seeded).await?;
        }
        if pending {
          debug!("Remote already has data, dropping offline seed marker");
          self.cache.remove(PENDING_SEED_KEY)?;
        }
      }
      RemoteAggregate::Absent => {
        let seeded = if local_was_empty {
          self.seed_missing(&[])?
        } else {
          Vec::new()
        };
        if pending || !seeded.is_empty() {
          // Push what is local now, including edits made since seeding
          self.push_collections(remote.as_ref(), &Collection::ALL).await?;
          self.cache.remove(PENDING_SEED_KEY)?;
        }
      }
      RemoteAggregate::Unreadable => {
        if local_was_empty && !self.seed_missing(&[])?.is_empty() {
          self.cache.write_raw(PENDING_SEED_KEY, &Value::Bool(true))?;
        }
      }
    }

    self.start_subscription(remote.as_ref()).await;
    Ok(())
  }

  fn enter_offline(&self) -> Result<()> {
    self.set_state(ConnectionState::Offline);
    if self.needs_seed() && !self.seed_missing(&[])?.is_empty() {
      self.cache.write_raw(PENDING_SEED_KEY, &Value::Bool(true))?;
    }
    Ok(())
  }

  fn needs_seed(&self) -> bool {
    self.cache.read::<ContentMap>().is_empty()
  }

  /// Write defaults for every collection outside `skip` that has no cache
  /// entry (or, for the content map, an empty one). Returns what was seeded.
  fn seed_missing(&self, skip: &[Collection]) -> Result<Vec<Collection>> {
    let seed = seed_dataset();
    let mut seeded = Vec::new();
    for collection in Collection::ALL {
      if skip.contains(&collection) {
        continue;
      }
      let absent = match collection {
        Collection::Content => self.needs_seed(),
        _ => !self.cache.contains(collection.cache_key()),
      };
      if absent {
        self
          .cache
          .write_raw(collection.cache_key(), &seed.field(collection)?)?;
        seeded.push(collection);
      }
    }
    if !seeded.is_empty() {
      info!("Seeded default data for {} collection(s)", seeded.len());
    }
    Ok(seeded)
  }

  /// Read the remote aggregate and replace the local entry of every
  /// collection it carries.
  async fn pull_all(&self, remote: &dyn RemoteStore) -> RemoteAggregate {
    let path = self.options.layout.aggregate();
    let snapshot = match remote.get_document(&path).await {
      Ok(snapshot) => snapshot,
      Err(e) => {
        warn!("Initial pull of {} failed, keeping local cache: {}", path, e);
        return RemoteAggregate::Unreadable;
      }
    };

    let Some(data) = snapshot.data() else {
      info!("Remote aggregate {} does not exist yet", path);
      return RemoteAggregate::Absent;
    };

    match subscription::apply_aggregate(&self.cache, data) {
      Ok(pulled) => {
        info!("Pulled {} collections from remote", pulled.len());
        RemoteAggregate::Pulled(pulled)
      }
      Err(e) => {
        warn!("Failed to store pulled collections: {}", e);
        RemoteAggregate::Unreadable
      }
    }
  }

  /// Merge the current local value of `collections` into the aggregate.
  async fn push_collections(
    &self,
    remote: &dyn RemoteStore,
    collections: &[Collection],
  ) -> Result<()> {
    if collections.is_empty() {
      return Ok(());
    }
    let local = self.snapshot();
    let mut doc = Document::new();
    for collection in collections {
      doc.insert(
        collection.aggregate_field().to_string(),
        local.field(*collection)?,
      );
    }

    let path = self.options.layout.aggregate();
    self
      .best_effort("seed push", &path, remote.set_document(&path, doc, SetOptions::merge()))
      .await;
    Ok(())
  }

  async fn start_subscription(&self, remote: &dyn RemoteStore) {
    let path = self.options.layout.aggregate();
    let rx = match remote.subscribe(&path).await {
      Ok(rx) => rx,
      Err(e) => {
        warn!("Live updates unavailable for {}: {}", path, e);
        return;
      }
    };

    let handle = subscription::spawn(self.cache.clone(), rx);
    if let Ok(mut slot) = self.subscription.lock() {
      if let Some(previous) = slot.replace(handle) {
        previous.abort();
      }
    }
    info!("Subscribed to remote changes on {}", path);
  }

  /// The remote store, only while online.
  pub(super) fn online_remote(&self) -> Option<Arc<dyn RemoteStore>> {
    if self.state() != ConnectionState::Online {
      return None;
    }
    self.remote.read().ok()?.clone()
  }

  /// Await a remote call, logging instead of propagating its failure.
  pub(super) async fn best_effort(
    &self,
    what: &str,
    path: &DocPath,
    call: impl Future<Output = Result<()>>,
  ) {
    match call.await {
      Ok(()) => debug!("Remote {} of {} succeeded", what, path),
      Err(e) => warn!("Remote {} of {} failed, local change kept: {}", what, path, e),
    }
  }

  /// Merge a whole collection into the aggregate document, if enabled.
  pub(super) async fn mirror(&self, remote: &dyn RemoteStore, collection: Collection, value: Value) {
    if !self.options.mirror_aggregate {
      return;
    }
    let path = self.options.layout.aggregate();
    let mut doc = Document::new();
    doc.insert(collection.aggregate_field().to_string(), value);
    self
      .best_effort("mirror", &path, remote.set_document(&path, doc, SetOptions::merge()))
      .await;
  }

  /// Current local view of all five collections.
  pub fn snapshot(&self) -> Dataset {
    Dataset {
      content: self.content().read(),
      footer: self.footer().read(),
      categories: self.categories().read(),
      products: self.products().read(),
      slides: self.slides().read(),
    }
  }

  pub fn content(&self) -> FieldSet<'_, S, ContentKey> {
    FieldSet::new(self)
  }

  pub fn footer(&self) -> FieldSet<'_, S, FooterField> {
    FieldSet::new(self)
  }

  pub fn categories(&self) -> RecordSet<'_, S, Category> {
    RecordSet::new(self)
  }

  pub fn products(&self) -> RecordSet<'_, S, Product> {
    RecordSet::new(self)
  }

  pub fn slides(&self) -> RecordSet<'_, S, Slide> {
    RecordSet::new(self)
  }
}

impl<S: CacheStorage> Drop for SyncEngine<S> {
  fn drop(&mut self) {
    if let Ok(mut slot) = self.subscription.lock() {
      if let Some(handle) = slot.take() {
        handle.abort();
      }
    }
  }
}
