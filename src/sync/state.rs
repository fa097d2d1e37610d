use std::fmt;

/// Connectivity state of the sync engine.
///
/// `Uninitialized → Connecting → {Online, Offline}`. Offline is only left
/// through an explicit reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  /// Constructed, bootstrap not started
  Uninitialized,
  /// Connecting to and probing the remote store
  Connecting,
  /// Remote reachable: writes are mirrored, live updates flow in
  Online,
  /// Local cache only
  Offline,
}

impl fmt::Display for ConnectionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Uninitialized => write!(f, "uninitialized"),
      Self::Connecting => write!(f, "connecting"),
      Self::Online => write!(f, "online"),
      Self::Offline => write!(f, "offline"),
    }
  }
}
