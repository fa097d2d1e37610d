use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond-timestamp record ids that never collide within a process.
///
/// Two requests in the same millisecond get consecutive values, and an id
/// already present in the target collection is skipped.
#[derive(Debug, Default)]
pub struct IdGenerator {
  last: AtomicI64,
}

impl IdGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  fn next_millis(&self) -> i64 {
    let now = Utc::now().timestamp_millis();
    let prev = self
      .last
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
      })
      .unwrap_or_else(|last| last);
    now.max(prev + 1)
  }

  /// Next id for which `taken` returns false.
  pub fn next_id(&self, taken: impl Fn(&str) -> bool) -> String {
    loop {
      let id = self.next_millis().to_string();
      if !taken(&id) {
        return id;
      }
    }
  }
}
