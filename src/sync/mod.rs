//! Local-first synchronization of the site collections.

mod engine;
mod fields;
mod ids;
mod records;
mod state;
mod subscription;

pub use engine::{SyncEngine, SyncOptions};
pub use fields::FieldSet;
pub use state::ConnectionState;
