//! Persistent sync state: the continuation cursor and stored credentials.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryContinuationStorage;
pub use sqlite::SqliteStateStore;
pub use traits::{ContinuationStorage, StateError};
