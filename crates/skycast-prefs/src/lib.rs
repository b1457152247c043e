//! Persisted user preferences: favorite cities, recent searches,
//! temperature unit and comparison locations.

pub mod preferences;
pub mod store;

pub use preferences::{Preferences, MAX_HISTORY};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreResult};
