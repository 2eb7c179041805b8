pub mod database;
pub mod memory;
pub mod models;

use std::future::Future;

use anyhow::Result;

pub use database::Database;
pub use memory::MemoryStore;

/// A string-keyed slot store. Writes replace the whole value for a key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
