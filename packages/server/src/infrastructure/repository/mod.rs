//! Repository 実装
//!
//! - `inmemory`: HashMap / BTreeMap を使ったインメモリ実装

pub mod inmemory;

pub use inmemory::InMemoryStore;
