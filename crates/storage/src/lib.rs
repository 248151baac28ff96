#![forbid(unsafe_code)]

pub mod file;
pub mod repository;

pub use file::FileStore;
pub use repository::{FailureMode, InMemoryStore, KeyValueStore, NullStore, StoreError};
