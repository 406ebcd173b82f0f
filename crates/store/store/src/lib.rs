pub mod error;
pub mod store;
pub mod testing;

pub use error::StoreError;
pub use store::{HashField, HashWrite, KeyValueStore, ttl_millis};
