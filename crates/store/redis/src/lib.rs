//! Redis backend for Keyward.
//!
//! This crate provides a Redis-backed implementation of the
//! [`KeyValueStore`] trait from `keyward-store`.
//!
//! # Features
//!
//! - **Conditional writes**: `SET NX [PX]` through a Lua script, so lock
//!   acquisition is a single atomic command.
//! - **Compare-and-delete**: owner-checked deletes through a Lua script.
//! - **Atomic batches**: multi-field hash writes and deletes run inside a
//!   `MULTI`/`EXEC` pipeline.
//! - **Connection pooling**: uses `deadpool-redis` for connection management.
//!
//! # Consistency
//!
//! | Deployment | Mutual Exclusion | Notes |
//! |------------|------------------|-------|
//! | Single instance | Strong | Conditional writes are serialized by Redis |
//! | Sentinel | Weak | A lock key may be lost during failover |
//! | Cluster | Weak | A lock key may be lost during failover |
//!
//! Replication is asynchronous, so a lock written to a master that fails
//! before replicating can be acquired a second time on the promoted replica.
//!
//! # Example
//!
//! ```ignore
//! use keyward_store_redis::{RedisConfig, RedisStore};
//!
//! let config = RedisConfig::new("redis://localhost:6379");
//! let store = RedisStore::new(&config)?;
//! ```
//!
//! [`KeyValueStore`]: keyward_store::KeyValueStore

mod config;
mod key_render;
mod scripts;
mod store;

pub use config::RedisConfig;
pub use store::RedisStore;
