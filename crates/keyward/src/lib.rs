//! Distributed locks and expiring session tokens on a shared key-value store.
//!
//! Both primitives take the store as an injected
//! [`KeyValueStore`](keyward_store::KeyValueStore) capability and keep no
//! state of their own:
//!
//! - [`LockManager`] grants named exclusive locks through a single atomic
//!   set-if-absent. Contention is an ordinary `false`, never an error.
//! - [`SessionManager`] issues, validates and revokes opaque bearer tokens for
//!   one principal, reporting a [`TokenStatus`] for every validation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keyward::{LockManager, SessionManager, TokenStatus};
//! use keyward_store_memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//!
//! let locks = LockManager::new(store.clone());
//! assert!(locks.acquire("reports").await?);
//! assert!(!locks.acquire("reports").await?);
//! assert!(locks.release("reports").await?);
//!
//! let session = SessionManager::new(store, "msk");
//! let token = session.create_token().await?;
//! assert_eq!(session.validate_token(&token).await?, TokenStatus::Valid);
//! session.destroy().await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod session;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LockConfig, SessionConfig};
pub use error::SessionError;
pub use lock::{LockGuard, LockManager};
pub use session::{SessionManager, TokenStatus};
pub use token::generate_token;
