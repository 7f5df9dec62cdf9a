//! Atomic ledger store boundary.
//!
//! This module defines the storage abstraction the settlement engine commits
//! through, plus its backends. Backends decide how atomicity is achieved; the
//! engine only relies on the `apply_atomic` contract.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod r#trait;

use std::sync::Arc;

pub use in_memory::InMemoryLedgerStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError, Mutation, MutationBatch};

use crate::config::{ConfigError, NodeConfig, StoreBackend};

/// Open the backend selected by `config`.
pub fn open_store(config: &NodeConfig) -> Result<Arc<dyn LedgerStore>, ConfigError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryLedgerStore::new())),
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            let store = RedisLedgerStore::new(&config.redis_url, config.key_prefix.clone())
                .map_err(ConfigError::Store)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(ConfigError::BackendUnavailable(
            "redis backend requires the `redis` feature".to_string(),
        )),
    }
}
