//! Infrastructure layer: ledger storage backends and configuration.

pub mod config;
pub mod ledger_store;

pub use config::{ConfigError, NodeConfig, StoreBackend};
pub use ledger_store::{
    InMemoryLedgerStore, LedgerStore, LedgerStoreError, Mutation, MutationBatch, open_store,
};
#[cfg(feature = "redis")]
pub use ledger_store::RedisLedgerStore;
