//! Configuration loading and representation.
//!
//! Configuration comes from environment variables:
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `LEDGER_BACKEND` | `memory` | `memory` or `redis` |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` | redis connection URL |
//! | `LEDGER_KEY_PREFIX` | `utxo:` | prefix of every redis key |
//! | `LEDGER_LOG_FORMAT` | `json` | `json` or `pretty` |

use thiserror::Error;

use crate::ledger_store::LedgerStoreError;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "utxo:";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub key_prefix: String,
    /// Emit JSON logs (`false` = human-readable).
    pub json_logs: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected {expected})")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("failed to open store: {0}")]
    Store(LedgerStoreError),
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            json_logs: true,
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup (unset = `None`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match lookup("LEDGER_BACKEND").as_deref().map(str::trim) {
            None | Some("") => defaults.backend,
            Some(v) if v.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            Some(v) if v.eq_ignore_ascii_case("redis") => StoreBackend::Redis,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    var: "LEDGER_BACKEND",
                    value: v.to_string(),
                    expected: "memory | redis",
                });
            }
        };

        let json_logs = match lookup("LEDGER_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => defaults.json_logs,
            Some(v) if v.eq_ignore_ascii_case("json") => true,
            Some(v) if v.eq_ignore_ascii_case("pretty") => false,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    var: "LEDGER_LOG_FORMAT",
                    value: v.to_string(),
                    expected: "json | pretty",
                });
            }
        };

        Ok(Self {
            backend,
            redis_url: lookup("REDIS_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.redis_url),
            key_prefix: lookup("LEDGER_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            json_logs,
        })
    }
}
