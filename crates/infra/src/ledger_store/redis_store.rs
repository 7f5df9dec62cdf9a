//! Redis-backed ledger store.
//!
//! ## Layout
//!
//! - **Output record**: hash `{prefix}output:{key}` with fields `address`, `amount`
//! - **Ownership set**: set `{prefix}owner:{address}` whose members are output keys
//!
//! Both kinds are namespaced. Stores written with bare keys (a hash at
//! `{txn_id}:{index}`, a set at `{address}`) are not readable through this
//! layout: an address may itself contain `:`, so bare keys of the two kinds
//! could collide, and bare keys would mix with unrelated data in a shared
//! Redis database.
//!
//! ## Commit protocol
//!
//! `apply_atomic()` uses optimistic locking:
//!
//! 1. `WATCH` every record and ownership set the batch touches
//! 2. Check preconditions (spent records exist, owned, listed; minted keys free)
//! 3. `MULTI` / `DEL` + `SREM` per spend, `HSET` + `SADD` per mint / `EXEC`
//!
//! If any watched key changed between 1 and 3, Redis discards the transaction
//! and `EXEC` replies nil; that is reported as `Aborted`. Nothing is retried here.

use std::collections::{BTreeSet, HashMap};

use tracing::{instrument, warn};

use utxo_core::{Address, OutputKey, OutputRecord};

use super::r#trait::{LedgerStore, LedgerStoreError, Mutation, MutationBatch};

const FIELD_ADDRESS: &str = "address";
const FIELD_AMOUNT: &str = "amount";

#[derive(Debug, Clone)]
pub struct RedisLedgerStore {
    client: redis::Client,
    prefix: String,
}

impl RedisLedgerStore {
    /// Create a store over `redis_url` (e.g. "redis://localhost:6379").
    ///
    /// Opening the client does not connect; connection failures surface on
    /// first use as `Unavailable`.
    pub fn new(
        redis_url: impl AsRef<str>,
        prefix: impl Into<String>,
    ) -> Result<Self, LedgerStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| LedgerStoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    fn connection(&self) -> Result<redis::Connection, LedgerStoreError> {
        self.client
            .get_connection()
            .map_err(|e| LedgerStoreError::Unavailable(e.to_string()))
    }

    fn record_key(&self, key: &OutputKey) -> String {
        format!("{}output:{}", self.prefix, key)
    }

    fn owner_key(&self, owner: &Address) -> String {
        format!("{}owner:{}", self.prefix, owner)
    }

    fn watched_keys(&self, batch: &MutationBatch) -> Vec<String> {
        let mut keys = BTreeSet::new();
        for mutation in batch.mutations() {
            keys.insert(self.record_key(mutation.key()));
            if let Mutation::Spend { owner, .. } = mutation {
                keys.insert(self.owner_key(owner));
            }
        }
        keys.into_iter().collect()
    }

    fn read_record(
        &self,
        conn: &mut redis::Connection,
        key: &OutputKey,
    ) -> Result<Option<OutputRecord>, LedgerStoreError> {
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.record_key(key))
            .query(conn)
            .map_err(command_error("HGETALL"))?;

        if fields.is_empty() {
            return Ok(None);
        }
        parse_record(key, &fields).map(Some)
    }

    /// Commit-time precondition of one mutation, read under `WATCH`.
    fn check(
        &self,
        conn: &mut redis::Connection,
        mutation: &Mutation,
    ) -> Result<(), LedgerStoreError> {
        match mutation {
            Mutation::Spend { key, owner } => {
                let record = self
                    .read_record(conn, key)?
                    .ok_or_else(|| LedgerStoreError::Aborted(format!("{key} already spent")))?;
                if &record.owner != owner {
                    return Err(LedgerStoreError::Aborted(format!(
                        "{key} is not owned by {owner}"
                    )));
                }
                let listed: bool = redis::cmd("SISMEMBER")
                    .arg(self.owner_key(owner))
                    .arg(key.as_str())
                    .query(conn)
                    .map_err(command_error("SISMEMBER"))?;
                if !listed {
                    return Err(LedgerStoreError::Aborted(format!(
                        "{key} is not in the output set of {owner}"
                    )));
                }
                Ok(())
            }
            Mutation::Mint { key, .. } => {
                let exists: bool = redis::cmd("EXISTS")
                    .arg(self.record_key(key))
                    .query(conn)
                    .map_err(command_error("EXISTS"))?;
                if exists {
                    return Err(LedgerStoreError::Aborted(format!("{key} already exists")));
                }
                Ok(())
            }
        }
    }

    fn unwatch(conn: &mut redis::Connection) {
        if let Err(e) = redis::cmd("UNWATCH").query::<()>(conn) {
            warn!(error = %e, "UNWATCH failed");
        }
    }
}

impl LedgerStore for RedisLedgerStore {
    fn list_outputs(&self, owner: &Address) -> Result<BTreeSet<OutputKey>, LedgerStoreError> {
        let mut conn = self.connection()?;
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.owner_key(owner))
            .query(&mut conn)
            .map_err(command_error("SMEMBERS"))?;

        Ok(members.into_iter().map(OutputKey::from_raw).collect())
    }

    fn read_output(&self, key: &OutputKey) -> Result<Option<OutputRecord>, LedgerStoreError> {
        let mut conn = self.connection()?;
        self.read_record(&mut conn, key)
    }

    #[instrument(skip(self, batch), fields(prefix = %self.prefix, mutations = batch.len()), err)]
    fn apply_atomic(&self, batch: &MutationBatch) -> Result<(), LedgerStoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        batch.check_well_formed()?;

        let mut conn = self.connection()?;

        redis::cmd("WATCH")
            .arg(self.watched_keys(batch))
            .query::<()>(&mut conn)
            .map_err(command_error("WATCH"))?;

        for mutation in batch.mutations() {
            if let Err(e) = self.check(&mut conn, mutation) {
                Self::unwatch(&mut conn);
                return Err(e);
            }
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for mutation in batch.mutations() {
            match mutation {
                Mutation::Spend { key, owner } => {
                    pipe.del(self.record_key(key)).ignore();
                    pipe.srem(self.owner_key(owner), key.as_str()).ignore();
                }
                Mutation::Mint { key, owner, amount } => {
                    let fields = [
                        (FIELD_ADDRESS, owner.to_string()),
                        (FIELD_AMOUNT, amount.to_string()),
                    ];
                    pipe.hset_multiple(self.record_key(key), &fields[..]).ignore();
                    pipe.sadd(self.owner_key(owner), key.as_str()).ignore();
                }
            }
        }

        // EXEC replies nil when a watched key changed.
        let reply: Option<()> = pipe.query(&mut conn).map_err(command_error("EXEC"))?;
        match reply {
            Some(()) => Ok(()),
            None => Err(LedgerStoreError::Aborted(
                "a watched output or ownership set changed before commit".to_string(),
            )),
        }
    }
}

fn command_error(command: &'static str) -> impl Fn(redis::RedisError) -> LedgerStoreError {
    move |e| LedgerStoreError::Unavailable(format!("{command} failed: {e}"))
}

fn parse_record(
    key: &OutputKey,
    fields: &HashMap<String, String>,
) -> Result<OutputRecord, LedgerStoreError> {
    let owner = fields
        .get(FIELD_ADDRESS)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| LedgerStoreError::Corrupt(format!("{key}: missing address")))?;
    let amount = fields
        .get(FIELD_AMOUNT)
        .ok_or_else(|| LedgerStoreError::Corrupt(format!("{key}: missing amount")))?
        .parse::<u64>()
        .map_err(|e| LedgerStoreError::Corrupt(format!("{key}: amount: {e}")))?;

    Ok(OutputRecord {
        owner: Address::new(owner.clone()),
        amount,
    })
}
