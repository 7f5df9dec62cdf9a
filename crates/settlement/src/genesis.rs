//! Genesis funding: the only way value enters the ledger besides settlement.

use tracing::{info, instrument};

use utxo_core::{Address, Output, OutputKey, TransferError, TransferResult};
use utxo_infra::{LedgerStore, MutationBatch};

/// Mints outputs out of nothing, one atomic batch per call.
///
/// Funding goes through the same `apply_atomic` path as settlement, so a key
/// that already exists aborts the mint instead of overwriting it.
#[derive(Debug, Clone)]
pub struct GenesisFunding<S> {
    store: S,
}

impl<S: LedgerStore> GenesisFunding<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Mint `{txn_id}:{index} → owner, amount`.
    #[instrument(skip(self, owner), fields(owner = %owner), err)]
    pub fn fund(
        &self,
        txn_id: &str,
        index: u32,
        owner: &Address,
        amount: u64,
    ) -> TransferResult<Output> {
        if txn_id.is_empty() {
            return Err(TransferError::schema("transaction id cannot be empty"));
        }
        let output = Output::new(OutputKey::new(txn_id, index), owner.clone(), amount);
        self.fund_all(std::slice::from_ref(&output))?;
        Ok(output)
    }

    /// Mint several outputs in one batch: all of them, or none.
    pub fn fund_all(&self, outputs: &[Output]) -> TransferResult<()> {
        if outputs.is_empty() {
            return Ok(());
        }

        let mut batch = MutationBatch::new();
        for output in outputs {
            if output.owner.as_str().is_empty() {
                return Err(TransferError::schema("owner cannot be empty"));
            }
            if output.amount == 0 {
                return Err(TransferError::schema(format!(
                    "funding amount for {} must be greater than 0",
                    output.key
                )));
            }
            batch.mint(output.key.clone(), output.owner.clone(), output.amount);
        }

        self.store.apply_atomic(&batch)?;
        info!(outputs = outputs.len(), total = %utxo_core::total_amount(outputs), "ledger funded");
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
