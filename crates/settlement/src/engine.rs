//! Settlement: turn a validated transfer into one atomic ledger mutation.
//!
//! ```text
//! SignedTransaction + resolved inputs
//!   ↓
//! 0. Inputs must be the signed utxoIds, in order, owned by the sender
//!   ↓
//! 1. Select the shortest input prefix covering `amount`
//!   ↓
//! 2. change = Σ prefix − amount  (the fee is not subtracted)
//!   ↓
//! 3. Batch: spend prefix, mint digest:0 → receiver, [mint digest:1 → sender]
//!   ↓
//! 4. LedgerStore::apply_atomic  (aborted → SettlementConflict)
//! ```
//!
//! The fee is required to be covered by the supplied inputs, but it is neither
//! returned as change nor paid to anyone: value equal to `amount + change`
//! leaves the sender and exactly that much is minted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use utxo_core::{Output, SignedTransaction, Transaction, TransferError, TransferResult, TxDigest};
use utxo_crypto::{AddressValidator, BitcoinAddressValidator};
use utxo_infra::{LedgerStore, MutationBatch};

use crate::output_index::OutputIndexAllocator;
use crate::validator::TransactionValidator;

/// What a settlement will do, computed without touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub digest: TxDigest,
    /// Inputs that will be consumed (a prefix of the resolved inputs).
    pub spent: Vec<Output>,
    pub receiver_output: Output,
    pub change_output: Option<Output>,
    pub batch: MutationBatch,
}

/// Outcome of a committed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementReceipt {
    pub digest: TxDigest,
    pub spent: Vec<Output>,
    pub receiver_output: Output,
    pub change_output: Option<Output>,
    /// Declared fee; not minted to anyone.
    pub fee: u64,
    pub settled_at: DateTime<Utc>,
}

impl SettlementReceipt {
    pub fn spent_total(&self) -> u128 {
        utxo_core::total_amount(&self.spent)
    }

    pub fn minted_total(&self) -> u128 {
        self.receiver_output.amount as u128
            + self.change_output.as_ref().map_or(0, |o| o.amount as u128)
    }
}

/// Length of the shortest prefix of `inputs` whose amounts reach `amount`, and
/// that prefix's total. `None` if all inputs together fall short.
pub fn select_inputs(inputs: &[Output], amount: u64) -> Option<(usize, u128)> {
    let target = amount as u128;
    let mut spent: u128 = 0;
    for (idx, input) in inputs.iter().enumerate() {
        if spent >= target {
            return Some((idx, spent));
        }
        spent += input.amount as u128;
    }
    (spent >= target).then_some((inputs.len(), spent))
}

/// `resolved_inputs` must be exactly the outputs `transaction` names, in the
/// same order, all owned by the sender: the signature covers nothing else.
fn check_inputs_match(transaction: &Transaction, resolved_inputs: &[Output]) -> TransferResult<()> {
    if resolved_inputs.len() != transaction.utxo_ids.len() {
        return Err(TransferError::schema(format!(
            "{} resolved inputs for {} utxo ids",
            resolved_inputs.len(),
            transaction.utxo_ids.len()
        )));
    }
    for (input, id) in resolved_inputs.iter().zip(&transaction.utxo_ids) {
        if &input.key != id || input.owner != transaction.sender {
            return Err(TransferError::unknown_utxo(input.key.as_str()));
        }
    }
    Ok(())
}

/// Build the settlement batch for `transaction` over `resolved_inputs`.
///
/// `resolved_inputs` are the outputs named by `transaction.utxo_ids`, in that
/// order, as returned by validation.
pub fn plan_settlement(
    transaction: &Transaction,
    resolved_inputs: &[Output],
) -> TransferResult<SettlementPlan> {
    if transaction.amount == 0 {
        return Err(TransferError::schema("amount must be greater than 0"));
    }
    check_inputs_match(transaction, resolved_inputs)?;

    let (prefix_len, spent_total) =
        select_inputs(resolved_inputs, transaction.amount).ok_or_else(|| {
            TransferError::InsufficientBalance {
                available: utxo_core::total_amount(resolved_inputs),
                requested: transaction.amount as u128 + transaction.fee as u128,
            }
        })?;
    let spent = resolved_inputs[..prefix_len].to_vec();

    // The last spent input pushed the total over `amount`, so change < that input.
    let change = u64::try_from(spent_total - transaction.amount as u128)
        .map_err(|_| TransferError::schema("change does not fit in an amount"))?;

    let digest = utxo_crypto::digest(transaction);
    let mut indices = OutputIndexAllocator::new();
    let mut batch = MutationBatch::new();

    for input in &spent {
        batch.spend(input.key.clone(), transaction.sender.clone());
    }

    let receiver_output = Output::new(
        indices.next_key(&digest),
        transaction.receiver.clone(),
        transaction.amount,
    );
    batch.mint(
        receiver_output.key.clone(),
        receiver_output.owner.clone(),
        receiver_output.amount,
    );

    let change_output = (change > 0).then(|| {
        Output::new(indices.next_key(&digest), transaction.sender.clone(), change)
    });
    if let Some(change_output) = &change_output {
        batch.mint(
            change_output.key.clone(),
            change_output.owner.clone(),
            change_output.amount,
        );
    }

    Ok(SettlementPlan {
        digest,
        spent,
        receiver_output,
        change_output,
        batch,
    })
}

/// Validates and settles transfers against an explicit store handle.
///
/// The engine holds no locks and performs no background work; concurrent
/// callers are serialized only by the store's atomic commit. An aborted commit
/// is returned as [`TransferError::SettlementConflict`] and never retried here.
#[derive(Debug)]
pub struct SettlementEngine<S, V = BitcoinAddressValidator> {
    store: S,
    validator: TransactionValidator<V>,
}

impl<S> SettlementEngine<S, BitcoinAddressValidator> {
    /// Engine accepting legacy and segwit addresses on any network.
    pub fn with_default_validator(store: S) -> Self {
        Self::new(store, TransactionValidator::default())
    }
}

impl<S, V> SettlementEngine<S, V> {
    pub fn new(store: S, validator: TransactionValidator<V>) -> Self {
        Self { store, validator }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validator(&self) -> &TransactionValidator<V> {
        &self.validator
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S, V> SettlementEngine<S, V>
where
    S: LedgerStore,
    V: AddressValidator,
{
    /// Validate against the current ledger view, without mutating it.
    pub fn validate(&self, transaction: &SignedTransaction) -> TransferResult<Vec<Output>> {
        self.validator.validate(transaction, &self.store)
    }

    /// Commit `transaction` over inputs already resolved by [`Self::validate`].
    pub fn settle(
        &self,
        transaction: &SignedTransaction,
        resolved_inputs: &[Output],
    ) -> TransferResult<SettlementReceipt> {
        let plan = plan_settlement(transaction.unsigned(), resolved_inputs)?;

        self.store.apply_atomic(&plan.batch)?;

        Ok(SettlementReceipt {
            digest: plan.digest,
            spent: plan.spent,
            receiver_output: plan.receiver_output,
            change_output: plan.change_output,
            fee: transaction.fee,
            settled_at: Utc::now(),
        })
    }

    /// Validate then settle: the full transfer flow.
    #[instrument(
        skip(self, transaction),
        fields(
            sender = %transaction.sender,
            receiver = %transaction.receiver,
            amount = transaction.amount,
            fee = transaction.fee
        )
    )]
    pub fn submit(&self, transaction: &SignedTransaction) -> TransferResult<SettlementReceipt> {
        let result = self
            .validate(transaction)
            .and_then(|inputs| self.settle(transaction, &inputs));

        match &result {
            Ok(receipt) => info!(
                digest = %receipt.digest,
                spent = receipt.spent.len(),
                change = receipt.change_output.as_ref().map_or(0, |o| o.amount),
                "transfer settled"
            ),
            Err(e @ TransferError::StoreUnavailable(_)) => {
                error!(kind = e.kind(), error = %e, "transfer failed")
            }
            Err(e) => warn!(
                kind = e.kind(),
                retryable = e.is_retryable(),
                error = %e,
                "transfer rejected"
            ),
        }

        result
    }
}
