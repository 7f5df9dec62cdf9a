//! UTXO transfer pipeline: validation, input selection and atomic settlement.
//!
//! This crate holds no storage of its own. Every component takes an explicit
//! [`utxo_infra::LedgerStore`] handle; concurrent transfers are made safe only by
//! the store's atomic commit.

pub mod engine;
pub mod genesis;
pub mod output_index;
pub mod validator;

pub use engine::{
    SettlementEngine, SettlementPlan, SettlementReceipt, plan_settlement, select_inputs,
};
pub use genesis::GenesisFunding;
pub use output_index::OutputIndexAllocator;
pub use validator::{TransactionValidator, check_balance, check_signature, resolve_inputs};
