//! End-to-end transfer flow against the in-memory ledger.
//!
//! Covers: genesis funding → signed request → validation → atomic settlement,
//! plus the rejection paths, concurrent double-spend attempts and store
//! outages.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use proptest::prelude::*;

use utxo_core::{Address, Output, OutputKey, OutputRecord, SignedTransaction, Transaction, TransferError};
use utxo_crypto::Wallet;
use utxo_infra::{
    InMemoryLedgerStore, LedgerStore, LedgerStoreError, MutationBatch, NodeConfig, open_store,
};
use utxo_settlement::{GenesisFunding, SettlementEngine};

struct Ledger {
    engine: SettlementEngine<Arc<InMemoryLedgerStore>>,
    alice: Wallet,
    bob: Wallet,
}

impl Ledger {
    /// Alice owns `T1:i → amounts[i]`.
    fn funded(amounts: &[u64]) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let alice = Wallet::generate();
        let bob = Wallet::generate();

        let genesis = GenesisFunding::new(store.clone());
        for (i, amount) in amounts.iter().enumerate() {
            genesis.fund("T1", i as u32, &alice.address, *amount).unwrap();
        }

        Self {
            engine: SettlementEngine::with_default_validator(store),
            alice,
            bob,
        }
    }

    fn store(&self) -> &InMemoryLedgerStore {
        self.engine.store()
    }

    fn transfer(&self, from: &Wallet, to: &Wallet, amount: u64, fee: u64, ids: &[&str]) -> SignedTransaction {
        let tx = Transaction {
            sender: from.address.clone(),
            sender_pub_key: from.public_key.clone(),
            receiver: to.address.clone(),
            amount,
            fee,
            utxo_ids: ids.iter().map(|s| OutputKey::from_raw(*s)).collect(),
        };
        let signature = from.sign(&tx).unwrap();
        tx.into_signed(signature)
    }

    fn keys_of(&self, owner: &Address) -> Vec<String> {
        self.store()
            .list_outputs(owner)
            .unwrap()
            .into_iter()
            .map(OutputKey::into_inner)
            .collect()
    }
}

#[test]
fn transfer_mints_receiver_and_change_outputs() {
    let ledger = Ledger::funded(&[100]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T1:0"]);

    let receipt = ledger.engine.submit(&tx).unwrap();
    let digest = utxo_crypto::digest(&tx);

    assert_eq!(receipt.digest, digest);
    assert_eq!(receipt.receiver_output.key, digest.output_key(0));
    assert_eq!(receipt.receiver_output.amount, 10);
    assert_eq!(receipt.change_output.as_ref().unwrap().key, digest.output_key(1));
    assert_eq!(receipt.change_output.as_ref().unwrap().amount, 90);

    assert_eq!(ledger.keys_of(&ledger.bob.address), vec![digest.output_key(0).into_inner()]);
    assert_eq!(ledger.keys_of(&ledger.alice.address), vec![digest.output_key(1).into_inner()]);
    assert_eq!(ledger.store().read_output(&OutputKey::from_raw("T1:0")).unwrap(), None);
    assert_eq!(ledger.store().balance(&ledger.bob.address).unwrap(), 10);
    assert_eq!(ledger.store().balance(&ledger.alice.address).unwrap(), 90);
    ledger.store().check_consistency().unwrap();
}

#[test]
fn fee_is_neither_returned_nor_paid() {
    let ledger = Ledger::funded(&[100]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 5, &["T1:0"]);

    let receipt = ledger.engine.submit(&tx).unwrap();

    assert_eq!(receipt.fee, 5);
    assert_eq!(receipt.change_output.as_ref().map(|o| o.amount), Some(90));
    assert_eq!(receipt.spent_total(), 100);
    assert_eq!(ledger.store().total_value().unwrap(), 100);
}

#[test]
fn unknown_input_leaves_the_ledger_unchanged() {
    let ledger = Ledger::funded(&[100]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T1:0", "T1:1"]);

    assert_eq!(ledger.engine.submit(&tx), Err(TransferError::unknown_utxo("T1:1")));
    assert_eq!(ledger.keys_of(&ledger.alice.address), vec!["T1:0".to_string()]);
    assert!(ledger.keys_of(&ledger.bob.address).is_empty());
}

#[test]
fn underfunded_transfer_leaves_the_ledger_unchanged() {
    let ledger = Ledger::funded(&[100]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 96, 5, &["T1:0"]);

    assert_eq!(
        ledger.engine.submit(&tx),
        Err(TransferError::InsufficientBalance {
            available: 100,
            requested: 101
        })
    );
    assert_eq!(ledger.store().balance(&ledger.alice.address).unwrap(), 100);
    assert_eq!(ledger.store().output_count().unwrap(), 1);
}

#[test]
fn only_the_covering_prefix_is_spent() {
    let ledger = Ledger::funded(&[30, 50, 40]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 60, 0, &["T1:0", "T1:1", "T1:2"]);

    let receipt = ledger.engine.submit(&tx).unwrap();

    assert_eq!(
        receipt.spent.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(),
        vec!["T1:0", "T1:1"]
    );
    assert_eq!(receipt.change_output.as_ref().map(|o| o.amount), Some(20));

    let alice_keys = ledger.keys_of(&ledger.alice.address);
    assert!(alice_keys.contains(&"T1:2".to_string()));
    assert_eq!(ledger.store().balance(&ledger.alice.address).unwrap(), 60);
}

#[test]
fn replaying_a_settled_request_is_rejected() {
    let ledger = Ledger::funded(&[100]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T1:0"]);

    ledger.engine.submit(&tx).unwrap();
    assert_eq!(ledger.engine.submit(&tx), Err(TransferError::unknown_utxo("T1:0")));
    assert_eq!(ledger.store().total_value().unwrap(), 100);
}

#[test]
fn stale_validation_loses_at_commit_time() {
    let ledger = Ledger::funded(&[100]);
    let first = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T1:0"]);
    let second = ledger.transfer(&ledger.alice, &ledger.bob, 20, 0, &["T1:0"]);

    let first_inputs = ledger.engine.validate(&first).unwrap();
    let second_inputs = ledger.engine.validate(&second).unwrap();

    ledger.engine.settle(&first, &first_inputs).unwrap();
    let err = ledger.engine.settle(&second, &second_inputs).unwrap_err();

    assert!(matches!(err, TransferError::SettlementConflict(_)));
    assert!(err.is_retryable());
    assert_eq!(ledger.store().balance(&ledger.bob.address).unwrap(), 10);
    ledger.store().check_consistency().unwrap();
}

#[test]
fn settle_refuses_inputs_the_request_does_not_name() {
    let ledger = Ledger::funded(&[100, 500]);
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T1:0"]);
    let not_signed_for = Output::new(OutputKey::new("T1", 1), ledger.alice.address.clone(), 500);

    assert_eq!(
        ledger.engine.settle(&tx, &[not_signed_for]),
        Err(TransferError::unknown_utxo("T1:1"))
    );
    assert_eq!(
        ledger.keys_of(&ledger.alice.address),
        vec!["T1:0".to_string(), "T1:1".to_string()]
    );
    assert!(ledger.keys_of(&ledger.bob.address).is_empty());
}

#[test]
fn settle_refuses_inputs_of_another_owner() {
    let ledger = Ledger::funded(&[100]);
    GenesisFunding::new(ledger.engine.store().clone())
        .fund("T2", 0, &ledger.bob.address, 500)
        .unwrap();
    let bobs = ledger.store().owned_outputs(&ledger.bob.address).unwrap();
    let tx = ledger.transfer(&ledger.alice, &ledger.bob, 10, 0, &["T2:0"]);

    assert_eq!(
        ledger.engine.settle(&tx, &bobs),
        Err(TransferError::unknown_utxo("T2:0"))
    );
    assert_eq!(ledger.store().balance(&ledger.bob.address).unwrap(), 500);
}

#[test]
fn concurrent_spends_of_one_output_commit_once() {
    let ledger = Ledger::funded(&[100]);
    let requests: Vec<SignedTransaction> = (1..=16)
        .map(|amount| ledger.transfer(&ledger.alice, &ledger.bob, amount, 0, &["T1:0"]))
        .collect();

    let ledger = &ledger;
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|tx| scope.spawn(move || ledger.engine.submit(tx)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                result,
                TransferError::SettlementConflict(_) | TransferError::UnknownOrUnownedUtxo { .. }
            ),
            "unexpected rejection: {result:?}"
        );
    }
    assert_eq!(ledger.store().total_value().unwrap(), 100);
    ledger.store().check_consistency().unwrap();
}

#[test]
fn engine_runs_over_a_configured_store() {
    let store = open_store(&NodeConfig::default()).unwrap();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    GenesisFunding::new(store.clone())
        .fund("G", 0, &alice.address, 50)
        .unwrap();

    let engine = SettlementEngine::with_default_validator(store);
    let tx = Transaction {
        sender: alice.address.clone(),
        sender_pub_key: alice.public_key.clone(),
        receiver: bob.address.clone(),
        amount: 50,
        fee: 0,
        utxo_ids: vec![OutputKey::new("G", 0)],
    };
    let signature = alice.sign(&tx).unwrap();

    let receipt = engine.submit(&tx.into_signed(signature)).unwrap();
    assert!(receipt.change_output.is_none());
    assert_eq!(engine.store().balance(&bob.address).unwrap(), 50);
    assert_eq!(engine.store().balance(&alice.address).unwrap(), 0);
}

#[test]
fn signed_request_json_settles() {
    let ledger = Ledger::funded(&[100]);
    let json = ledger
        .transfer(&ledger.alice, &ledger.bob, 25, 1, &["T1:0"])
        .to_json()
        .unwrap();

    let parsed = SignedTransaction::from_json(&json).unwrap();
    let receipt = ledger.engine.submit(&parsed).unwrap();

    let rendered = serde_json::to_value(&receipt).unwrap();
    assert_eq!(rendered["receiver_output"]["amount"], 25);
    assert_eq!(rendered["change_output"]["amount"], 75);
    assert_eq!(rendered["digest"], receipt.digest.to_hex());
}

/// Ledger whose reads or commits can be switched off, as when the backing
/// service goes away.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryLedgerStore,
    reads_down: AtomicBool,
    commits_down: AtomicBool,
}

impl FlakyStore {
    fn unavailable() -> LedgerStoreError {
        LedgerStoreError::Unavailable("connection refused".into())
    }
}

impl LedgerStore for FlakyStore {
    fn list_outputs(&self, owner: &Address) -> Result<BTreeSet<OutputKey>, LedgerStoreError> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.list_outputs(owner)
    }

    fn read_output(&self, key: &OutputKey) -> Result<Option<OutputRecord>, LedgerStoreError> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.read_output(key)
    }

    fn apply_atomic(&self, batch: &MutationBatch) -> Result<(), LedgerStoreError> {
        if self.commits_down.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.apply_atomic(batch)
    }
}

fn flaky_ledger() -> (SettlementEngine<Arc<FlakyStore>>, Wallet, Wallet) {
    let store = Arc::new(FlakyStore::default());
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    GenesisFunding::new(store.clone())
        .fund("T1", 0, &alice.address, 100)
        .unwrap();
    (SettlementEngine::with_default_validator(store), alice, bob)
}

fn signed(from: &Wallet, to: &Wallet, amount: u64) -> SignedTransaction {
    let tx = Transaction {
        sender: from.address.clone(),
        sender_pub_key: from.public_key.clone(),
        receiver: to.address.clone(),
        amount,
        fee: 0,
        utxo_ids: vec![OutputKey::new("T1", 0)],
    };
    let signature = from.sign(&tx).unwrap();
    tx.into_signed(signature)
}

#[test]
fn unreadable_store_is_reported_as_unavailable() {
    let (engine, alice, bob) = flaky_ledger();
    let tx = signed(&alice, &bob, 10);

    engine.store().reads_down.store(true, Ordering::SeqCst);
    let err = engine.submit(&tx).unwrap_err();
    assert!(matches!(err, TransferError::StoreUnavailable(_)), "{err:?}");
    assert!(err.is_retryable());

    engine.store().reads_down.store(false, Ordering::SeqCst);
    assert_eq!(engine.store().inner.balance(&alice.address).unwrap(), 100);
    engine.submit(&tx).unwrap();
    assert_eq!(engine.store().inner.balance(&bob.address).unwrap(), 10);
}

#[test]
fn failed_commit_leaves_the_ledger_unchanged() {
    let (engine, alice, bob) = flaky_ledger();
    let tx = signed(&alice, &bob, 10);

    engine.store().commits_down.store(true, Ordering::SeqCst);
    let err = engine.submit(&tx).unwrap_err();
    assert!(matches!(err, TransferError::StoreUnavailable(_)), "{err:?}");

    let inner = &engine.store().inner;
    assert!(inner.read_output(&OutputKey::new("T1", 0)).unwrap().is_some());
    assert_eq!(inner.balance(&alice.address).unwrap(), 100);
    assert_eq!(inner.balance(&bob.address).unwrap(), 0);
    assert_eq!(inner.output_count().unwrap(), 1);
}

#[test]
fn genesis_funding_reports_an_unavailable_store() {
    let store = Arc::new(FlakyStore::default());
    store.commits_down.store(true, Ordering::SeqCst);
    let alice = Wallet::generate();

    let err = GenesisFunding::new(store.clone())
        .fund("G", 0, &alice.address, 50)
        .unwrap_err();

    assert!(matches!(err, TransferError::StoreUnavailable(_)), "{err:?}");
    assert_eq!(store.inner.output_count().unwrap(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        ..ProptestConfig::default()
    })]

    /// Property: a chain of transfers back and forth never changes the total
    /// value in the ledger and never breaks the owner index.
    #[test]
    fn transfer_chains_conserve_ledger_value(
        funding in prop::collection::vec(1u64..500u64, 1..6),
        steps in prop::collection::vec((any::<bool>(), 1u64..400u64, 0u64..10u64), 1..8),
    ) {
        let ledger = Ledger::funded(&funding);
        let total: u128 = funding.iter().map(|a| *a as u128).sum();

        for (alice_pays, amount, fee) in steps {
            let (from, to) = if alice_pays {
                (&ledger.alice, &ledger.bob)
            } else {
                (&ledger.bob, &ledger.alice)
            };
            let ids = ledger.keys_of(&from.address);
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            if ids.is_empty() {
                continue;
            }

            let tx = ledger.transfer(from, to, amount, fee, &ids);
            match ledger.engine.submit(&tx) {
                Ok(receipt) => {
                    prop_assert_eq!(receipt.minted_total(), receipt.spent_total());
                }
                Err(TransferError::InsufficientBalance { available, requested }) => {
                    prop_assert!(available < requested);
                }
                Err(other) => prop_assert!(false, "unexpected rejection: {other:?}"),
            }

            prop_assert_eq!(ledger.store().total_value().unwrap(), total);
            prop_assert!(ledger.store().check_consistency().is_ok());
        }
    }
}
