//! Subcommand implementations.
//!
//! Every command writes its result to the given writer as one JSON document;
//! logs go through `tracing` to stderr.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use utxo_core::{Address, Output, OutputKey, SignedTransaction, Transaction};
use utxo_crypto::Wallet;
use utxo_infra::LedgerStore;
use utxo_settlement::{GenesisFunding, SettlementEngine, SettlementReceipt};

use crate::cli::Command;

pub type SharedStore = Arc<dyn LedgerStore>;

/// Result of [`Node::demo`].
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub sender: Address,
    pub receiver: Address,
    pub receipt: SettlementReceipt,
    pub sender_balance: u128,
    pub receiver_balance: u128,
}

#[derive(Debug, Serialize)]
struct Balance<'a> {
    address: &'a Address,
    balance: u128,
}

#[derive(Debug, Serialize)]
struct Outputs<'a> {
    address: &'a Address,
    outputs: Vec<Output>,
}

/// A ledger node bound to one store.
pub struct Node {
    engine: SettlementEngine<SharedStore>,
    genesis: GenesisFunding<SharedStore>,
}

impl Node {
    pub fn new(store: SharedStore) -> Self {
        Self {
            genesis: GenesisFunding::new(store.clone()),
            engine: SettlementEngine::with_default_validator(store),
        }
    }

    pub fn store(&self) -> &SharedStore {
        self.engine.store()
    }

    pub fn run(&self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Demo {
                funding,
                amount,
                fee,
            } => write_json(out, &self.demo(funding, amount, fee)?),
            Command::Keygen => write_json(out, &Wallet::generate()),
            Command::Sign { private_key, input } => {
                let raw = read_input(input.as_deref())?;
                write_json(out, &sign_request(&raw, &private_key)?)
            }
            Command::Fund {
                txn_id,
                index,
                address,
                amount,
            } => {
                let output = self
                    .genesis
                    .fund(&txn_id, index, &parse_address(&address)?, amount)
                    .context("funding failed")?;
                write_json(out, &output)
            }
            Command::Submit { input } => {
                let raw = read_input(input.as_deref())?;
                write_json(out, &self.submit(&raw)?)
            }
            Command::Balance { address } => {
                let address = parse_address(&address)?;
                let balance = self.store().balance(&address).context("reading balance")?;
                write_json(
                    out,
                    &Balance {
                        address: &address,
                        balance,
                    },
                )
            }
            Command::Outputs { address } => {
                let address = parse_address(&address)?;
                let outputs = self
                    .store()
                    .owned_outputs(&address)
                    .context("listing outputs")?;
                write_json(
                    out,
                    &Outputs {
                        address: &address,
                        outputs,
                    },
                )
            }
        }
    }

    /// Settle a signed request given as JSON.
    pub fn submit(&self, raw: &str) -> Result<SettlementReceipt> {
        let request = SignedTransaction::from_json(raw).context("parsing signed request")?;
        let receipt = self.engine.submit(&request).context("transfer rejected")?;
        Ok(receipt)
    }

    /// Two fresh wallets, one genesis output and one transfer between them.
    pub fn demo(&self, funding: u64, amount: u64, fee: u64) -> Result<DemoReport> {
        let sender = Wallet::generate();
        let receiver = Wallet::generate();

        let genesis_id = format!("genesis-{}", sender.address);
        let funded = self
            .genesis
            .fund(&genesis_id, 0, &sender.address, funding)
            .context("funding the demo sender")?;
        info!(output = %funded.key, amount = funded.amount, "demo sender funded");

        let transaction = Transaction {
            sender: sender.address.clone(),
            sender_pub_key: sender.public_key.clone(),
            receiver: receiver.address.clone(),
            amount,
            fee,
            utxo_ids: vec![OutputKey::new(&genesis_id, 0)],
        };
        let signature = sender.sign(&transaction).context("signing demo transfer")?;
        let receipt = self
            .engine
            .submit(&transaction.into_signed(signature))
            .context("demo transfer rejected")?;

        Ok(DemoReport {
            sender_balance: self.store().balance(&sender.address)?,
            receiver_balance: self.store().balance(&receiver.address)?,
            sender: sender.address,
            receiver: receiver.address,
            receipt,
        })
    }
}

/// Sign an unsigned transaction given as JSON.
pub fn sign_request(raw: &str, private_key: &str) -> Result<SignedTransaction> {
    let transaction: Transaction =
        serde_json::from_str(raw).context("parsing unsigned transaction")?;
    let signature = utxo_crypto::sign(&transaction, private_key).context("signing")?;
    Ok(transaction.into_signed(signature))
}

fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("address cannot be empty");
    }
    Ok(Address::new(trimmed))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("writing output")?;
    writeln!(out)?;
    Ok(())
}
