use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "utxo-node", version, about = "UTXO settlement ledger operator tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// The memory backend lives only as long as one invocation; `fund`, `submit`,
/// `balance` and `outputs` are meant for `LEDGER_BACKEND=redis`.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fund a fresh wallet, transfer part of it to another and print the result
    Demo {
        /// Genesis value minted to the sender
        #[arg(long, default_value_t = 100)]
        funding: u64,

        #[arg(long, default_value_t = 10)]
        amount: u64,

        #[arg(long, default_value_t = 0)]
        fee: u64,
    },

    /// Generate a wallet and print it as JSON
    Keygen,

    /// Sign an unsigned transaction (JSON) and print the signed request
    Sign {
        /// Sender private key, 64 hex chars
        #[arg(long)]
        private_key: String,

        /// Unsigned transaction file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Mint a genesis output
    Fund {
        #[arg(long)]
        txn_id: String,

        #[arg(long, default_value_t = 0)]
        index: u32,

        #[arg(long)]
        address: String,

        #[arg(long)]
        amount: u64,
    },

    /// Validate and settle a signed transfer request (JSON)
    Submit {
        /// Signed request file (stdin if omitted)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the spendable balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },

    /// List the unspent outputs of an address
    Outputs {
        #[arg(long)]
        address: String,
    },
}
