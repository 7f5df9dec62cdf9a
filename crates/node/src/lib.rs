//! `utxo-node`: operator commands over a configured ledger store.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{DemoReport, Node, sign_request};
