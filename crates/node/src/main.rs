use anyhow::{Context, Result};
use clap::Parser;

use utxo_infra::{NodeConfig, open_store};
use utxo_node::{Cli, Node};
use utxo_observability::LogFormat;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::from_env().context("loading configuration")?;
    utxo_observability::init_with(LogFormat::from_json_flag(config.json_logs));

    tracing::info!(backend = ?config.backend, "starting ledger node");
    let store = open_store(&config).context("opening ledger store")?;

    let stdout = std::io::stdout();
    Node::new(store).run(cli.command, &mut stdout.lock())
}
