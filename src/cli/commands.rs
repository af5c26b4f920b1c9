use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_NODE: &str = "127.0.0.1:5000";

#[derive(Debug, Parser)]
#[command(name = "pow-ledger")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long = "port", help = "TCP port number for the ledger server")]
        port: Option<u16>,
    },
    #[command(name = "createwallet", about = "Create a new wallet and print its keys")]
    Createwallet,
    #[command(name = "send", about = "Sign a transfer and post it to a node")]
    Send {
        #[arg(long = "private-key", help = "Sender private key as printed by createwallet")]
        private_key: String,
        #[arg(long = "to", help = "Recipient address")]
        to: String,
        #[arg(long = "amount", help = "Amount to send, in coins")]
        amount: f64,
        #[arg(long = "node", default_value = DEFAULT_NODE, help = "Node address")]
        node: String,
    },
    #[command(name = "mine", about = "Ask a node to mine the pending transactions")]
    Mine {
        #[arg(long = "node", default_value = DEFAULT_NODE, help = "Node address")]
        node: String,
    },
    #[command(
        name = "getbalance",
        about = "Get the confirmed balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
        #[arg(long = "node", default_value = DEFAULT_NODE, help = "Node address")]
        node: String,
    },
    #[command(name = "printchain", about = "Print all blocks in the chain")]
    Printchain {
        #[arg(long = "node", default_value = DEFAULT_NODE, help = "Node address")]
        node: String,
    },
    #[command(name = "pool", about = "Print the pending transactions")]
    Pool {
        #[arg(long = "node", default_value = DEFAULT_NODE, help = "Node address")]
        node: String,
    },
}
