// Entry point for the ledger node and its wallet client
use clap::Parser;
use log::{error, info, LevelFilter};
use pow_ledger::core::monetary::{coins_to_units, units_to_coins};
use pow_ledger::network::{Status, TransactionRequest};
use pow_ledger::{
    send_request, validate_address, Blockchain, Command, Config, Opt, Request, Response, Server,
    Wallet,
};
use std::process;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(opt: &Opt) -> pow_ledger::Result<Config> {
    match &opt.config {
        Some(path) => Config::load(path),
        None => Config::new(),
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&opt)?;
    match opt.command {
        // The node owns its ledger; handlers get clones of the same handle
        Command::StartNode { port } => {
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };

            let miners_wallet = Wallet::new()?;
            info!("Miner address {}", miners_wallet.address());
            info!("Miner public key {}", miners_wallet.public_key());

            let blockchain = Blockchain::with_config(miners_wallet.address(), &config)?;
            info!(
                "Ledger on port {} (difficulty: {}, balance policy: {:?})",
                blockchain.port(),
                blockchain.difficulty(),
                blockchain.balance_policy()
            );
            let server = Server::new(blockchain);
            server.run(&config.node_addr)?
        }
        Command::Createwallet => {
            let wallet = Wallet::new()?;
            println!("Your new address: {}", wallet.address());
            println!("Public key:       {}", wallet.public_key());
            println!("Private key:      {}", wallet.private_key_hex());
        }
        Command::Send {
            private_key,
            to,
            amount,
            node,
        } => {
            if !validate_address(&to) {
                return Err(format!("Invalid recipient address: {to}").into());
            }
            let wallet = Wallet::from_private_key_hex(&private_key)?;
            let signed = wallet.create_transaction(&to, coins_to_units(amount)?)?;

            let request = Request::PostTransaction(TransactionRequest {
                sender_blockchain_address: Some(wallet.address().to_string()),
                recipient_blockchain_address: Some(to),
                sender_public_key: Some(signed.public_key.to_hex()),
                value: Some(amount),
                signature: Some(signed.signature.to_hex()),
            });
            match send_request(&node, &request)? {
                Response::Status {
                    status: Status::Success,
                    ..
                } => println!("Success!"),
                Response::Status { message, .. } => {
                    return Err(format!("Transaction rejected: {message}").into())
                }
                other => return Err(format!("Unexpected response: {other:?}").into()),
            }
        }
        Command::Mine { node } => match send_request(&node, &Request::Mine)? {
            Response::Mined { block } => {
                println!("Mined block {}", block.hash_hex()?);
                println!("{block}");
            }
            Response::Status { message, .. } => return Err(format!("Mining failed: {message}").into()),
            other => return Err(format!("Unexpected response: {other:?}").into()),
        },
        Command::GetBalance { address, node } => {
            let request = Request::Amount {
                blockchain_address: address.clone(),
            };
            match send_request(&node, &request)? {
                Response::Amount { amount } => println!("Balance of {address}: {amount}"),
                other => return Err(format!("Unexpected response: {other:?}").into()),
            }
        }
        Command::Printchain { node } => match send_request(&node, &Request::GetChain)? {
            Response::Chain { chain } => {
                for (i, block) in chain.iter().enumerate() {
                    println!("{} Chain {} {}", "=".repeat(25), i, "=".repeat(25));
                    println!("{block}");
                }
                println!("{}", "*".repeat(25));
            }
            other => return Err(format!("Unexpected response: {other:?}").into()),
        },
        Command::Pool { node } => match send_request(&node, &Request::GetTransactions)? {
            Response::Transactions {
                transactions,
                length,
            } => {
                println!("{length} pending transaction(s)");
                let mut total: i128 = 0;
                for tx in &transactions {
                    total += tx.get_value() as i128;
                    println!("{tx}");
                }
                println!("Pending value: {}", units_to_coins(total));
            }
            other => return Err(format!("Unexpected response: {other:?}").into()),
        },
    }
    Ok(())
}
