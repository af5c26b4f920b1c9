//! # pow-ledger - A Proof-of-Work Ledger with Signed Transfers
//!
//! This is a single-node ledger: an append-only chain of blocks secured by
//! proof-of-work, plus the wallet side that creates addresses and signs the
//! transfers the ledger admits.
//!
//! ## What Is Here
//! - **Ledger**: admission with ECDSA P-256 signature checks, nonce search,
//!   block sealing, balance replay
//! - **Wallet**: key generation and Bitcoin-style base58check addresses
//! - **Node**: JSON-over-TCP server exposing the ledger, and a client for it
//!
//! ## How the Code Is Organized
//! - `core/`: transactions, blocks, proof-of-work and the ledger itself
//! - `wallet/`: address derivation pipeline and transaction signing
//! - `storage/`: the pending-transaction pool
//! - `network/`: node server and client
//! - `config/`: node settings from defaults, TOML and environment
//! - `utils/`: cryptographic primitives and the canonical byte encoding
//! - `cli/`: command-line interface
//!
//! ## Where to Start
//! 1. `core/blockchain.rs` for admission, mining and balances
//! 2. `core/proof_of_work.rs` for the nonce search and its predicate
//! 3. `wallet/address.rs` for how a public key becomes an address

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    valid_proof, BalancePolicy, Block, Blockchain, CancellationToken, ProofOfWork,
    SignedTransaction, Transaction, MINING_DIFFICULTY, MINING_REWARD, MINING_SENDER,
};
pub use error::{BlockchainError, Result};
pub use network::{send_request, Request, Response, Server};
pub use storage::MemoryPool;
pub use utils::{
    base58_decode, base58_encode, current_timestamp, ripemd160_digest, sha256_digest, verify,
    KeyPair, PublicKey, Signature,
};
pub use wallet::{
    address_from_public_key, decode_address, hash_pub_key, validate_address, Wallet,
    ADDRESS_CHECK_SUM_LEN,
};
