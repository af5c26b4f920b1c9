//! Core ledger functionality
//!
//! This module contains the fundamental components: transactions, blocks,
//! the proof-of-work search and the ledger that ties them together.

pub mod block;
pub mod blockchain;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{BalancePolicy, Blockchain};
pub use monetary::{MINING_REWARD, MINING_SENDER, UNITS_PER_COIN};
pub use proof_of_work::{
    valid_proof, CancellationToken, ProofOfWork, MAX_DIFFICULTY, MINING_DIFFICULTY,
};
pub use transaction::{SignedTransaction, Transaction};
