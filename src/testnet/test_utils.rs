//! Test utilities for ledger testing

use crate::core::{BalancePolicy, Blockchain, Transaction};
use crate::utils::Signature;
use crate::wallet::Wallet;

/// Port handed to test ledgers; nothing binds to it
pub const TEST_PORT: u16 = 5000;

/// Create a ledger rewarding a fresh wallet, with an easy difficulty
pub fn create_test_blockchain(difficulty: usize) -> Blockchain {
    let miner = Wallet::new().unwrap();
    Blockchain::with_options(
        miner.address(),
        TEST_PORT,
        difficulty,
        BalancePolicy::Disabled,
    )
    .unwrap()
}

/// Create test wallets
pub fn create_test_wallets(count: usize) -> Vec<Wallet> {
    (0..count).map(|_| Wallet::new().unwrap()).collect()
}

/// Create a transfer from `wallet` and its signature
pub fn signed_transfer(wallet: &Wallet, to: &str, value: u64) -> (Transaction, Signature) {
    let tx = Transaction::new(wallet.address(), to, value);
    let signature = wallet.sign_transaction(&tx).unwrap();
    (tx, signature)
}
