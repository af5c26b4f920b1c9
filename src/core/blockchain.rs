// This is the ledger - the heart of the system
// It owns the chain of sealed blocks and the pool of admitted transactions,
// and it is the only place where either of them changes

use crate::config::Config;
use crate::core::proof_of_work::{self, CancellationToken, ProofOfWork, MINING_DIFFICULTY};
use crate::core::transaction::TransactionOrigin;
use crate::core::{Block, Transaction, MINING_SENDER};
use crate::error::{BlockchainError, Result};
use crate::storage::MemoryPool;
use crate::utils::{current_timestamp, verify, PublicKey, Signature};
use crate::wallet::address_from_public_key;
use data_encoding::HEXLOWER;
use log::{info, warn};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Whether admission checks that the sender can afford the transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalancePolicy {
    #[default]
    Disabled,
    RequireFunds,
}

impl FromStr for BalancePolicy {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disabled" => Ok(BalancePolicy::Disabled),
            "require-funds" => Ok(BalancePolicy::RequireFunds),
            _ => Err(BlockchainError::Config(format!(
                "Invalid balance policy: {s}. Valid options: disabled, require-funds"
            ))),
        }
    }
}

// The chain and the pool change together, so they share one lock
struct LedgerState {
    chain: Vec<Block>,
    pool: MemoryPool,
}

// Cloning a Blockchain hands out another handle to the same ledger
#[derive(Clone)]
pub struct Blockchain {
    state: Arc<RwLock<LedgerState>>,
    address: String, // Receives the mining reward
    port: u16,       // Only used by the node server
    difficulty: usize,
    balance_policy: BalancePolicy,
}

impl Blockchain {
    // When I want a ledger with the default difficulty and no balance checks
    pub fn new(address: &str, port: u16) -> Result<Blockchain> {
        Self::with_options(address, port, MINING_DIFFICULTY, BalancePolicy::Disabled)
    }

    // When the node server builds its ledger from the loaded configuration
    pub fn with_config(address: &str, config: &Config) -> Result<Blockchain> {
        Self::with_options(
            address,
            config.port()?,
            config.mining_difficulty,
            config.balance_policy,
        )
    }

    pub fn with_options(
        address: &str,
        port: u16,
        difficulty: usize,
        balance_policy: BalancePolicy,
    ) -> Result<Blockchain> {
        if address.is_empty() {
            return Err(BlockchainError::InvalidAddress(
                "Ledger address must not be empty".to_string(),
            ));
        }
        if difficulty > proof_of_work::MAX_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "Difficulty {difficulty} can never be met"
            )));
        }

        // The genesis block always exists, so the chain is never empty
        let genesis = Block::generate_genesis_block(current_timestamp()?)?;
        info!(
            "Creating genesis block {} for address: {address}",
            genesis.hash_hex()?
        );

        Ok(Blockchain {
            state: Arc::new(RwLock::new(LedgerState {
                chain: vec![genesis],
                pool: MemoryPool::new(),
            })),
            address: address.to_string(),
            port,
            difficulty,
            balance_policy,
        })
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|e| BlockchainError::Lock(format!("Ledger read lock poisoned: {e}")))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|e| BlockchainError::Lock(format!("Ledger write lock poisoned: {e}")))
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn balance_policy(&self) -> BalancePolicy {
        self.balance_policy
    }

    pub fn chain_snapshot(&self) -> Result<Vec<Block>> {
        Ok(self.read_state()?.chain.clone())
    }

    pub fn pool_snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.read_state()?.pool.get_all())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_state()?.chain.len())
    }

    // When a caller only cares whether the transaction got in
    // The reason for a rejection is logged, never returned
    pub fn submit(
        &self,
        transaction: Transaction,
        sender_public_key: &PublicKey,
        signature: &Signature,
    ) -> bool {
        match self.try_submit(transaction, sender_public_key, signature) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error : Verify Transaction ({e})");
                false
            }
        }
    }

    /// Admits a signed transfer into the pool.
    ///
    /// Checks run in this order and the first failure is returned:
    /// 1. sender and recipient are non-empty
    /// 2. sender is not the reserved mining sender
    /// 3. sender address is the one derived from `sender_public_key`
    /// 4. `signature` verifies over the transaction digest
    /// 5. under `BalancePolicy::RequireFunds`, confirmed balance minus the
    ///    sender's pending outgoing value covers the amount
    pub fn try_submit(
        &self,
        transaction: Transaction,
        sender_public_key: &PublicKey,
        signature: &Signature,
    ) -> Result<()> {
        let origin = TransactionOrigin::Authored {
            public_key: sender_public_key.clone(),
            signature: *signature,
        };
        // Verification is pure CPU work, so I do it before taking the lock
        Self::check_origin(&transaction, &origin)?;

        let mut state = self.write_state()?;
        if self.balance_policy == BalancePolicy::RequireFunds {
            Self::check_funds(&state, &transaction)?;
        }

        info!(
            "Admitted transaction from {} to {} (value {})",
            transaction.get_sender(),
            transaction.get_recipient(),
            transaction.get_value()
        );
        state.pool.add(transaction);
        Ok(())
    }

    // I check the origin of every transaction before it can touch the pool
    fn check_origin(transaction: &Transaction, origin: &TransactionOrigin) -> Result<()> {
        match origin {
            TransactionOrigin::SystemMinted => {
                if !transaction.is_reward() {
                    return Err(BlockchainError::Transaction(
                        "Only the mining authority can mint".to_string(),
                    ));
                }
                Ok(())
            }
            TransactionOrigin::Authored {
                public_key,
                signature,
            } => {
                // Malformed input never reaches the cryptography
                if transaction.get_sender().is_empty() || transaction.get_recipient().is_empty() {
                    return Err(BlockchainError::Transaction(
                        "Sender and recipient are required".to_string(),
                    ));
                }
                if transaction.get_sender() == MINING_SENDER {
                    return Err(BlockchainError::Transaction(format!(
                        "Sender {MINING_SENDER} is reserved for the mining authority"
                    )));
                }
                // The key must be the one the sender address was derived from
                let derived = address_from_public_key(public_key);
                if derived != transaction.get_sender() {
                    return Err(BlockchainError::InvalidAddress(format!(
                        "{} does not belong to the presented public key",
                        transaction.get_sender()
                    )));
                }

                let digest = transaction.digest()?;
                if !verify(public_key, &digest, signature) {
                    return Err(BlockchainError::InvalidSignature);
                }
                Ok(())
            }
        }
    }

    // Confirmed balance minus whatever the sender already has waiting in the pool
    fn check_funds(state: &LedgerState, transaction: &Transaction) -> Result<()> {
        let sender = transaction.get_sender();
        let pending_out: i128 = state
            .pool
            .iter()
            .filter(|tx| tx.get_sender() == sender)
            .map(|tx| tx.get_value() as i128)
            .sum();
        let available = Self::replay_balance(&state.chain, sender) - pending_out;

        if available < transaction.get_value() as i128 {
            return Err(BlockchainError::InsufficientFunds {
                required: transaction.get_value(),
                available,
            });
        }
        Ok(())
    }

    pub fn mine(&self) -> Result<Block> {
        self.mine_with_cancel(&CancellationToken::new())
    }

    // This is the whole mining run: reward, search, seal
    // I hold the write lock from start to finish, so nothing can join the pool
    // mid-search and the sealed transactions are exactly the ones the nonce was
    // proven against
    pub fn mine_with_cancel(&self, cancel: &CancellationToken) -> Result<Block> {
        let mut state = self.write_state()?;
        let pool_len_before = state.pool.len();

        let reward = Transaction::new_reward(&self.address);
        Self::check_origin(&reward, &TransactionOrigin::SystemMinted)?;
        state.pool.add(reward);

        let transactions = state.pool.get_all();
        let last_block = state
            .chain
            .last()
            .ok_or_else(|| BlockchainError::InvalidBlock("Chain has no genesis block".to_string()))?;
        let previous_hash = last_block.hash()?;
        let not_before = last_block.get_timestamp();

        info!(
            "Mining block {} with {} transactions (difficulty: {})",
            state.chain.len(),
            transactions.len(),
            self.difficulty
        );

        let search = ProofOfWork::new_proof_of_work(&previous_hash, &transactions, self.difficulty)
            .and_then(|pow| pow.run(cancel));
        let nonce = match search {
            Ok(Some(nonce)) => nonce,
            Ok(None) => {
                // Leave the pool exactly as it was before the reward went in
                state.pool.truncate(pool_len_before);
                warn!("action=mining status=cancelled");
                return Err(BlockchainError::Mining("cancelled".to_string()));
            }
            Err(e) => {
                state.pool.truncate(pool_len_before);
                return Err(e);
            }
        };

        // Timestamps never go backwards along the chain
        let timestamp = current_timestamp()?.max(not_before);
        let block = Block::new(timestamp, nonce, previous_hash, state.pool.take_all());
        state.chain.push(block.clone());

        info!(
            "action=mining status=success nonce={nonce} previous_hash={}",
            HEXLOWER.encode(&previous_hash)
        );
        Ok(block)
    }

    // Balance is a fold over every sealed transaction, recomputed per call
    pub fn balance_of(&self, address: &str) -> Result<i128> {
        let state = self.read_state()?;
        Ok(Self::replay_balance(&state.chain, address))
    }

    fn replay_balance(chain: &[Block], address: &str) -> i128 {
        let mut total: i128 = 0;
        for block in chain {
            for tx in block.get_transactions() {
                let value = tx.get_value() as i128;
                if tx.get_recipient() == address {
                    total += value;
                }
                if tx.get_sender() == address {
                    total -= value;
                }
            }
        }
        total
    }

    /// Checks every back-link and every mined block's proof.
    pub fn is_valid_chain(&self) -> Result<bool> {
        let state = self.read_state()?;
        let chain = &state.chain;

        let genesis = match chain.first() {
            Some(genesis) => genesis,
            None => return Ok(false),
        };
        if *genesis.get_previous_hash() != Block::empty().hash()? {
            warn!("Genesis block is not anchored to the empty block");
            return Ok(false);
        }

        for (height, pair) in chain.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            if *current.get_previous_hash() != previous.hash()? {
                warn!("Block {} does not link to its predecessor", height + 1);
                return Ok(false);
            }
            if current.get_timestamp() < previous.get_timestamp() {
                warn!("Block {} goes back in time", height + 1);
                return Ok(false);
            }
            if !proof_of_work::validate(current, self.difficulty) {
                warn!("Block {} carries an invalid proof", height + 1);
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn push_block_unchecked(&self, block: Block) -> Result<()> {
        self.write_state()?.chain.push(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MINING_REWARD;
    use crate::testnet::{create_test_blockchain, create_test_wallets, signed_transfer};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_ledger_has_only_genesis() {
        let blockchain = create_test_blockchain(1);
        assert_eq!(blockchain.len().unwrap(), 1);
        assert!(blockchain.pool_snapshot().unwrap().is_empty());
        assert!(blockchain.is_valid_chain().unwrap());
    }

    #[test]
    fn test_with_config_carries_settings() {
        let config = Config {
            node_addr: "127.0.0.1:6100".to_string(),
            mining_difficulty: 2,
            balance_policy: BalancePolicy::RequireFunds,
        };
        let blockchain = Blockchain::with_config("A1", &config).unwrap();
        assert_eq!(blockchain.address(), "A1");
        assert_eq!(blockchain.port(), 6100);
        assert_eq!(blockchain.difficulty(), 2);
        assert_eq!(blockchain.balance_policy(), BalancePolicy::RequireFunds);
    }

    #[test]
    fn test_empty_address_rejected() {
        assert!(Blockchain::new("", 5000).is_err());
        assert!(Blockchain::with_options("A1", 5000, 65, BalancePolicy::Disabled).is_err());
    }

    #[test]
    fn test_reward_only_mine() {
        let blockchain = Blockchain::with_options("A1", 5000, 1, BalancePolicy::Disabled).unwrap();
        let block = blockchain.mine().unwrap();

        assert_eq!(blockchain.len().unwrap(), 2);
        assert_eq!(block.get_transactions().len(), 1);
        assert!(block.get_transactions()[0].is_reward());
        assert_eq!(blockchain.balance_of("A1").unwrap(), MINING_REWARD as i128);
        assert_eq!(
            blockchain.balance_of(MINING_SENDER).unwrap(),
            -(MINING_REWARD as i128)
        );
        assert!(blockchain.pool_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_pool_order_preserved_into_block() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(3);

        for (i, wallet) in wallets.iter().enumerate() {
            let (tx, sig) = signed_transfer(wallet, "WB", (i as u64 + 1) * 10);
            assert!(blockchain.submit(tx, wallet.public_key(), &sig));
        }

        let block = blockchain.mine().unwrap();
        let values: Vec<u64> = block
            .get_transactions()
            .iter()
            .map(|tx| tx.get_value())
            .collect();
        assert_eq!(values, vec![10, 20, 30, MINING_REWARD]);
        assert!(blockchain.pool_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_rejections_leave_pool_untouched() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(2);
        let (tx, sig) = signed_transfer(&wallets[0], "WB", 5);

        // Wrong key for the sender address
        let result = blockchain.try_submit(tx.clone(), wallets[1].public_key(), &sig);
        assert!(matches!(result, Err(BlockchainError::InvalidAddress(_))));

        // Signature made over a different transaction
        let (_, other_sig) = signed_transfer(&wallets[0], "WB", 6);
        let result = blockchain.try_submit(tx.clone(), wallets[0].public_key(), &other_sig);
        assert_eq!(result, Err(BlockchainError::InvalidSignature));

        // Empty recipient
        let empty = Transaction::new(wallets[0].address(), "", 5);
        let sig = wallets[0].sign_transaction(&empty).unwrap();
        assert!(!blockchain.submit(empty, wallets[0].public_key(), &sig));

        assert!(blockchain.pool_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_mining_sender_cannot_be_claimed() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(1);
        let forged = Transaction::new(MINING_SENDER, wallets[0].address(), 1_000);
        let sig = wallets[0].sign_transaction(&forged).unwrap();

        let result = blockchain.try_submit(forged, wallets[0].public_key(), &sig);
        assert!(matches!(result, Err(BlockchainError::Transaction(_))));
        assert!(blockchain.pool_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_system_minted_requires_reward_sender() {
        let tx = Transaction::new("alice", "bob", 1);
        assert!(Blockchain::check_origin(&tx, &TransactionOrigin::SystemMinted).is_err());
        let reward = Transaction::new_reward("miner");
        assert!(Blockchain::check_origin(&reward, &TransactionOrigin::SystemMinted).is_ok());
    }

    #[test]
    fn test_require_funds_policy() {
        let wallets = create_test_wallets(1);
        let sender = &wallets[0];
        // The sender is also the ledger address, so mining funds it
        let blockchain =
            Blockchain::with_options(sender.address(), 5000, 1, BalancePolicy::RequireFunds)
                .unwrap();

        let (tx, sig) = signed_transfer(sender, "WB", 1);
        let result = blockchain.try_submit(tx, sender.public_key(), &sig);
        assert!(matches!(
            result,
            Err(BlockchainError::InsufficientFunds { required: 1, available: 0 })
        ));

        blockchain.mine().unwrap();

        let (tx, sig) = signed_transfer(sender, "WB", MINING_REWARD / 2);
        assert!(blockchain.submit(tx, sender.public_key(), &sig));
        let (tx, sig) = signed_transfer(sender, "WB", MINING_REWARD / 2);
        assert!(blockchain.submit(tx, sender.public_key(), &sig));
        // Pending spends count against the balance
        let (tx, sig) = signed_transfer(sender, "WB", 1);
        assert!(!blockchain.submit(tx, sender.public_key(), &sig));
        assert_eq!(blockchain.pool_snapshot().unwrap().len(), 2);
    }

    #[test]
    fn test_disabled_policy_allows_overdraft() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(1);
        let (tx, sig) = signed_transfer(&wallets[0], "WB", 500);
        assert!(blockchain.submit(tx, wallets[0].public_key(), &sig));
        blockchain.mine().unwrap();
        assert_eq!(blockchain.balance_of(wallets[0].address()).unwrap(), -500);
        assert_eq!(blockchain.balance_of("WB").unwrap(), 500);
    }

    #[test]
    fn test_pending_transactions_not_counted() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(1);
        let (tx, sig) = signed_transfer(&wallets[0], "WB", 500);
        assert!(blockchain.submit(tx, wallets[0].public_key(), &sig));
        assert_eq!(blockchain.balance_of("WB").unwrap(), 0);
    }

    #[test]
    fn test_cancelled_mining_changes_nothing() {
        let blockchain = Blockchain::with_options("A1", 5000, 64, BalancePolicy::Disabled).unwrap();
        let wallets = create_test_wallets(1);
        let (tx, sig) = signed_transfer(&wallets[0], "WB", 5);
        assert!(blockchain.submit(tx.clone(), wallets[0].public_key(), &sig));

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            canceller.cancel();
        });

        let result = blockchain.mine_with_cancel(&cancel);
        handle.join().unwrap();

        assert_eq!(result, Err(BlockchainError::Mining("cancelled".to_string())));
        assert_eq!(blockchain.len().unwrap(), 1);
        assert_eq!(blockchain.pool_snapshot().unwrap(), vec![tx]);
    }

    #[test]
    fn test_concurrent_submissions_are_not_lost() {
        let blockchain = create_test_blockchain(1);
        let wallets = create_test_wallets(8);

        let handles: Vec<_> = wallets
            .into_iter()
            .map(|wallet| {
                let blockchain = blockchain.clone();
                thread::spawn(move || {
                    let (tx, sig) = signed_transfer(&wallet, "WB", 1);
                    blockchain.submit(tx, wallet.public_key(), &sig)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(blockchain.pool_snapshot().unwrap().len(), 8);
    }

    #[test]
    fn test_submit_waits_for_running_mine() {
        let blockchain = Blockchain::with_options("A1", 5000, 64, BalancePolicy::Disabled).unwrap();
        let wallets = create_test_wallets(2);
        let (early, early_sig) = signed_transfer(&wallets[0], "WB", 5);
        assert!(blockchain.submit(early.clone(), wallets[0].public_key(), &early_sig));

        let cancel = CancellationToken::new();
        let miner = {
            let blockchain = blockchain.clone();
            let cancel = cancel.clone();
            thread::spawn(move || blockchain.mine_with_cancel(&cancel))
        };
        thread::sleep(Duration::from_millis(20));

        let submitted = Arc::new(AtomicBool::new(false));
        let (late, late_sig) = signed_transfer(&wallets[1], "WB", 7);
        let submitter = {
            let blockchain = blockchain.clone();
            let submitted = Arc::clone(&submitted);
            let late = late.clone();
            let public_key = wallets[1].public_key().clone();
            thread::spawn(move || {
                let admitted = blockchain.submit(late, &public_key, &late_sig);
                submitted.store(true, Ordering::SeqCst);
                admitted
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!submitted.load(Ordering::SeqCst));

        cancel.cancel();
        assert!(miner.join().unwrap().is_err());
        assert!(submitter.join().unwrap());
        assert_eq!(blockchain.pool_snapshot().unwrap(), vec![early, late]);
        assert_eq!(blockchain.len().unwrap(), 1);
    }

    #[test]
    fn test_late_submission_stays_out_of_sealed_block() {
        let blockchain = Blockchain::with_options("A1", 5000, 4, BalancePolicy::Disabled).unwrap();
        let wallets = create_test_wallets(2);
        let (early, early_sig) = signed_transfer(&wallets[0], "WB", 5);
        assert!(blockchain.submit(early.clone(), wallets[0].public_key(), &early_sig));

        let miner = {
            let blockchain = blockchain.clone();
            thread::spawn(move || blockchain.mine())
        };
        thread::sleep(Duration::from_millis(10));

        let (late, late_sig) = signed_transfer(&wallets[1], "WB", 7);
        assert!(blockchain.submit(late.clone(), wallets[1].public_key(), &late_sig));

        let block = miner.join().unwrap().unwrap();
        assert_eq!(
            block.get_transactions(),
            &[early, Transaction::new_reward("A1")][..]
        );
        assert_eq!(blockchain.pool_snapshot().unwrap(), vec![late]);
        assert!(blockchain.is_valid_chain().unwrap());
    }

    #[test]
    fn test_tampered_chain_detected() {
        let blockchain = create_test_blockchain(1);
        blockchain.mine().unwrap();
        assert!(blockchain.is_valid_chain().unwrap());

        blockchain
            .push_block_unchecked(Block::new(i64::MAX, 0, [0u8; 32], vec![]))
            .unwrap();
        assert!(!blockchain.is_valid_chain().unwrap());
    }

    #[test]
    fn test_balance_policy_from_str() {
        assert_eq!(
            "Require-Funds".parse::<BalancePolicy>().unwrap(),
            BalancePolicy::RequireFunds
        );
        assert_eq!(
            "disabled".parse::<BalancePolicy>().unwrap(),
            BalancePolicy::Disabled
        );
        assert!("maybe".parse::<BalancePolicy>().is_err());
    }
}
