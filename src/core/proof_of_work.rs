use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Number of leading '0' hex characters a block hash needs.
pub const MINING_DIFFICULTY: usize = 3;

/// Hex digits in a SHA-256 hash; no difficulty above this can be met.
pub const MAX_DIFFICULTY: usize = 64;

// The candidate block always uses this timestamp so the predicate is reproducible
const PROOF_TIMESTAMP: i64 = 0;

/// Shared flag that stops a running nonce search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Nonce search over a fixed previous hash and transaction set.
///
/// The candidate block is `Block { timestamp: 0, nonce, previous_hash, transactions }`.
/// Its canonical encoding is the concatenation of the field encodings, so
/// everything except the nonce is encoded once up front.
pub struct ProofOfWork {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new_proof_of_work(
        previous_hash: &[u8; 32],
        transactions: &[Transaction],
        difficulty: usize,
    ) -> Result<ProofOfWork> {
        let prefix = serialize(&PROOF_TIMESTAMP)?;
        let mut suffix = serialize(previous_hash)?;
        suffix.extend(serialize(&transactions.to_vec())?);
        Ok(ProofOfWork {
            prefix,
            suffix,
            difficulty,
        })
    }

    fn prepare_data(&self, nonce: u64) -> Result<Vec<u8>> {
        let mut data_bytes = Vec::with_capacity(self.prefix.len() + 10 + self.suffix.len());
        data_bytes.extend_from_slice(&self.prefix);
        data_bytes.extend(serialize(&nonce)?);
        data_bytes.extend_from_slice(&self.suffix);
        Ok(data_bytes)
    }

    pub fn is_valid(&self, nonce: u64) -> Result<bool> {
        let hash = sha256_digest(&self.prepare_data(nonce)?);
        Ok(meets_difficulty(&hash, self.difficulty))
    }

    /// Counts nonces up from 0 with no upper bound. Returns `None` only when
    /// `cancel` fires before a valid nonce is found.
    pub fn run(&self, cancel: &CancellationToken) -> Result<Option<u64>> {
        let mut nonce: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                debug!("Proof-of-work cancelled at nonce {nonce}");
                return Ok(None);
            }
            if self.is_valid(nonce)? {
                return Ok(Some(nonce));
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

/// True iff the hex form of `hash` starts with `difficulty` '0' characters.
pub fn meets_difficulty(hash: &[u8; 32], difficulty: usize) -> bool {
    if difficulty > MAX_DIFFICULTY {
        return false;
    }
    HEXLOWER
        .encode(hash)
        .bytes()
        .take(difficulty)
        .all(|c| c == b'0')
}

/// Builds the zero-timestamp candidate block and checks its hash.
pub fn valid_proof(
    nonce: u64,
    previous_hash: &[u8; 32],
    transactions: &[Transaction],
    difficulty: usize,
) -> bool {
    let guess_block = Block::new(
        PROOF_TIMESTAMP,
        nonce,
        *previous_hash,
        transactions.to_vec(),
    );
    match guess_block.hash() {
        Ok(hash) => meets_difficulty(&hash, difficulty),
        Err(e) => {
            error!("Failed to hash candidate block: {e}");
            false
        }
    }
}

/// Re-checks the proof carried by a sealed block.
pub fn validate(block: &Block, difficulty: usize) -> bool {
    valid_proof(
        block.get_nonce(),
        block.get_previous_hash(),
        block.get_transactions(),
        difficulty,
    )
}
