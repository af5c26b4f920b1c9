use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sealed block. There are no setters: once built, every field is fixed and
/// the hash is recomputed from the fields whenever it is needed.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    timestamp: i64,
    nonce: u64,
    #[serde(with = "hex_hash")]
    previous_hash: [u8; 32],
    transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        timestamp: i64,
        nonce: u64,
        previous_hash: [u8; 32],
        transactions: Vec<Transaction>,
    ) -> Block {
        Block {
            timestamp,
            nonce,
            previous_hash,
            transactions,
        }
    }

    /// The all-zero block whose hash anchors the genesis block.
    pub fn empty() -> Block {
        Block::new(0, 0, [0u8; 32], vec![])
    }

    pub fn generate_genesis_block(timestamp: i64) -> Result<Block> {
        let anchor = Block::empty().hash()?;
        Ok(Block::new(timestamp, 0, anchor, vec![]))
    }

    pub fn hash(&self) -> Result<[u8; 32]> {
        Ok(sha256_digest(&serialize(self)?))
    }

    pub fn hash_hex(&self) -> Result<String> {
        Ok(HEXLOWER.encode(&self.hash()?))
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &[u8; 32] {
        &self.previous_hash
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp        {}", self.timestamp)?;
        writeln!(f, "nonce            {}", self.nonce)?;
        write!(
            f,
            "previous_hash    {}",
            HEXLOWER.encode(&self.previous_hash)
        )?;
        for transaction in &self.transactions {
            write!(f, "\n{transaction}")?;
        }
        Ok(())
    }
}

// previous_hash travels as lowercase hex in the transport form
mod hex_hash {
    use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&HEXLOWER.encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = HEXLOWER_PERMISSIVE
            .decode(text.as_bytes())
            .map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("previous_hash must be 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_pure_function_of_fields() {
        let txs = vec![Transaction::new("a", "b", 1)];
        let first = Block::new(10, 5, [7u8; 32], txs.clone());
        let second = Block::new(10, 5, [7u8; 32], txs);
        assert_eq!(first.hash().unwrap(), second.hash().unwrap());

        assert_ne!(
            first.hash().unwrap(),
            Block::new(11, 5, [7u8; 32], vec![]).hash().unwrap()
        );
        assert_ne!(
            first.hash().unwrap(),
            Block::new(10, 6, [7u8; 32], first.get_transactions().to_vec())
                .hash()
                .unwrap()
        );
    }

    #[test]
    fn test_genesis_links_to_empty_block() {
        let genesis = Block::generate_genesis_block(1_700_000_000_000).unwrap();
        assert_eq!(
            genesis.get_previous_hash(),
            &Block::empty().hash().unwrap()
        );
        assert_eq!(genesis.get_nonce(), 0);
        assert!(genesis.get_transactions().is_empty());
    }

    #[test]
    fn test_transport_form() {
        let block = Block::new(42, 9, [0xab; 32], vec![Transaction::new("a", "b", 3)]);
        let json = serde_json::to_value(&block).unwrap();

        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["nonce"], 9);
        assert_eq!(json["previous_hash"], "ab".repeat(32));
        assert_eq!(json["transactions"][0]["value"], 3);

        // Hash is derivable from the transport form
        let decoded: Block = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.hash().unwrap(), block.hash().unwrap());
    }

    #[test]
    fn test_transport_rejects_short_hash() {
        let json = serde_json::json!({
            "timestamp": 1,
            "nonce": 0,
            "previous_hash": "abcd",
            "transactions": []
        });
        assert!(serde_json::from_value::<Block>(json).is_err());
    }

    #[test]
    fn test_hash_hex_length() {
        assert_eq!(Block::empty().hash_hex().unwrap().len(), 64);
    }
}
