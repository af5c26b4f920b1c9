// This file implements the transfer value that moves coins between addresses
// A transaction never carries its signature - the signature travels next to it
// at admission time and is checked against the canonical digest below

use crate::core::{MINING_REWARD, MINING_SENDER};
use crate::error::Result;
use crate::utils::{serialize, sha256_digest, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    #[serde(rename = "sender_blockchain_address")]
    sender: String,
    #[serde(rename = "recipient_blockchain_address")]
    recipient: String,
    #[serde(with = "coin_value")]
    value: u64, // base units, see core::monetary
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, value: u64) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            value,
        }
    }

    // The reward the ledger mints for itself on every mining run
    pub(crate) fn new_reward(recipient: &str) -> Transaction {
        Self::new(MINING_SENDER, recipient, MINING_REWARD)
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn is_reward(&self) -> bool {
        self.sender == MINING_SENDER
    }

    /// Byte-exact encoding of the three public fields.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// SHA-256 of the canonical encoding; this is what wallets sign.
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, " sender_blockchain_address      {}", self.sender)?;
        writeln!(f, " recipient_blockchain_address   {}", self.recipient)?;
        write!(
            f,
            " value                          {:.8}",
            crate::core::monetary::units_to_coins(self.value as i128)
        )
    }
}

// value travels in coins on the wire, the same unit wallets post it in
mod coin_value {
    use crate::core::monetary::{coins_to_units, units_to_coins};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(units: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(units_to_coins(*units as i128))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let coins = f64::deserialize(deserializer)?;
        coins_to_units(coins).map_err(D::Error::custom)
    }
}

/// Where a transaction entering the pool came from.
///
/// Only the ledger can construct `SystemMinted`; every external submission is
/// `Authored` and goes through signature verification.
#[derive(Debug, Clone)]
pub(crate) enum TransactionOrigin {
    Authored {
        public_key: PublicKey,
        signature: Signature,
    },
    SystemMinted,
}

/// A transaction together with the material needed to admit it.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub public_key: PublicKey,
    pub signature: Signature,
}
