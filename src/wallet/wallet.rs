use crate::core::{SignedTransaction, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{hex_decode, KeyPair, PublicKey, Signature};
use crate::wallet::address_from_public_key;
use data_encoding::HEXLOWER;

/// A keypair and the address derived from it. Never written to disk.
#[derive(Clone, Debug)]
pub struct Wallet {
    key_pair: KeyPair,
    address: String,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        Ok(Self::from_key_pair(KeyPair::generate()?))
    }

    pub fn from_key_pair(key_pair: KeyPair) -> Wallet {
        let address = address_from_public_key(key_pair.public_key());
        Wallet { key_pair, address }
    }

    /// Restores a wallet from the hex PKCS#8 document printed by `createwallet`.
    pub fn from_private_key_hex(private_key: &str) -> Result<Wallet> {
        let pkcs8 = hex_decode(private_key)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key: {e}")))?;
        let key_pair = KeyPair::from_pkcs8(&pkcs8)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key: {e}")))?;
        Ok(Self::from_key_pair(key_pair))
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key_pair.public_key()
    }

    pub fn private_key_hex(&self) -> String {
        HEXLOWER.encode(self.key_pair.pkcs8())
    }

    /// Signs the canonical digest of `transaction`.
    pub fn sign_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let digest = transaction.digest()?;
        self.key_pair.sign(&digest)
    }

    /// Builds a transfer from this wallet and signs it.
    pub fn create_transaction(&self, recipient: &str, value: u64) -> Result<SignedTransaction> {
        let transaction = Transaction::new(&self.address, recipient, value);
        let signature = self.sign_transaction(&transaction)?;
        Ok(SignedTransaction {
            transaction,
            public_key: self.public_key().clone(),
            signature,
        })
    }
}
