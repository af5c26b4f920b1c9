use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair as _, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BlockchainError, Result};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of an uncompressed SEC1 P-256 point: 0x04 || X || Y
pub const PUBLIC_KEY_LEN: usize = 65;
/// Length of one curve coordinate or one signature component
pub const SCALAR_LEN: usize = 32;

const UNCOMPRESSED_TAG: u8 = 0x04;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u128 {
        return Err(BlockchainError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());
    out
}

pub fn ripemd160_digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(hasher.finalize().as_slice());
    out
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BlockchainError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

pub fn hex_decode(data: &str) -> Result<Vec<u8>> {
    HEXLOWER_PERMISSIVE
        .decode(data.as_bytes())
        .map_err(|e| BlockchainError::Crypto(format!("Invalid hex encoding: {e}")))
}

/// P-256 public key kept in uncompressed SEC1 form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != UNCOMPRESSED_TAG {
            return Err(BlockchainError::Crypto(format!(
                "Public key must be a {PUBLIC_KEY_LEN}-byte uncompressed point"
            )));
        }
        Ok(PublicKey {
            bytes: bytes.to_vec(),
        })
    }

    /// Parses the `X || Y` hex form (128 characters) used on the wire.
    pub fn from_hex(data: &str) -> Result<PublicKey> {
        let coordinates = hex_decode(data)?;
        if coordinates.len() != 2 * SCALAR_LEN {
            return Err(BlockchainError::Crypto(format!(
                "Public key hex must encode {} bytes, got {}",
                2 * SCALAR_LEN,
                coordinates.len()
            )));
        }
        let mut bytes = Vec::with_capacity(PUBLIC_KEY_LEN);
        bytes.push(UNCOMPRESSED_TAG);
        bytes.extend_from_slice(&coordinates);
        Ok(PublicKey { bytes })
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.bytes[1..])
    }

    pub fn x(&self) -> &[u8] {
        &self.bytes[1..1 + SCALAR_LEN]
    }

    pub fn y(&self) -> &[u8] {
        &self.bytes[1 + SCALAR_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Serde goes through the hex form so a decoded key is always a full point
impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PublicKey::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// ECDSA signature as its `(r, s)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: [u8; SCALAR_LEN],
    s: [u8; SCALAR_LEN],
}

impl Signature {
    pub fn new(r: [u8; SCALAR_LEN], s: [u8; SCALAR_LEN]) -> Signature {
        Signature { r, s }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Signature> {
        if bytes.len() != 2 * SCALAR_LEN {
            return Err(BlockchainError::Crypto(format!(
                "Signature must be {} bytes, got {}",
                2 * SCALAR_LEN,
                bytes.len()
            )));
        }
        let mut r = [0u8; SCALAR_LEN];
        let mut s = [0u8; SCALAR_LEN];
        r.copy_from_slice(&bytes[..SCALAR_LEN]);
        s.copy_from_slice(&bytes[SCALAR_LEN..]);
        Ok(Signature { r, s })
    }

    pub fn from_hex(data: &str) -> Result<Signature> {
        Self::from_bytes(&hex_decode(data)?)
    }

    pub fn to_bytes(&self) -> [u8; 2 * SCALAR_LEN] {
        let mut out = [0u8; 2 * SCALAR_LEN];
        out[..SCALAR_LEN].copy_from_slice(&self.r);
        out[SCALAR_LEN..].copy_from_slice(&self.s);
        out
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.to_bytes())
    }

}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Private key document (PKCS#8) plus the public point derived from it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    pkcs8: Vec<u8>,
    #[zeroize(skip)]
    public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let rng = SystemRandom::new();
        let document = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|e| {
                BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}"))
            })?;
        Self::from_pkcs8(document.as_ref())
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<KeyPair> {
        let key_pair = Self::load(pkcs8)?;
        let public_key = PublicKey::from_bytes(key_pair.public_key().as_ref())?;
        Ok(KeyPair {
            pkcs8: pkcs8.to_vec(),
            public_key,
        })
    }

    fn load(pkcs8: &[u8]) -> Result<EcdsaKeyPair> {
        let rng = SystemRandom::new();
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng).map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })
    }

    /// Signs `message_digest`; the curve operation hashes it once more with SHA-256.
    pub fn sign(&self, message_digest: &[u8]) -> Result<Signature> {
        let rng = SystemRandom::new();
        let key_pair = Self::load(&self.pkcs8)?;
        let signature = key_pair
            .sign(&rng, message_digest)
            .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?;
        Signature::from_bytes(signature.as_ref())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key.to_hex())
            .finish_non_exhaustive()
    }
}

/// Returns false for any malformed key or signature instead of failing.
pub fn verify(public_key: &PublicKey, message_digest: &[u8], signature: &Signature) -> bool {
    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, public_key.as_bytes());
    peer_public_key
        .verify(message_digest, &signature.to_bytes())
        .is_ok()
}
