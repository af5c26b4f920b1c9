// Address derivation: public key -> SHA-256 -> RIPEMD-160 -> version byte ->
// double SHA-256 checksum -> base58. Every stage has a fixed output length.

use crate::error::{BlockchainError, Result};
use crate::utils::{base58_decode, base58_encode, ripemd160_digest, sha256_digest, PublicKey};

pub const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
pub const PUB_KEY_HASH_LEN: usize = 20;
/// version + pub_key_hash + checksum
pub const ADDRESS_PAYLOAD_LEN: usize = 1 + PUB_KEY_HASH_LEN + ADDRESS_CHECK_SUM_LEN;

/// SHA-256 over the big-endian `X || Y` coordinates, then RIPEMD-160.
pub fn hash_pub_key(public_key: &PublicKey) -> [u8; PUB_KEY_HASH_LEN] {
    let mut coordinates = Vec::with_capacity(64);
    coordinates.extend_from_slice(public_key.x());
    coordinates.extend_from_slice(public_key.y());
    let pub_key_sha256 = sha256_digest(&coordinates);
    ripemd160_digest(&pub_key_sha256)
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECK_SUM_LEN] {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(&first_sha);
    let mut out = [0u8; ADDRESS_CHECK_SUM_LEN];
    out.copy_from_slice(&second_sha[..ADDRESS_CHECK_SUM_LEN]);
    out
}

pub fn address_from_public_key(public_key: &PublicKey) -> String {
    convert_address(&hash_pub_key(public_key))
}

pub fn convert_address(pub_key_hash: &[u8; PUB_KEY_HASH_LEN]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
    payload.push(VERSION);
    payload.extend_from_slice(pub_key_hash);
    let checksum = checksum(&payload);
    payload.extend_from_slice(&checksum);
    base58_encode(&payload)
}

/// Decodes an address back to its public key hash, checking length, version and checksum.
pub fn decode_address(address: &str) -> Result<[u8; PUB_KEY_HASH_LEN]> {
    let payload = base58_decode(address)?;
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: expected {ADDRESS_PAYLOAD_LEN} bytes, got {}",
            payload.len()
        )));
    }

    let (body, actual_checksum) = payload.split_at(1 + PUB_KEY_HASH_LEN);
    if body[0] != VERSION {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: unknown version byte {:#04x}",
            body[0]
        )));
    }
    if checksum(body).as_slice() != actual_checksum {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: checksum mismatch"
        )));
    }

    let mut pub_key_hash = [0u8; PUB_KEY_HASH_LEN];
    pub_key_hash.copy_from_slice(&body[1..]);
    Ok(pub_key_hash)
}

pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::KeyPair;

    #[test]
    fn test_address_is_deterministic() {
        let key_pair = KeyPair::generate().unwrap();
        let first = address_from_public_key(key_pair.public_key());
        let second = address_from_public_key(key_pair.public_key());
        assert_eq!(first, second);
    }

    #[test]
    fn test_address_checksum_validates_on_decode() {
        let key_pair = KeyPair::generate().unwrap();
        let address = address_from_public_key(key_pair.public_key());

        assert!(validate_address(&address));
        assert_eq!(
            decode_address(&address).unwrap(),
            hash_pub_key(key_pair.public_key())
        );
        assert_eq!(base58_decode(&address).unwrap().len(), ADDRESS_PAYLOAD_LEN);
        // Version byte 0x00 encodes as a leading '1'
        assert!(address.starts_with('1'));
    }

    #[test]
    fn test_known_bitcoin_address_validates() {
        // Genesis coinbase address uses the same version + checksum scheme
        assert!(validate_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
    }

    #[test]
    fn test_corrupted_address_fails() {
        let key_pair = KeyPair::generate().unwrap();
        let address = address_from_public_key(key_pair.public_key());

        let mut payload = base58_decode(&address).unwrap();
        payload[5] ^= 0x01;
        let corrupted = base58_encode(&payload);
        assert!(!validate_address(&corrupted));

        assert!(!validate_address("not-base58-0OIl"));
        assert!(!validate_address(""));
        assert!(!validate_address("1111"));
    }

    #[test]
    fn test_different_keys_give_different_addresses() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(
            address_from_public_key(a.public_key()),
            address_from_public_key(b.public_key())
        );
    }
}
