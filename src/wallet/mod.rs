//! Wallets and addresses
//!
//! This module handles key ownership, the address derivation pipeline and
//! transaction signing.

pub mod address;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use address::{
    address_from_public_key, convert_address, decode_address, hash_pub_key, validate_address,
    ADDRESS_CHECK_SUM_LEN, ADDRESS_PAYLOAD_LEN,
};
pub use wallet::Wallet;
