//! Utility functions and helpers
//!
//! This module contains the cryptographic primitives, encoding functions,
//! and the canonical byte encoding used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, current_timestamp, hex_decode, ripemd160_digest,
    sha256_digest, verify, KeyPair, PublicKey, Signature,
};

pub use serialization::serialize;
