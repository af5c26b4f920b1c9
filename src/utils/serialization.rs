// Canonical byte encoding used for hashing and signing.
// Field order is fixed by the struct definition, integers are varint encoded
// by the standard config, so equal values always produce equal bytes.
use crate::error::{BlockchainError, Result};

/// Encode a value into its canonical bytes (bincode 2.0, standard configuration)
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}
