/// Monetary constants and conversions for the ledger
///
/// Amounts are stored as whole base units so that hashing, signing and
/// balance replay are exact. One coin is 100,000,000 units (like satoshis).
///
/// ## Mining
/// - **Reward**: 1 coin per mined block, minted by the mining authority
/// - **Authority**: the reserved sender identifier `THE BLOCKCHAIN`
use crate::error::{BlockchainError, Result};

/// Number of base units in one coin
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Reward paid to the ledger's own address for every mined block (1 coin)
pub const MINING_REWARD: u64 = UNITS_PER_COIN;

/// Reserved sender identifier of reward transactions
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Convert a decimal coin amount to base units
///
/// # Examples
/// ```
/// use pow_ledger::core::monetary::coins_to_units;
/// assert_eq!(coins_to_units(2.5).unwrap(), 250_000_000);
/// assert!(coins_to_units(-1.0).is_err());
/// ```
pub fn coins_to_units(coins: f64) -> Result<u64> {
    if !coins.is_finite() || coins < 0.0 {
        return Err(BlockchainError::Transaction(format!(
            "Amount must be a non-negative number, got {coins}"
        )));
    }
    let units = (coins * UNITS_PER_COIN as f64).round();
    if units >= u64::MAX as f64 {
        return Err(BlockchainError::Transaction(format!(
            "Amount too large: {coins}"
        )));
    }
    Ok(units as u64)
}

/// Convert a (possibly negative) balance in base units to coins
///
/// # Examples
/// ```
/// use pow_ledger::core::monetary::units_to_coins;
/// assert_eq!(units_to_coins(100_000_000), 1.0);
/// assert_eq!(units_to_coins(-50_000_000), -0.5);
/// ```
pub fn units_to_coins(units: i128) -> f64 {
    units as f64 / UNITS_PER_COIN as f64
}
