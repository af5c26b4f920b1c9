//! Helpers shared by the unit tests: throwaway ledgers, wallets and signed
//! transfers.

pub mod test_utils;

pub use test_utils::*;
