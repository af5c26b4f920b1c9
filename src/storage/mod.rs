//! In-memory storage
//!
//! This module holds the pending-transaction pool. Blocks live in the
//! ledger itself; nothing is persisted to disk.

pub mod memory_pool;

pub use memory_pool::MemoryPool;
