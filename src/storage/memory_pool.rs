use crate::core::Transaction;

/// Pending transactions in arrival order.
///
/// The pool has no lock of its own: it lives inside the ledger state and is
/// only touched while the ledger's lock is held.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    inner: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool { inner: vec![] }
    }

    pub fn add(&mut self, tx: Transaction) {
        self.inner.push(tx);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get_all(&self) -> Vec<Transaction> {
        self.inner.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.inner.iter()
    }

    /// Drops everything admitted after the first `len` transactions.
    pub fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Empties the pool, handing back its contents in order.
    pub fn take_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_arrival_order() {
        let mut pool = MemoryPool::new();
        pool.add(Transaction::new("a", "b", 1));
        pool.add(Transaction::new("c", "d", 2));
        pool.add(Transaction::new("e", "f", 3));

        let values: Vec<u64> = pool.iter().map(|tx| tx.get_value()).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_take_all_empties_pool() {
        let mut pool = MemoryPool::new();
        pool.add(Transaction::new("a", "b", 1));
        let taken = pool.take_all();
        assert_eq!(taken.len(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_truncate_keeps_oldest() {
        let mut pool = MemoryPool::new();
        pool.add(Transaction::new("a", "b", 1));
        pool.add(Transaction::new("a", "b", 2));
        pool.truncate(1);
        assert_eq!(pool.get_all(), vec![Transaction::new("a", "b", 1)]);
        pool.truncate(5);
        assert_eq!(pool.len(), 1);
    }
}
