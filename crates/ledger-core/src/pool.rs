use crate::Transaction;

/// Transactions waiting to be included in a mined block, in arrival order.
/// No balance, signature or duplicate checks are made.
#[derive(Clone, Debug, Default)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending transaction and reseed the pool with a single
    /// reward to `address`. Returns what was drained.
    pub fn drain_and_reward(&mut self, address: &str, reward: u64) -> Vec<Transaction> {
        self.drain_mined_and_reward(self.pending.len(), address, reward)
    }

    /// Drop the first `mined` transactions (the ones sealed into a block) and
    /// put the reward to `address` in front of anything that arrived later.
    pub fn drain_mined_and_reward(
        &mut self,
        mined: usize,
        address: &str,
        reward: u64,
    ) -> Vec<Transaction> {
        let mined = mined.min(self.pending.len());
        let late = self.pending.split_off(mined);
        let drained = std::mem::take(&mut self.pending);
        self.pending.push(Transaction::reward(address, reward));
        self.pending.extend(late);
        drained
    }

    /// Net effect of the pending transactions on `address`.
    pub fn pending_delta_for(&self, address: &str) -> i128 {
        self.pending.iter().map(|tx| tx.delta_for(address)).sum()
    }
}
