use crate::id::PeerId;
use crate::tx::TxRef;

/// One stored orphan. Created by `add_tx`, never mutated afterwards except
/// for `list_pos` bookkeeping on swap-removal of some other entry, and
/// destroyed by exactly one of the erasure paths.
#[derive(Debug)]
pub(crate) struct OrphanEntry {
    pub(crate) tx: TxRef,
    pub(crate) from_peer: PeerId,
    /// Absolute time at which this entry becomes eligible for expiry.
    pub(crate) expire_at: u64,
    /// This entry's current offset in the dense list index, i.e. its
    /// position in `Inner::orphans` at this moment. Kept in sync on every
    /// swap-removal so eviction can address the list by position in O(1).
    pub(crate) list_pos: usize,
}
