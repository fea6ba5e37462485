use std::sync::Arc;

use crate::id::{OutPoint, Txid, Wtxid};

/// The orphanage treats a transaction as an opaque, reference-counted,
/// immutable object. It never parses, validates, or mutates one — it only
/// asks it for its identity, its resource cost, and the outputs it spends.
///
/// Callers type-erase their own mempool transaction type behind `TxRef`
/// rather than the orphanage being generic over it, since the orphanage is
/// meant to be handed whatever transaction type the embedding node already
/// has, with no knowledge of that type's internals.
pub trait Transaction: std::fmt::Debug {
    fn txid(&self) -> Txid;
    fn wtxid(&self) -> Wtxid;

    /// Weight units, per the network's resource-accounting rules. The
    /// orphanage only compares this to `MAX_STANDARD_TX_WEIGHT`; it does not
    /// interpret it further.
    fn weight(&self) -> u64;

    /// Previous outputs this transaction spends, in input order. A
    /// transaction spending the same outpoint twice would be non-standard;
    /// the orphanage deduplicates such entries via set semantics in the
    /// prevout index rather than rejecting the transaction itself.
    fn inputs(&self) -> &[OutPoint];

    fn output_count(&self) -> u32;
}

/// Shared, immutable handle to a transaction. Cloning is cheap (`Arc` bump);
/// the orphanage holds one of these per stored orphan and releases it on
/// erase. Handles returned from queries may outlive the orphan's presence in
/// the pool, since the underlying object is reference-counted independently
/// of any single index.
pub type TxRef = Arc<dyn Transaction + Send + Sync>;

/// A connected block, as needed by `EraseForBlock`: just the ordered list of
/// transactions it confirms.
pub trait Block {
    fn transactions(&self) -> &[TxRef];
}
