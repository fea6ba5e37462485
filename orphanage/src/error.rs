use thiserror::Error;

use crate::id::{OutPoint, Txid, Wtxid};

/// A violation of one of the orphanage's cross-index invariants (§3 of the
/// design doc). This is a read-only diagnostic surfaced by
/// `Orphanage::check_invariants` for property tests and fuzz harnesses; the
/// mutating paths never return it. A corruption detected *during* a mutation
/// is instead a programming error and aborts the process via `assert!`,
/// since at that point the indices are already inconsistent and continuing
/// would only mask the bug (see §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("entry for txid {key} is stored under mismatched key {actual}")]
    PrimaryKeyMismatch { key: Txid, actual: Txid },

    #[error("list position {recorded} recorded on txid {txid} does not match its actual offset {actual}")]
    ListPositionMismatch { txid: Txid, recorded: usize, actual: usize },

    #[error("witness index entry {wtxid} points at txid {txid}, which is absent from the primary map")]
    WitnessIndexDangling { wtxid: Wtxid, txid: Txid },

    #[error("orphan {txid} has wtxid {expected}, but is not reachable from the witness index under that key")]
    WitnessIndexMissing { txid: Txid, expected: Wtxid },

    #[error("prevout index has an empty bucket at {outpoint:?}")]
    EmptyPrevoutBucket { outpoint: OutPoint },

    #[error("orphan {txid} spends {outpoint:?} but is absent from that prevout bucket")]
    PrevoutIndexMissing { txid: Txid, outpoint: OutPoint },

    #[error("orphan {txid} weighs {weight}, exceeding the standard cap of {max}")]
    WeightExceedsCap { txid: Txid, weight: u64, max: u64 },
}
