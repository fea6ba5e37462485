//! An in-memory pool of orphan transactions for a relay node.
//!
//! A relay node sometimes receives a transaction before it has seen one of
//! the transactions it spends from — over P2P, parents and children can
//! arrive out of order, or never arrive at all. Rather than drop such a
//! transaction, a node can hold it here until either its missing parent
//! shows up (at which point it's handed back for reconsideration) or it
//! overstays its welcome (at which point it's expired or evicted to bound
//! memory use).
//!
//! [`Orphanage`] is the crate's single entry point: a thread-safe pool keyed
//! by [`Txid`], indexed by [`Wtxid`] and by the outpoints it spends, bucketed
//! by the peer that relayed it. See that type's docs for the full operation
//! list.
//!
//! The pool is deliberately ignorant of transaction internals: it talks to
//! the rest of a node only through the [`Transaction`] and [`Block`] traits,
//! so it can sit in front of whatever concrete transaction type the
//! embedding node already has.

mod clock;
mod config;
mod entry;
mod error;
mod id;
mod orphanage;
mod rng;
mod tx;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use config::{OrphanageConfig, MAX_STANDARD_TX_WEIGHT, ORPHAN_TX_EXPIRE_INTERVAL_SECS, ORPHAN_TX_EXPIRE_TIME_SECS};
pub use error::InvariantError;
pub use id::{GenTxid, OutPoint, PeerId, Txid, Wtxid};
pub use orphanage::Orphanage;
pub use rng::{OrphanRng, ThreadRandom};
pub use tx::{Block, Transaction, TxRef};
