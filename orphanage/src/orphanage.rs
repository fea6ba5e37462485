use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::OrphanageConfig;
use crate::entry::OrphanEntry;
use crate::error::InvariantError;
use crate::id::{GenTxid, OutPoint, PeerId, Txid};
use crate::rng::OrphanRng;
use crate::tx::{Block, Transaction, TxRef};

/// All mutable state, behind one mutex. `orphans` plays a double role: it is
/// both the primary `Txid -> OrphanEntry` map *and* the dense, swap-removable
/// list used for O(1) uniform-random eviction (`IndexMap` gives both for
/// free, see §10.1 of the design doc), so there is no separate list field —
/// `|primary| == |list|` holds by construction rather than by a maintained
/// invariant.
struct Inner {
    orphans: IndexMap<Txid, OrphanEntry>,
    wtxid_index: HashMap<crate::id::Wtxid, Txid>,
    prevout_index: HashMap<OutPoint, HashSet<Txid>>,
    work_sets: HashMap<PeerId, BTreeSet<Txid>>,
    /// Gates the amortized expiration scan; see `limit_orphans`.
    next_sweep: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            orphans: IndexMap::new(),
            wtxid_index: HashMap::new(),
            prevout_index: HashMap::new(),
            work_sets: HashMap::new(),
            next_sweep: 0,
        }
    }
}

/// Removes `txid` from every index, restoring all invariants. Returns `1` if
/// an entry was removed, `0` if `txid` was already absent. Internal helper
/// assumed to run with `inner`'s mutex already held by the caller.
fn erase_tx_locked(inner: &mut Inner, txid: &Txid) -> usize {
    let (list_pos, tx) = match inner.orphans.get(txid) {
        Some(entry) => (entry.list_pos, entry.tx.clone()),
        None => return 0,
    };
    assert_eq!(inner.orphans.get_index_of(txid), Some(list_pos), "orphanage list position desynced from its entry");

    for outpoint in tx.inputs() {
        if let Some(bucket) = inner.prevout_index.get_mut(outpoint) {
            bucket.remove(txid);
            if bucket.is_empty() {
                inner.prevout_index.remove(outpoint);
            }
        }
    }
    inner.wtxid_index.remove(&tx.wtxid());

    let (removed_txid, _) =
        inner.orphans.swap_remove_index(list_pos).expect("list_pos was just confirmed valid under the held lock");
    assert_eq!(&removed_txid, txid, "swap-removed the wrong orphanage entry");
    // The former last entry (if any) now occupies `list_pos`; patch its
    // back-pointer so the next lookup of its own txid finds it there.
    if let Some((_, moved_entry)) = inner.orphans.get_index_mut(list_pos) {
        moved_entry.list_pos = list_pos;
    }

    log::trace!(target: "tx_orphanage", "removed orphan tx {txid} (wtxid={})", tx.wtxid());
    1
}

/// An in-memory, thread-safe pool of orphan transactions: transactions a
/// relay node has received but cannot yet process because one or more of
/// their inputs spend outputs the node doesn't know about yet. See the
/// crate-level docs for the full model.
pub struct Orphanage<C: Clock = crate::clock::SystemClock> {
    config: OrphanageConfig,
    clock: C,
    inner: Mutex<Inner>,
}

impl Orphanage<crate::clock::SystemClock> {
    /// Builds an orphanage with the default config (the network's standard
    /// weight cap and expiration timers) and the system wall clock.
    pub fn new() -> Self {
        Self::with_config(OrphanageConfig::default(), crate::clock::SystemClock)
    }
}

impl Default for Orphanage<crate::clock::SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Orphanage<C> {
    pub fn with_config(config: OrphanageConfig, clock: C) -> Self {
        Self { config, clock, inner: Mutex::new(Inner::new()) }
    }

    pub fn config(&self) -> &OrphanageConfig {
        &self.config
    }

    /// Access to the underlying clock, for tests that need to advance a
    /// [`crate::clock::FakeClock`] wired into a pool under test.
    #[cfg(feature = "test-support")]
    pub fn clock_ref(&self) -> &C {
        &self.clock
    }

    /// Attempts to add `tx`, received from `peer`, to the pool. Returns
    /// `false` without any side effect if `tx` is already stored or exceeds
    /// the configured standard-weight cap. Does not check whether `tx`'s
    /// inputs are actually missing — that's the caller's decision to make
    /// before calling this.
    pub fn add_tx(&self, tx: TxRef, peer: PeerId) -> bool {
        let mut inner = self.inner.lock();
        let txid = tx.txid();
        if inner.orphans.contains_key(&txid) {
            return false;
        }
        let weight = tx.weight();
        if weight > self.config.max_standard_tx_weight {
            log::debug!(target: "tx_orphanage", "ignoring large orphan tx (weight={weight}, txid={txid})");
            return false;
        }

        let list_pos = inner.orphans.len();
        let wtxid = tx.wtxid();
        for outpoint in tx.inputs() {
            inner.prevout_index.entry(*outpoint).or_default().insert(txid);
        }
        inner.wtxid_index.insert(wtxid, txid);
        let expire_at = self.clock.now_secs() + self.config.expire_time_secs;
        inner.orphans.insert(txid, OrphanEntry { tx, from_peer: peer, expire_at, list_pos });

        log::debug!(
            target: "tx_orphanage",
            "stored orphan tx {txid} (wtxid={wtxid}) (pool size {}, prevout buckets {})",
            inner.orphans.len(),
            inner.prevout_index.len(),
        );
        true
    }

    /// Removes `txid` if present. Returns `1` if it was removed, `0` if it
    /// wasn't there.
    pub fn erase_tx(&self, txid: &Txid) -> usize {
        let mut inner = self.inner.lock();
        erase_tx_locked(&mut inner, txid)
    }

    /// Drops `peer`'s work set and every orphan it sent.
    pub fn erase_for_peer(&self, peer: PeerId) {
        let mut inner = self.inner.lock();
        inner.work_sets.remove(&peer);

        let victims: Vec<Txid> = inner.orphans.iter().filter(|(_, e)| e.from_peer == peer).map(|(txid, _)| *txid).collect();
        let mut erased = 0usize;
        for txid in victims {
            erased += erase_tx_locked(&mut inner, &txid);
        }
        if erased > 0 {
            log::debug!(target: "tx_orphanage", "erased {erased} orphan tx from peer={peer}");
        }
    }

    /// Removes every orphan that spends an input also spent by a
    /// transaction in `block` — whether because that parent just confirmed
    /// or because the orphan double-spends something the block already
    /// settled. The two cases are not distinguished; both are safe to drop.
    pub fn erase_for_block(&self, block: &dyn Block) {
        let mut inner = self.inner.lock();
        let mut victims = Vec::new();
        for tx in block.transactions() {
            for outpoint in tx.inputs() {
                if let Some(bucket) = inner.prevout_index.get(outpoint) {
                    victims.extend(bucket.iter().copied());
                }
            }
        }
        if victims.is_empty() {
            return;
        }
        let mut erased = 0usize;
        for txid in victims {
            erased += erase_tx_locked(&mut inner, &txid);
        }
        if erased > 0 {
            log::debug!(target: "tx_orphanage", "erased {erased} orphan tx included or conflicted by block");
        }
    }

    /// Expires entries past their deadline (amortized: only scans when the
    /// process-wide sweep timer has elapsed) and then evicts uniformly at
    /// random until at most `max_orphans` remain.
    pub fn limit_orphans(&self, max_orphans: usize, rng: &mut dyn OrphanRng) {
        let mut inner = self.inner.lock();
        let now = self.clock.now_secs();

        if inner.next_sweep <= now {
            let mut expired = Vec::new();
            let mut min_expire_at = now + self.config.expire_time_secs - self.config.expire_interval_secs;
            for (txid, entry) in inner.orphans.iter() {
                if entry.expire_at <= now {
                    expired.push(*txid);
                } else {
                    min_expire_at = min_expire_at.min(entry.expire_at);
                }
            }

            let mut erased = 0usize;
            for txid in expired {
                erased += erase_tx_locked(&mut inner, &txid);
            }
            // Sweep again shortly after the next entry expires, batching the
            // linear scan to once per `expire_interval_secs` window.
            inner.next_sweep = min_expire_at + self.config.expire_interval_secs;
            if erased > 0 {
                log::debug!(target: "tx_orphanage", "erased {erased} orphan tx due to expiration");
            }
        }

        let mut evicted = 0usize;
        while inner.orphans.len() > max_orphans {
            let victim_idx = rng.uniform(inner.orphans.len());
            let victim_txid = *inner.orphans.get_index(victim_idx).expect("index is within bounds").0;
            evicted += erase_tx_locked(&mut inner, &victim_txid);
        }
        if evicted > 0 {
            log::debug!(target: "tx_orphanage", "orphanage overflow, removed {evicted} tx");
        }
    }

    /// Moves every orphan that spends one of `tx`'s outputs into its
    /// originating peer's work set, so that peer's connection gets a chance
    /// to have the orphan reconsidered now that `tx` is known.
    pub fn add_children_to_work_set(&self, tx: &dyn Transaction) {
        let mut inner = self.inner.lock();
        let parent_txid = tx.txid();
        for vout in 0..tx.output_count() {
            let outpoint = OutPoint::new(parent_txid, vout);
            let Some(bucket) = inner.prevout_index.get(&outpoint) else { continue };
            let orphan_txids: Vec<Txid> = bucket.iter().copied().collect();
            for orphan_txid in orphan_txids {
                let Some(entry) = inner.orphans.get(&orphan_txid) else { continue };
                let from_peer = entry.from_peer;
                let wtxid = entry.tx.wtxid();
                inner.work_sets.entry(from_peer).or_default().insert(orphan_txid);
                log::trace!(
                    target: "tx_orphanage",
                    "added {parent_txid} (wtxid={wtxid}) to peer {from_peer} workset",
                );
            }
        }
    }

    /// Pops entries from `peer`'s work set until one still points at a live
    /// orphan, returning it, or the set drains with nothing left, returning
    /// `None`. The returned orphan is *not* removed from the pool — the
    /// caller re-validates it and decides what to do next.
    pub fn get_tx_to_reconsider(&self, peer: PeerId) -> Option<TxRef> {
        let mut inner = self.inner.lock();
        loop {
            let work_set = inner.work_sets.get_mut(&peer)?;
            let Some(&txid) = work_set.iter().next() else { return None };
            work_set.remove(&txid);
            if let Some(entry) = inner.orphans.get(&txid) {
                return Some(entry.tx.clone());
            }
        }
    }

    /// True iff `peer` has a non-empty work set. May report `true` even when
    /// every id left in it is stale (already erased) — `get_tx_to_reconsider`
    /// returning `None` is the authoritative "nothing left" signal.
    pub fn have_tx_to_reconsider(&self, peer: PeerId) -> bool {
        let inner = self.inner.lock();
        inner.work_sets.get(&peer).is_some_and(|set| !set.is_empty())
    }

    pub fn have_tx(&self, gtxid: GenTxid) -> bool {
        let inner = self.inner.lock();
        match gtxid {
            GenTxid::Txid(txid) => inner.orphans.contains_key(&txid),
            GenTxid::Wtxid(wtxid) => inner.wtxid_index.contains_key(&wtxid),
        }
    }

    /// Orphans spending any output of `parent` that came from `peer`,
    /// newest-expiring (i.e. most recently inserted) first. Ties are broken
    /// by handle identity, which is deterministic within this call but not
    /// promised to be stable across calls.
    pub fn get_children_from_same_peer(&self, parent: &dyn Transaction, peer: PeerId) -> Vec<TxRef> {
        let inner = self.inner.lock();
        let mut seen = HashSet::new();
        let mut found: Vec<(u64, usize, TxRef)> = Vec::new();
        for vout in 0..parent.output_count() {
            let outpoint = OutPoint::new(parent.txid(), vout);
            let Some(bucket) = inner.prevout_index.get(&outpoint) else { continue };
            for txid in bucket {
                let Some(entry) = inner.orphans.get(txid) else { continue };
                if entry.from_peer != peer {
                    continue;
                }
                let identity = Arc::as_ptr(&entry.tx) as *const () as usize;
                if seen.insert(identity) {
                    found.push((entry.expire_at, identity, entry.tx.clone()));
                }
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, _, tx)| tx).collect()
    }

    /// Orphans spending any output of `parent` that did *not* come from
    /// `peer`, paired with their actual source peer. Deduplicated; order is
    /// unspecified.
    pub fn get_children_from_different_peer(&self, parent: &dyn Transaction, peer: PeerId) -> Vec<(TxRef, PeerId)> {
        let inner = self.inner.lock();
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for vout in 0..parent.output_count() {
            let outpoint = OutPoint::new(parent.txid(), vout);
            let Some(bucket) = inner.prevout_index.get(&outpoint) else { continue };
            for txid in bucket {
                let Some(entry) = inner.orphans.get(txid) else { continue };
                if entry.from_peer == peer {
                    continue;
                }
                let identity = Arc::as_ptr(&entry.tx) as *const () as usize;
                if seen.insert(identity) {
                    found.push((entry.tx.clone(), entry.from_peer));
                }
            }
        }
        found
    }

    pub fn size(&self) -> usize {
        self.inner.lock().orphans.len()
    }

    /// Re-derives and checks every cross-index invariant from scratch.
    /// Intended for property tests and fuzz harnesses, not the hot path —
    /// it is O(n) and takes the same lock every other operation does.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let inner = self.inner.lock();
        for (idx, (txid, entry)) in inner.orphans.iter().enumerate() {
            if entry.tx.txid() != *txid {
                return Err(InvariantError::PrimaryKeyMismatch { key: *txid, actual: entry.tx.txid() });
            }
            if entry.list_pos != idx {
                return Err(InvariantError::ListPositionMismatch { txid: *txid, recorded: entry.list_pos, actual: idx });
            }
            if entry.tx.weight() > self.config.max_standard_tx_weight {
                return Err(InvariantError::WeightExceedsCap {
                    txid: *txid,
                    weight: entry.tx.weight(),
                    max: self.config.max_standard_tx_weight,
                });
            }
            for outpoint in entry.tx.inputs() {
                match inner.prevout_index.get(outpoint) {
                    Some(bucket) if bucket.contains(txid) => {}
                    _ => return Err(InvariantError::PrevoutIndexMissing { txid: *txid, outpoint: *outpoint }),
                }
            }
            match inner.wtxid_index.get(&entry.tx.wtxid()) {
                Some(t) if t == txid => {}
                _ => return Err(InvariantError::WitnessIndexMissing { txid: *txid, expected: entry.tx.wtxid() }),
            }
        }
        for (&wtxid, &txid) in inner.wtxid_index.iter() {
            if !inner.orphans.contains_key(&txid) {
                return Err(InvariantError::WitnessIndexDangling { wtxid, txid });
            }
        }
        for (&outpoint, bucket) in inner.prevout_index.iter() {
            if bucket.is_empty() {
                return Err(InvariantError::EmptyPrevoutBucket { outpoint });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::id::{Txid, Wtxid};
    use crate::rng::ThreadRandom;

    #[derive(Debug)]
    struct TestTx {
        txid: Txid,
        wtxid: Wtxid,
        weight: u64,
        inputs: Vec<OutPoint>,
        output_count: u32,
    }

    impl Transaction for TestTx {
        fn txid(&self) -> Txid {
            self.txid
        }
        fn wtxid(&self) -> Wtxid {
            self.wtxid
        }
        fn weight(&self) -> u64 {
            self.weight
        }
        fn inputs(&self) -> &[OutPoint] {
            &self.inputs
        }
        fn output_count(&self) -> u32 {
            self.output_count
        }
    }

    fn hash_from_byte(b: u8) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0] = b;
        bytes
    }

    fn make_tx(id: u8, inputs: Vec<OutPoint>, weight: u64, output_count: u32) -> TxRef {
        Arc::new(TestTx {
            txid: Txid::from_bytes(hash_from_byte(id)),
            wtxid: Wtxid::from_bytes(hash_from_byte(id)),
            weight,
            inputs,
            output_count,
        })
    }

    struct FixedRng(usize);
    impl OrphanRng for FixedRng {
        fn uniform(&mut self, n: usize) -> usize {
            self.0 % n
        }
    }

    #[test]
    fn rejects_duplicate_and_oversize() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let tx = make_tx(1, vec![OutPoint::new(Txid::from_bytes(hash_from_byte(99)), 0)], 500, 1);
        assert!(pool.add_tx(tx.clone(), PeerId(7)));
        assert!(!pool.add_tx(tx.clone(), PeerId(7)));
        assert_eq!(pool.size(), 1);

        let too_big = make_tx(2, vec![], 400_001, 0);
        assert!(!pool.add_tx(too_big, PeerId(7)));
        assert_eq!(pool.size(), 1);
        pool.check_invariants().unwrap();
    }

    #[test]
    fn erase_restores_empty_state() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let parent = Txid::from_bytes(hash_from_byte(99));
        let tx = make_tx(1, vec![OutPoint::new(parent, 0)], 500, 1);
        let txid = tx.txid();
        assert!(pool.add_tx(tx, PeerId(7)));
        assert_eq!(pool.erase_tx(&txid), 1);
        assert_eq!(pool.size(), 0);
        assert!(!pool.have_tx(GenTxid::Txid(txid)));
        assert_eq!(pool.erase_tx(&txid), 0);
        pool.check_invariants().unwrap();
    }

    #[test]
    fn swap_remove_keeps_list_positions_dense() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let ids: Vec<Txid> = (1..=5u8)
            .map(|i| {
                let tx = make_tx(i, vec![], 100, 0);
                let txid = tx.txid();
                assert!(pool.add_tx(tx, PeerId(0)));
                txid
            })
            .collect();
        // Remove a middle entry and confirm the list stays dense and every
        // remaining entry's back-pointer matches its real offset.
        assert_eq!(pool.erase_tx(&ids[1]), 1);
        assert_eq!(pool.size(), 4);
        pool.check_invariants().unwrap();
    }

    #[test]
    fn children_to_work_set_round_trip() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let parent_txid = Txid::from_bytes(hash_from_byte(1));
        let child = make_tx(2, vec![OutPoint::new(parent_txid, 0)], 500, 0);
        assert!(pool.add_tx(child.clone(), PeerId(3)));

        let parent = TestTx { txid: parent_txid, wtxid: Wtxid::from_bytes(hash_from_byte(1)), weight: 0, inputs: vec![], output_count: 1 };
        pool.add_children_to_work_set(&parent);

        assert!(pool.have_tx_to_reconsider(PeerId(3)));
        let reconsidered = pool.get_tx_to_reconsider(PeerId(3)).unwrap();
        assert_eq!(reconsidered.txid(), child.txid());
        assert!(pool.get_tx_to_reconsider(PeerId(3)).is_none());
    }

    #[test]
    fn stale_work_set_entries_are_skipped() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let parent_txid = Txid::from_bytes(hash_from_byte(1));
        let child = make_tx(2, vec![OutPoint::new(parent_txid, 0)], 500, 0);
        let child_txid = child.txid();
        assert!(pool.add_tx(child, PeerId(3)));
        let parent = TestTx { txid: parent_txid, wtxid: Wtxid::from_bytes(hash_from_byte(1)), weight: 0, inputs: vec![], output_count: 1 };
        pool.add_children_to_work_set(&parent);

        assert_eq!(pool.erase_tx(&child_txid), 1);
        assert!(pool.have_tx_to_reconsider(PeerId(3)), "set still holds the stale id");
        assert!(pool.get_tx_to_reconsider(PeerId(3)).is_none(), "but draining it finds nothing live");
    }

    #[test]
    fn erase_for_peer_clears_work_set_and_orphans() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let tx_a = make_tx(1, vec![], 100, 0);
        let tx_b = make_tx(2, vec![], 100, 0);
        assert!(pool.add_tx(tx_a, PeerId(1)));
        assert!(pool.add_tx(tx_b, PeerId(2)));
        pool.erase_for_peer(PeerId(1));
        assert_eq!(pool.size(), 1);
        assert!(!pool.have_tx_to_reconsider(PeerId(1)));
        pool.check_invariants().unwrap();
    }

    struct TestBlock(Vec<TxRef>);
    impl Block for TestBlock {
        fn transactions(&self) -> &[TxRef] {
            &self.0
        }
    }

    #[test]
    fn block_eviction_removes_conflicting_orphans() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        let spent = OutPoint::new(Txid::from_bytes(hash_from_byte(9)), 0);
        let orphan = make_tx(1, vec![spent], 500, 0);
        assert!(pool.add_tx(orphan, PeerId(0)));

        let block_tx = make_tx(2, vec![spent], 500, 0);
        let block = TestBlock(vec![block_tx]);
        pool.erase_for_block(&block);
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn expiration_sweep_removes_old_entries() {
        let clock = FakeClock::new(0);
        let pool = Orphanage::with_config(OrphanageConfig::default(), clock);
        let tx = make_tx(1, vec![], 500, 0);
        assert!(pool.add_tx(tx, PeerId(0)));

        pool.limit_orphans(100, &mut ThreadRandom);
        assert_eq!(pool.size(), 1, "not yet expired");

        // Jump past the expiry horizon.
        pool_advance_clock(&pool, 1201);
        pool.limit_orphans(100, &mut ThreadRandom);
        assert_eq!(pool.size(), 0);
    }

    fn pool_advance_clock(pool: &Orphanage<FakeClock>, delta: u64) {
        pool.clock.advance(delta);
    }

    #[test]
    fn random_cap_evicts_exactly_the_overflow() {
        let pool = Orphanage::with_config(OrphanageConfig::default(), FakeClock::new(0));
        for i in 0..101u8 {
            let tx = make_tx(i, vec![], 100, 0);
            assert!(pool.add_tx(tx, PeerId(0)));
        }
        assert_eq!(pool.size(), 101);
        pool.limit_orphans(100, &mut FixedRng(37));
        assert_eq!(pool.size(), 100);
        pool.check_invariants().unwrap();
    }
}
