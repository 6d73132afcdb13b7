//! The resource registry: the three disjoint membership sets, per-resource
//! usage metadata, and the monotonic counters described in `SPEC_FULL.md`
//! §3. Pure bookkeeping — no I/O, no locking of its own. [`crate::pool::Pool`]
//! holds one behind a `parking_lot::Mutex` and is the only thing that calls
//! into it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-resource usage counters, keyed by identity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UseInfo {
    pub(crate) uses: u64,
    pub(crate) last_get: Instant,
    pub(crate) last_ret: Instant,
}

impl UseInfo {
    fn fresh(now: Instant) -> Self {
        Self {
            uses: 0,
            last_get: now,
            last_ret: now,
        }
    }
}

/// Identity key for a resource: the address of its `Arc` allocation.
/// Stable for the lifetime of that allocation, distinct across instances —
/// the Rust realization of "identity is by reference equality".
pub(crate) type Key = usize;

pub(crate) fn key_of<R>(r: &Arc<R>) -> Key {
    Arc::as_ptr(r) as usize
}

pub(crate) struct Registry<R> {
    pub(crate) avail: Vec<Arc<R>>,
    pub(crate) using: HashMap<Key, Arc<R>>,
    pub(crate) todel: Vec<Arc<R>>,
    pub(crate) uses: HashMap<Key, UseInfo>,

    pub(crate) ncreating: u64,
    pub(crate) ncreated: u64,
    pub(crate) nuses: u64,
    pub(crate) nhealth: u64,
    pub(crate) bad_health: u64,
    pub(crate) nborrows: u64,
    pub(crate) nreturns: u64,
    pub(crate) nkilled: u64,
    pub(crate) nrecycled: u64,
    pub(crate) nwornout: u64,
    pub(crate) ndestroys: u64,
    pub(crate) hk_rounds: u64,
    pub(crate) hk_errors: u64,
    pub(crate) hc_rounds: u64,
    pub(crate) hc_errors: u64,
    pub(crate) hk_time: Duration,
    pub(crate) hk_last: Option<Instant>,

    pub(crate) shutdown: bool,
}

impl<R> Registry<R> {
    pub(crate) fn new() -> Self {
        Self {
            avail: Vec::new(),
            using: HashMap::new(),
            todel: Vec::new(),
            uses: HashMap::new(),
            ncreating: 0,
            ncreated: 0,
            nuses: 0,
            nhealth: 0,
            bad_health: 0,
            nborrows: 0,
            nreturns: 0,
            nkilled: 0,
            nrecycled: 0,
            nwornout: 0,
            ndestroys: 0,
            hk_rounds: 0,
            hk_errors: 0,
            hc_rounds: 0,
            hc_errors: 0,
            hk_time: Duration::ZERO,
            hk_last: None,
            shutdown: false,
        }
    }

    /// Number of registered resources: `|uses| = |avail| + |using|`.
    pub(crate) fn nobjs(&self) -> usize {
        self.uses.len()
    }

    /// Record a freshly factory-created resource and place it in `avail`.
    /// Caller is responsible for having already run the `opener` hook and
    /// for having bumped `ncreating` before the (unlocked) factory call.
    pub(crate) fn register_avail(&mut self, r: Arc<R>, now: Instant) {
        let key = key_of(&r);
        self.uses.insert(key, UseInfo::fresh(now));
        self.ncreated += 1;
        self.avail.push(r);
    }

    /// Move one resource from `avail` to `using`, bumping usage counters.
    /// Panics never: callers only invoke this after confirming `avail` is
    /// non-empty.
    pub(crate) fn lend(&mut self, now: Instant) -> Option<Arc<R>> {
        let r = self.avail.pop()?;
        let key = key_of(&r);
        if let Some(info) = self.uses.get_mut(&key) {
            info.uses += 1;
            info.last_get = now;
        }
        self.nuses += 1;
        self.using.insert(key, r.clone());
        Some(r)
    }

    /// Borrow a *specific* resource out of `avail`, used by the health-check
    /// pass which snapshots `avail` ahead of time and must re-check each
    /// snapshotted resource is still actually available. Returns `None` if
    /// `key` is no longer in `avail` (already lent, killed, or recycled).
    pub(crate) fn borrow_key(&mut self, key: Key, now: Instant) -> Option<Arc<R>> {
        let pos = self.avail.iter().position(|r| key_of(r) == key)?;
        let r = self.avail.remove(pos);
        if let Some(info) = self.uses.get_mut(&key) {
            info.last_get = now;
        }
        self.nborrows += 1;
        self.using.insert(key, r.clone());
        Some(r)
    }

    /// Whether `r` is currently in `using`.
    pub(crate) fn is_using(&self, key: Key) -> bool {
        self.using.contains_key(&key)
    }

    /// Move a resource from `using` back to `avail`, or into `todel` if it
    /// has reached `max_use`. Returns `true` if the resource was wornout
    /// (moved to `todel`) rather than returned to `avail`.
    pub(crate) fn release(&mut self, key: Key, max_use: u64, now: Instant) -> bool {
        let Some(r) = self.using.remove(&key) else {
            return false;
        };
        let wornout = max_use > 0
            && self
                .uses
                .get(&key)
                .is_some_and(|info| info.uses >= max_use);
        if wornout {
            self.uses.remove(&key);
            self.todel.push(r);
            self.nwornout += 1;
        } else {
            if let Some(info) = self.uses.get_mut(&key) {
                info.last_ret = now;
            }
            self.avail.push(r);
        }
        true
    }

    /// Internal counterpart to `release`, bumping `nreturns` instead.
    pub(crate) fn return_(&mut self, key: Key, now: Instant) -> bool {
        let was_using = self.using.contains_key(&key);
        // Borrowed resources never count against max_use / wornout.
        if let Some(r) = self.using.remove(&key) {
            if let Some(info) = self.uses.get_mut(&key) {
                info.last_ret = now;
            }
            self.avail.push(r);
            self.nreturns += 1;
        }
        was_using
    }

    /// Remove a resource from whichever set it inhabits and drop its
    /// `uses` entry. Idempotent on an already-removed key.
    pub(crate) fn out(&mut self, key: Key) {
        self.using.remove(&key);
        self.avail.retain(|r| key_of(r) != key);
        self.uses.remove(&key);
    }

    /// Drain `todel` under lock, returning the removed resources for
    /// out-of-lock destruction.
    pub(crate) fn drain_todel(&mut self) -> Vec<Arc<R>> {
        std::mem::take(&mut self.todel)
    }
}
