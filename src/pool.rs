//! The generic resource pool: capacity gate, registry, housekeeper, and the
//! public `get`/`ret`/`scoped` acquisition API. See `SPEC_FULL.md` §4 for
//! the per-operation contract this module implements.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::PoolOptions;
use crate::error::{Error, Result};
use crate::guard::ScopedResource;
use crate::registry::{key_of, Key, Registry};
use crate::semaphore::Semaphore;
use crate::stats::{PoolStats, ResourceDetail};

/// Combines the real pool options with a blocking capacity gate and the
/// mutex-guarded registry. Shared via `Arc` between `Pool` handles and the
/// housekeeper thread.
struct Inner<R> {
    opts: PoolOptions<R>,
    registry: Mutex<Registry<R>>,
    gate: Option<Semaphore>,
    hk_parker: Parker,
    hk_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
}

/// A condvar-gated flag used to make the housekeeper's inter-round sleep
/// interruptible by `Pool::shutdown`, instead of riding out a possibly long
/// `delay` after the pool has already been told to stop.
struct Parker {
    stop: Mutex<bool>,
    cond: Condvar,
}

impl Parker {
    fn new() -> Self {
        Self {
            stop: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Sleep for `d` unless woken by `signal`. Returns `true` if woken
    /// (meaning the housekeeper should stop).
    fn sleep(&self, d: Duration) -> bool {
        let mut stop = self.stop.lock();
        if *stop {
            return true;
        }
        self.cond.wait_for(&mut stop, d);
        *stop
    }

    fn signal(&self) {
        *self.stop.lock() = true;
        self.cond.notify_all();
    }
}

/// Outcome of invoking the `health` hook on a borrowed resource.
enum HealthOutcome {
    Healthy,
    Unhealthy,
    /// The hook panicked; treated as "not unhealthy", but counted as an
    /// `hc_error` per §4.5 step 4.
    Errored,
}

/// A generic, thread-safe resource pool.
///
/// See the crate-level docs and `SPEC_FULL.md` for the full contract.
/// Cloning a `Pool` is cheap (an `Arc` bump) and yields a handle to the same
/// underlying pool.
pub struct Pool<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Pool<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for Pool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = self.inner.registry.lock();
        f.debug_struct("Pool")
            .field("navail", &reg.avail.len())
            .field("nusing", &reg.using.len())
            .field("ntodel", &reg.todel.len())
            .field("shutdown", &reg.shutdown)
            .finish()
    }
}

fn effective_timeout(call: Option<Duration>, default: Option<Duration>) -> Option<Duration> {
    match (call, default) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn derive_delay<R>(opts: &PoolOptions<R>) -> Duration {
    if !opts.delay.is_zero() {
        return opts.delay;
    }
    let candidates = [opts.max_avail_delay, opts.max_using_delay]
        .into_iter()
        .filter(|d| !d.is_zero())
        .min();
    match candidates {
        Some(d) => d / 2,
        None => Duration::from_secs(60),
    }
}

fn should_start_housekeeper<R>(opts: &PoolOptions<R>) -> bool {
    opts.start_housekeeper
        && (!opts.delay.is_zero()
            || !opts.max_avail_delay.is_zero()
            || !opts.max_using_delay.is_zero()
            || opts.health.is_some())
}

impl<R: Send + Sync + 'static> Pool<R> {
    /// Build a pool from already-validated [`PoolOptions`].
    ///
    /// Runs an initial refill pass to `min_size` (factory errors are logged
    /// and swallowed, matching the steady-state refill contract) and starts
    /// the housekeeper thread if warranted (see `derive_delay`,
    /// `should_start_housekeeper`).
    #[must_use]
    pub fn new(opts: PoolOptions<R>) -> Self {
        let gate = if opts.max_size > 0 {
            Some(Semaphore::new(opts.max_size))
        } else {
            None
        };
        let pool = Self {
            inner: Arc::new(Inner {
                opts,
                registry: Mutex::new(Registry::new()),
                gate,
                hk_parker: Parker::new(),
                hk_handle: Mutex::new(None),
            }),
        };

        pool.refill_pass();

        if should_start_housekeeper(&pool.inner.opts) {
            let delay = derive_delay(&pool.inner.opts);
            let worker = pool.clone();
            tracing::debug!(?delay, "starting pool housekeeper");
            let handle = std::thread::spawn(move || worker.housekeeper_loop(delay));
            *pool.inner.hk_handle.lock() = Some(handle);
        }

        pool
    }

    fn is_shutdown(&self) -> bool {
        self.inner.registry.lock().shutdown
    }

    // -- hooks, always invoked with the lock not held --------------------

    fn run_opener(&self, r: &R) {
        if let Some(hook) = &self.inner.opts.opener {
            Self::invoke("opener", || hook(r));
        }
    }

    fn run_getter(&self, r: &R) {
        if let Some(hook) = &self.inner.opts.getter {
            Self::invoke("getter", || hook(r));
        }
    }

    fn run_retter(&self, r: &R) {
        if let Some(hook) = &self.inner.opts.retter {
            Self::invoke("retter", || hook(r));
        }
    }

    fn run_closer(&self, r: &R) {
        if let Some(hook) = &self.inner.opts.closer {
            Self::invoke("closer", || hook(r));
        }
    }

    fn run_health(&self, r: &R) -> HealthOutcome {
        let Some(hook) = &self.inner.opts.health else {
            return HealthOutcome::Healthy;
        };
        match std::panic::catch_unwind(AssertUnwindSafe(|| hook(r))) {
            Ok(true) => HealthOutcome::Healthy,
            Ok(false) => HealthOutcome::Unhealthy,
            Err(payload) => {
                tracing::error!(panic = %panic_message(&payload), "health hook panicked");
                HealthOutcome::Errored
            }
        }
    }

    /// Run a hook, catching and logging a panic instead of propagating it.
    /// Hook faults are never fatal to the resource being lent/retired.
    fn invoke(name: &'static str, f: impl FnOnce() + std::panic::UnwindSafe) {
        if let Err(payload) = std::panic::catch_unwind(f) {
            tracing::error!(hook = name, panic = %panic_message(&payload), "hook panicked");
        }
    }

    // -- acquire -----------------------------------------------------------

    /// Acquire a resource, creating one if the pool has none available.
    ///
    /// `timeout` overrides the pool's configured default for this call only;
    /// pass `None` to use the default. Fails with [`Error::PoolShutdown`] if
    /// the pool has been shut down, or [`Error::Timeout`] if a capacity
    /// permit could not be acquired in time.
    ///
    /// # Panics
    ///
    /// Propagates (by re-raising) a panic from the resource factory. The
    /// factory closure does not return `Result` (see §6), so construction
    /// failure is reported the same way the caller's own factory reports it
    /// — by panicking. The capacity permit is always released first.
    pub fn get(&self, timeout: Option<Duration>) -> Result<Arc<R>> {
        if self.is_shutdown() {
            return Err(Error::PoolShutdown);
        }

        let effective = effective_timeout(timeout, self.inner.opts.timeout);
        let wait_start = Instant::now();
        if let Some(gate) = &self.inner.gate {
            let acquired = match effective {
                Some(d) => gate.acquire_timeout(d),
                None => {
                    gate.acquire();
                    true
                }
            };
            if !acquired {
                return Err(Error::Timeout {
                    waited_ms: wait_start.elapsed().as_millis() as u64,
                    timeout_ms: effective.unwrap_or_default().as_millis() as u64,
                });
            }
        }

        match std::panic::catch_unwind(AssertUnwindSafe(|| self.get_after_permit())) {
            Ok(r) => Ok(r),
            Err(payload) => {
                if let Some(gate) = &self.inner.gate {
                    gate.release();
                }
                std::panic::resume_unwind(payload);
            }
        }
    }

    /// Body of `get` that runs once a capacity permit (if gated) is held.
    /// May panic if the factory panics; the caller is responsible for
    /// releasing the permit on that path (see `get`).
    fn get_after_permit(&self) -> Arc<R> {
        loop {
            let now = Instant::now();
            let mut reg = self.inner.registry.lock();
            if let Some(r) = reg.lend(now) {
                drop(reg);
                self.run_getter(&r);
                tracing::debug!("lent resource");
                return r;
            }
            let idx = reg.ncreating;
            reg.ncreating += 1;
            drop(reg);

            tracing::debug!(creation_index = idx, "creating new resource");
            let r = Arc::new((self.inner.opts.fun)(idx));
            self.run_opener(&r);

            let mut reg = self.inner.registry.lock();
            reg.register_avail(r, Instant::now());
            drop(reg);
            // Loop back: lend whatever is now available — not necessarily
            // the resource we just created, if another concurrent caller
            // raced us to the registry lock; that's fine, the capacity
            // semaphore already accounts for both of us.
        }
    }

    /// Return a previously-acquired resource to the pool.
    ///
    /// Calling `ret` on a resource that isn't currently lent out (double
    /// return, or return of a resource the housekeeper already killed) is
    /// tolerated: it logs a warning and is otherwise a no-op (§4.4 step 2).
    pub fn ret(&self, r: Arc<R>) {
        self.run_retter(&r);

        let key = key_of(&r);
        let now = Instant::now();
        let was_using = {
            let mut reg = self.inner.registry.lock();
            if !reg.is_using(key) {
                false
            } else {
                reg.release(key, self.inner.opts.max_use, now);
                true
            }
        };

        if !was_using {
            let rendered = self.render_resource(&r);
            tracing::warn!(resource = %rendered, "unexpected return of a resource the pool does not hold as in-use");
            return;
        }

        if let Some(gate) = &self.inner.gate {
            gate.release();
        }

        self.deferred_destroy_pass();
        self.refill_pass();
    }

    /// Render a resource for logging, preferring `tracer` over a default.
    fn render_resource(&self, r: &R) -> String {
        match &self.inner.opts.tracer {
            Some(tracer) => match std::panic::catch_unwind(AssertUnwindSafe(|| tracer(r))) {
                Ok(s) => s,
                Err(_) => "<resource (tracer panicked)>".to_string(),
            },
            None => "<resource>".to_string(),
        }
    }

    /// Acquire a resource and guarantee it is returned on every exit path
    /// (normal return or unwind) via RAII. See `ScopedResource`.
    pub fn scoped(&self, timeout: Option<Duration>) -> Result<ScopedResource<'_, R>> {
        let r = self.get(timeout)?;
        Ok(ScopedResource::new(self, r))
    }

    // -- refill / deferred destruction --------------------------------------

    /// Top off the registry to `min_size`. Invoked at construction, after
    /// every `ret`, and after each housekeeping round. A factory failure for
    /// one slot is logged and the remaining slots are still attempted on the
    /// next call, not this one — transient backend outages must not wedge
    /// the pool.
    fn refill_pass(&self) {
        loop {
            let nobjs = self.inner.registry.lock().nobjs();
            if nobjs >= self.inner.opts.min_size {
                break;
            }

            let acquired = match &self.inner.gate {
                Some(gate) => gate.try_acquire(),
                None => true,
            };
            if !acquired {
                // Another caller is already using the available capacity;
                // it will itself soon notice the pool is under min_size.
                break;
            }

            let idx = {
                let mut reg = self.inner.registry.lock();
                let idx = reg.ncreating;
                reg.ncreating += 1;
                idx
            };

            let created = std::panic::catch_unwind(AssertUnwindSafe(|| {
                Arc::new((self.inner.opts.fun)(idx))
            }));

            if let Some(gate) = &self.inner.gate {
                gate.release();
            }

            match created {
                Ok(r) => {
                    self.run_opener(&r);
                    self.inner.registry.lock().register_avail(r, Instant::now());
                }
                Err(payload) => {
                    tracing::error!(panic = %panic_message(&payload), "refill factory call failed");
                    break;
                }
            }
        }
    }

    /// Atomically drain `todel` and run `closer` on each entry outside the
    /// lock — closers may perform network I/O and must never run while `L`
    /// is held.
    fn deferred_destroy_pass(&self) {
        let drained = self.inner.registry.lock().drain_todel();
        if drained.is_empty() {
            return;
        }
        let n = drained.len();
        for r in &drained {
            self.run_closer(r);
        }
        self.inner.registry.lock().ndestroys += n as u64;
        tracing::debug!(count = n, "destroyed retired resources");
    }

    // -- housekeeper ---------------------------------------------------------

    fn housekeeper_loop(&self, delay: Duration) {
        loop {
            if self.inner.hk_parker.sleep(delay) {
                tracing::debug!("housekeeper stopping");
                return;
            }

            let start = Instant::now();
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                self.hk_round();
                let rounds = self.inner.registry.lock().hk_rounds;
                if self.inner.opts.health.is_some() && rounds % self.inner.opts.health_freq == 0 {
                    self.health_check_pass();
                }
                self.deferred_destroy_pass();
                self.refill_pass();
            }));

            if let Err(payload) = result {
                tracing::error!(panic = %panic_message(&payload), "housekeeping round failed");
                self.inner.registry.lock().hk_errors += 1;
            }

            let elapsed = start.elapsed();
            let mut reg = self.inner.registry.lock();
            reg.hk_time += elapsed;
            reg.hk_last = Some(Instant::now());
        }
    }

    /// Idle eviction + long-use warn/kill (§4.5 step 2). Bumps `hk_rounds`.
    fn hk_round(&self) {
        let now = Instant::now();
        let mut reg = self.inner.registry.lock();

        if !self.inner.opts.max_using_delay.is_zero() {
            let warn = self.inner.opts.max_using_delay;
            let kill = self.inner.opts.max_using_delay_kill;
            let mut long_run = 0u64;
            let mut total_age = Duration::ZERO;
            let mut to_kill: Vec<Key> = Vec::new();

            for (&key, _r) in &reg.using {
                if let Some(info) = reg.uses.get(&key) {
                    let age = now.saturating_duration_since(info.last_get);
                    if age >= warn {
                        long_run += 1;
                        total_age += age;
                        if !kill.is_zero() && age >= kill {
                            to_kill.push(key);
                        }
                    }
                }
            }

            if long_run > 0 {
                let avg = total_age / long_run as u32;
                tracing::warn!(
                    long_run,
                    avg_age_secs = avg.as_secs_f64(),
                    "long-running resources detected"
                );
            }

            for key in to_kill {
                if let Some(r) = reg.using.remove(&key) {
                    reg.uses.remove(&key);
                    reg.todel.push(r);
                    reg.nkilled += 1;
                    if let Some(gate) = &self.inner.gate {
                        gate.release();
                    }
                }
            }
        }

        if !self.inner.opts.max_avail_delay.is_zero() && reg.nobjs() > self.inner.opts.min_size {
            let threshold = self.inner.opts.max_avail_delay;
            let min_size = self.inner.opts.min_size;
            let mut i = 0;
            while i < reg.avail.len() {
                if reg.nobjs() <= min_size {
                    break;
                }
                let key = key_of(&reg.avail[i]);
                let age = reg
                    .uses
                    .get(&key)
                    .map(|info| now.saturating_duration_since(info.last_ret))
                    .unwrap_or(Duration::ZERO);
                if age >= threshold {
                    let r = reg.avail.remove(i);
                    reg.uses.remove(&key);
                    reg.todel.push(r);
                    reg.nrecycled += 1;
                } else {
                    i += 1;
                }
            }
        }

        reg.hk_rounds += 1;
    }

    /// Health-check a snapshot of `avail`, outside the lock (§4.5 step 4).
    fn health_check_pass(&self) {
        if self.inner.opts.health.is_none() {
            return;
        }

        let snapshot: Vec<Arc<R>> = self.inner.registry.lock().avail.clone();
        for r in snapshot {
            let key = key_of(&r);
            let gate_ok = match &self.inner.gate {
                Some(gate) => gate.try_acquire(),
                None => true,
            };
            if !gate_ok {
                continue;
            }

            let borrowed = self.inner.registry.lock().borrow_key(key, Instant::now());
            let Some(r) = borrowed else {
                // No longer available: already lent, killed, or recycled.
                if let Some(gate) = &self.inner.gate {
                    gate.release();
                }
                continue;
            };

            let outcome = self.run_health(&r);
            {
                let mut reg = self.inner.registry.lock();
                reg.nhealth += 1;
                match outcome {
                    HealthOutcome::Healthy => {
                        reg.return_(key, Instant::now());
                    }
                    HealthOutcome::Errored => {
                        reg.hc_errors += 1;
                        reg.return_(key, Instant::now());
                    }
                    HealthOutcome::Unhealthy => {
                        reg.out(key);
                        reg.todel.push(r);
                        reg.bad_health += 1;
                        tracing::warn!("resource failed health check, retiring");
                    }
                }
            }
            if let Some(gate) = &self.inner.gate {
                gate.release();
            }
        }

        self.inner.registry.lock().hc_rounds += 1;
    }

    // -- shutdown & stats ------------------------------------------------

    /// Shut down the pool: marks it terminally closed, disables refill,
    /// stops the housekeeper, then destroys every resource the registry
    /// still knows about — `using` (with a warning), `avail`, and anything
    /// already queued in `todel` awaiting the next deferred-destroy pass —
    /// and clears all three sets. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut reg = self.inner.registry.lock();
            if reg.shutdown {
                return;
            }
            reg.shutdown = true;
        }

        self.inner.hk_parker.signal();
        if let Some(handle) = self.inner.hk_handle.lock().take() {
            let _ = handle.join();
        }

        let (using, avail, todel) = {
            let mut reg = self.inner.registry.lock();
            let using: Vec<Arc<R>> = reg.using.values().cloned().collect();
            let avail: Vec<Arc<R>> = std::mem::take(&mut reg.avail);
            let todel: Vec<Arc<R>> = reg.drain_todel();
            reg.using.clear();
            reg.uses.clear();
            (using, avail, todel)
        };

        if !using.is_empty() {
            tracing::warn!(
                count = using.len(),
                "shutting down pool with resources still checked out"
            );
        }

        let n = (using.len() + avail.len() + todel.len()) as u64;
        for r in using.iter().chain(avail.iter()).chain(todel.iter()) {
            self.run_closer(r);
        }
        self.inner.registry.lock().ndestroys += n;
    }

    /// A JSON-serializable snapshot of the pool's configuration, counters,
    /// and per-resource detail (§4.9).
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let now = Instant::now();
        let reg = self.inner.registry.lock();

        let avail: Vec<ResourceDetail> = reg
            .avail
            .iter()
            .map(|r| self.resource_detail(r, &reg, now))
            .collect();
        let using: Vec<ResourceDetail> = reg
            .using
            .values()
            .map(|r| self.resource_detail(r, &reg, now))
            .collect();

        PoolStats {
            min_size: self.inner.opts.min_size,
            max_size: self.inner.opts.max_size,
            timeout_ms: self.inner.opts.timeout.map(|d| d.as_millis() as u64),
            max_use: self.inner.opts.max_use,
            max_avail_delay_ms: self.inner.opts.max_avail_delay.as_millis() as u64,
            max_using_delay_ms: self.inner.opts.max_using_delay.as_millis() as u64,
            max_using_delay_kill_ms: self.inner.opts.max_using_delay_kill.as_millis() as u64,
            health_freq: self.inner.opts.health_freq,
            navail: reg.avail.len(),
            nusing: reg.using.len(),
            ntodel: reg.todel.len(),
            nobjs: reg.nobjs(),
            semaphore_value: self.inner.gate.as_ref().map(Semaphore::value),
            semaphore_initial: if self.inner.opts.max_size > 0 {
                Some(self.inner.opts.max_size)
            } else {
                None
            },
            ncreating: reg.ncreating,
            ncreated: reg.ncreated,
            nuses: reg.nuses,
            nhealth: reg.nhealth,
            bad_health: reg.bad_health,
            nborrows: reg.nborrows,
            nreturns: reg.nreturns,
            nkilled: reg.nkilled,
            nrecycled: reg.nrecycled,
            nwornout: reg.nwornout,
            ndestroys: reg.ndestroys,
            hk_rounds: reg.hk_rounds,
            hk_errors: reg.hk_errors,
            hc_rounds: reg.hc_rounds,
            hc_errors: reg.hc_errors,
            running: !reg.shutdown,
            time_per_hk_ms: reg.hk_time.as_secs_f64() * 1000.0 / (reg.hk_rounds.max(1) as f64),
            rel_hk_last_secs: reg
                .hk_last
                .map(|last| -now.saturating_duration_since(last).as_secs_f64()),
            avail,
            using,
        }
    }

    fn resource_detail(&self, r: &Arc<R>, reg: &Registry<R>, now: Instant) -> ResourceDetail {
        let key = key_of(r);
        let info = reg.uses.get(&key);
        let rendering = match &self.inner.opts.stats {
            Some(stats) => match std::panic::catch_unwind(AssertUnwindSafe(|| stats(r))) {
                Ok(v) => crate::stats::Rendering::Json(v),
                Err(_) => crate::stats::Rendering::Default,
            },
            None => match &self.inner.opts.tracer {
                Some(tracer) => match std::panic::catch_unwind(AssertUnwindSafe(|| tracer(r))) {
                    Ok(s) => crate::stats::Rendering::Tracer(s),
                    Err(_) => crate::stats::Rendering::Default,
                },
                None => crate::stats::Rendering::Default,
            },
        };

        ResourceDetail {
            rendering,
            uses: info.map_or(0, |i| i.uses),
            last_get_secs: info.map_or(0.0, |i| now.saturating_duration_since(i.last_get).as_secs_f64()),
            last_ret_secs: info.map_or(0.0, |i| now.saturating_duration_since(i.last_ret).as_secs_f64()),
        }
    }
}

impl<R> Drop for Pool<R> {
    fn drop(&mut self) {
        // Only the last handle (refcount about to hit zero) should stop the
        // housekeeper; cheap clones sharing the same Inner must not join it.
        if Arc::strong_count(&self.inner) == 1 {
            self.inner.hk_parker.signal();
            if let Some(handle) = self.inner.hk_handle.lock().take() {
                let _ = handle.join();
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counter_pool(max_size: usize, max_use: u64) -> Pool<u64> {
        let opts = PoolOptions::builder(|i: u64| i)
            .max_size(max_size)
            .min_size(0)
            .max_use(max_use)
            .start_housekeeper(false)
            .build()
            .unwrap();
        Pool::new(opts)
    }

    #[test]
    fn max_use_recycling_scenario() {
        // Scenario 1: fun = |i| i, max_size = 1, max_use = 2.
        // get -> ret -> get -> ret -> get yields 0, 0, 1.
        let pool = counter_pool(1, 2);
        let r1 = pool.get(None).unwrap();
        assert_eq!(*r1, 0);
        pool.ret(r1);
        let r2 = pool.get(None).unwrap();
        assert_eq!(*r2, 0);
        pool.ret(r2);
        let r3 = pool.get(None).unwrap();
        assert_eq!(*r3, 1);
    }

    #[test]
    fn bounded_timeout_scenario() {
        let pool = counter_pool(2, 0);
        let _g1 = pool.get(None).unwrap();
        let _g2 = pool.get(None).unwrap();

        let pool2 = pool.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || pool2.get(Some(Duration::from_millis(100))));
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn creation_indices_strictly_increase() {
        let pool = counter_pool(0, 0);
        let r0 = pool.get(None).unwrap();
        let r1 = pool.get(None).unwrap();
        let r2 = pool.get(None).unwrap();
        assert_eq!((*r0, *r1, *r2), (0, 1, 2));
    }

    #[test]
    fn unexpected_double_return_is_tolerated() {
        let pool = counter_pool(1, 0);
        let r = pool.get(None).unwrap();
        pool.ret(r.clone());
        // Second return of the same Arc: logged, not a panic, no corruption.
        pool.ret(r);
        let stats = pool.stats();
        assert_eq!(stats.nobjs, 1);
        assert_eq!(stats.navail, 1);
    }

    #[test]
    fn scoped_returns_on_panic_unwind() {
        let pool = counter_pool(1, 0);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = pool.scoped(None).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(pool.stats().nusing, 0);
    }

    #[test]
    fn shutdown_destroys_everything_and_rejects_new_get() {
        let closed = Arc::new(AtomicU64::new(0));
        let closed_c = closed.clone();
        let opts = PoolOptions::builder(|i: u64| i)
            .max_size(2)
            .min_size(1)
            .start_housekeeper(false)
            .closer(move |_r: &u64| {
                closed_c.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        let pool = Pool::new(opts);
        let r = pool.get(None).unwrap();
        pool.shutdown();
        drop(r);

        assert!(matches!(pool.get(None), Err(Error::PoolShutdown)));
        assert!(closed.load(Ordering::SeqCst) >= 1);

        // Idempotent.
        pool.shutdown();
    }

    #[test]
    fn health_check_retires_unhealthy_resources() {
        let calls = Arc::new(AtomicU64::new(0));
        let calls_c = calls.clone();
        let opts = PoolOptions::builder(|i: u64| i)
            .min_size(1)
            .start_housekeeper(false)
            .health(move |_r: &u64| {
                let n = calls_c.fetch_add(1, Ordering::SeqCst);
                n % 2 == 0
            })
            .build()
            .unwrap();
        let pool = Pool::new(opts);
        pool.health_check_pass();
        let stats = pool.stats();
        assert_eq!(stats.bad_health, 0);

        pool.health_check_pass();
        let stats = pool.stats();
        assert_eq!(stats.bad_health, 1);
    }

    #[test]
    fn refill_replenishes_to_min_size_after_ret() {
        let opts = PoolOptions::builder(|i: u64| i)
            .min_size(2)
            .start_housekeeper(false)
            .build()
            .unwrap();
        let pool = Pool::new(opts);
        assert_eq!(pool.stats().nobjs, 2);
        let r = pool.get(None).unwrap();
        pool.ret(r);
        assert_eq!(pool.stats().nobjs, 2);
    }
}
