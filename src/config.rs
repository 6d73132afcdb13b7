//! Validated construction parameters for [`crate::Pool`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};

/// A per-resource side effect hook: `opener`, `getter`, `retter`, `closer`.
pub type SideEffectHook<R> = Arc<dyn Fn(&R) + Send + Sync>;

/// The health probe hook: returns `false` to retire a resource.
pub type HealthHook<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// The `stats` observer hook: renders a resource as a JSON value.
pub type StatsHook<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;

/// The `tracer` observer hook: renders a resource as a short string.
pub type TracerHook<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// The resource factory: produces a new `R` given a strictly increasing
/// creation index, starting at 0.
pub type Factory<R> = Arc<dyn Fn(u64) -> R + Send + Sync>;

/// Validated, immutable construction parameters for a [`crate::Pool`].
///
/// Built via [`PoolOptions::builder`]; see the field table in `SPEC_FULL.md`
/// §6 for the meaning and default of every option.
pub struct PoolOptions<R> {
    pub(crate) fun: Factory<R>,
    pub(crate) max_size: usize,
    pub(crate) min_size: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) max_use: u64,
    pub(crate) max_avail_delay: Duration,
    pub(crate) max_using_delay: Duration,
    pub(crate) max_using_delay_kill: Duration,
    pub(crate) health_freq: u64,
    pub(crate) delay: Duration,
    pub(crate) start_housekeeper: bool,
    pub(crate) opener: Option<SideEffectHook<R>>,
    pub(crate) getter: Option<SideEffectHook<R>>,
    pub(crate) retter: Option<SideEffectHook<R>>,
    pub(crate) closer: Option<SideEffectHook<R>>,
    pub(crate) health: Option<HealthHook<R>>,
    pub(crate) stats: Option<StatsHook<R>>,
    pub(crate) tracer: Option<TracerHook<R>>,
}

impl<R> PoolOptions<R> {
    /// Start building a [`PoolOptions`] with the required factory closure.
    pub fn builder(fun: impl Fn(u64) -> R + Send + Sync + 'static) -> PoolOptionsBuilder<R> {
        PoolOptionsBuilder::new(fun)
    }
}

/// Builder for [`PoolOptions`]. Every setter returns `Self` for chaining;
/// [`PoolOptionsBuilder::build`] performs cross-field validation.
pub struct PoolOptionsBuilder<R> {
    fun: Factory<R>,
    max_size: usize,
    min_size: usize,
    timeout: Option<Duration>,
    max_use: u64,
    max_avail_delay: Duration,
    max_using_delay: Duration,
    max_using_delay_kill: Duration,
    health_freq: u64,
    delay: Duration,
    start_housekeeper: bool,
    opener: Option<SideEffectHook<R>>,
    getter: Option<SideEffectHook<R>>,
    retter: Option<SideEffectHook<R>>,
    closer: Option<SideEffectHook<R>>,
    health: Option<HealthHook<R>>,
    stats: Option<StatsHook<R>>,
    tracer: Option<TracerHook<R>>,
}

impl<R> PoolOptionsBuilder<R> {
    fn new(fun: impl Fn(u64) -> R + Send + Sync + 'static) -> Self {
        Self {
            fun: Arc::new(fun),
            max_size: 0,
            min_size: 1,
            timeout: None,
            max_use: 0,
            max_avail_delay: Duration::ZERO,
            max_using_delay: Duration::ZERO,
            max_using_delay_kill: Duration::ZERO,
            health_freq: 1,
            delay: Duration::ZERO,
            start_housekeeper: true,
            opener: None,
            getter: None,
            retter: None,
            closer: None,
            health: None,
            stats: None,
            tracer: None,
        }
    }

    /// Capacity bound; 0 means unbounded.
    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Target minimum number of registered resources.
    #[must_use]
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Default acquire timeout; `None` means wait forever.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses after which a resource is retired; 0 means unlimited.
    #[must_use]
    pub fn max_use(mut self, max_use: u64) -> Self {
        self.max_use = max_use;
        self
    }

    /// Idle-eviction threshold; zero disables idle eviction.
    #[must_use]
    pub fn max_avail_delay(mut self, max_avail_delay: Duration) -> Self {
        self.max_avail_delay = max_avail_delay;
        self
    }

    /// Long-use warn threshold; zero disables the warning.
    #[must_use]
    pub fn max_using_delay(mut self, max_using_delay: Duration) -> Self {
        self.max_using_delay = max_using_delay;
        self
    }

    /// Long-use kill threshold; zero disables killing.
    #[must_use]
    pub fn max_using_delay_kill(mut self, max_using_delay_kill: Duration) -> Self {
        self.max_using_delay_kill = max_using_delay_kill;
        self
    }

    /// Housekeeping rounds between health sweeps.
    #[must_use]
    pub fn health_freq(mut self, health_freq: u64) -> Self {
        self.health_freq = health_freq;
        self
    }

    /// Forced housekeeping period; zero means derive it automatically.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Whether to launch the housekeeper thread at all.
    #[must_use]
    pub fn start_housekeeper(mut self, start_housekeeper: bool) -> Self {
        self.start_housekeeper = start_housekeeper;
        self
    }

    /// Hook called once after a resource is created, outside the lock.
    #[must_use]
    pub fn opener(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.opener = Some(Arc::new(hook));
        self
    }

    /// Hook called on every `get`, outside the lock.
    #[must_use]
    pub fn getter(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.getter = Some(Arc::new(hook));
        self
    }

    /// Hook called on every `ret`, outside the lock.
    #[must_use]
    pub fn retter(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.retter = Some(Arc::new(hook));
        self
    }

    /// Hook called once before a resource is dropped, outside the lock.
    #[must_use]
    pub fn closer(mut self, hook: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.closer = Some(Arc::new(hook));
        self
    }

    /// Health probe; a `false` return retires the resource.
    #[must_use]
    pub fn health(mut self, hook: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.health = Some(Arc::new(hook));
        self
    }

    /// JSON observer used by [`crate::Pool::stats`] per-resource detail lists.
    #[must_use]
    pub fn stats(mut self, hook: impl Fn(&R) -> Value + Send + Sync + 'static) -> Self {
        self.stats = Some(Arc::new(hook));
        self
    }

    /// String observer used by [`crate::Pool::stats`] and unexpected-return
    /// warnings.
    #[must_use]
    pub fn tracer(mut self, hook: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        self.tracer = Some(Arc::new(hook));
        self
    }

    /// Validate the accumulated options and produce a [`PoolOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolConfig`] if `min_size` exceeds a nonzero
    /// `max_size`, if `max_using_delay_kill` is set without exceeding
    /// `max_using_delay`, or if `health_freq` is zero.
    pub fn build(self) -> Result<PoolOptions<R>> {
        if self.max_size > 0 && self.min_size > self.max_size {
            return Err(Error::config(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if !self.max_using_delay_kill.is_zero()
            && !self.max_using_delay.is_zero()
            && self.max_using_delay_kill <= self.max_using_delay
        {
            return Err(Error::config(
                "max_using_delay_kill must be greater than max_using_delay",
            ));
        }
        if self.health_freq == 0 {
            return Err(Error::config("health_freq must be at least 1"));
        }

        Ok(PoolOptions {
            fun: self.fun,
            max_size: self.max_size,
            min_size: self.min_size,
            timeout: self.timeout,
            max_use: self.max_use,
            max_avail_delay: self.max_avail_delay,
            max_using_delay: self.max_using_delay,
            max_using_delay_kill: self.max_using_delay_kill,
            health_freq: self.health_freq,
            delay: self.delay,
            start_housekeeper: self.start_housekeeper,
            opener: self.opener,
            getter: self.getter,
            retter: self.retter,
            closer: self.closer,
            health: self.health,
            stats: self.stats,
            tracer: self.tracer,
        })
    }
}
