//! The context-binding proxy: a handle that transparently resolves to a
//! pool-managed resource appropriate to the caller's execution context.
//! See `SPEC_FULL.md` §6 and §9 ("Context-local binding in the proxy").

use std::sync::Arc;

use crate::error::Result;
use crate::pool::Pool;
use crate::store::{ContextStore, SharedStore, ThreadStore};

#[cfg(feature = "tokio")]
use crate::store::TaskStore;

/// Granularity of resource sharing for a [`Proxy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A single resource, materialized once and shared by every caller
    /// regardless of thread or task. The wrapped resource must itself be
    /// safe to use concurrently.
    Shared,
    /// One resource per OS thread, materialized on first access in each.
    Thread,
    /// One resource per cooperative task (behind the `tokio` feature),
    /// materialized on first access in each.
    Versatile,
}

/// A handle that resolves to a pool-managed resource appropriate to the
/// caller's [`Scope`], materializing it on first access in each context.
///
/// `Proxy` itself holds no `Arc<R>` and has no `Deref` of its own: the
/// resource lives in the context store for as long as the context hasn't
/// called [`Proxy::release`], and a bare `&R` borrowed from `self` could
/// outlive that. Access goes through [`Proxy::get`] (an owned `Arc<R>`) or
/// [`Proxy::scoped`] (a guard that owns the `Arc` for its lifetime and
/// derefs to `R`, mirroring [`crate::ScopedResource`]). See `DESIGN.md`.
pub struct Proxy<R: Send + Sync + 'static> {
    pool: Pool<R>,
    store: Arc<dyn ContextStore<R>>,
}

impl<R: Send + Sync + 'static> Proxy<R> {
    /// Wrap `pool` with a proxy of the given [`Scope`].
    ///
    /// # Panics
    ///
    /// Panics if `scope` is [`Scope::Versatile`] and the crate was built
    /// without the `tokio` feature.
    #[must_use]
    pub fn new(pool: Pool<R>, scope: Scope) -> Self {
        let store: Arc<dyn ContextStore<R>> = match scope {
            Scope::Shared => Arc::new(SharedStore::new()),
            Scope::Thread => Arc::new(ThreadStore::new()),
            Scope::Versatile => Self::versatile_store(),
        };
        Self { pool, store }
    }

    #[cfg(feature = "tokio")]
    fn versatile_store() -> Arc<dyn ContextStore<R>> {
        Arc::new(TaskStore::new())
    }

    #[cfg(not(feature = "tokio"))]
    fn versatile_store() -> Arc<dyn ContextStore<R>> {
        panic!("Scope::Versatile requires the `tokio` feature to be enabled");
    }

    /// Return the resource materialized for the calling context, acquiring
    /// one from the underlying pool on first access.
    pub fn get(&self) -> Result<Arc<R>> {
        if let Some(r) = self.store.get() {
            return Ok(r);
        }
        let r = self.pool.get(None)?;
        self.store.set(Arc::clone(&r));
        Ok(r)
    }

    /// Surrender the calling context's materialized resource back to the
    /// pool, if one has been materialized. A no-op otherwise.
    pub fn release(&self) {
        if let Some(r) = self.store.clear() {
            self.pool.ret(r);
        }
    }

    /// Materialize (if needed) and return a scoped guard that releases the
    /// context's resource back to the pool when dropped.
    ///
    /// This is the only way to reach the wrapped resource: the guard owns
    /// the `Arc<R>` for its own lifetime, so the reference it derefs to can
    /// never dangle out from under a concurrent `release()` the way a
    /// `Proxy`-level `Deref` borrowing through the context store could. See
    /// `DESIGN.md`.
    pub fn scoped(&self) -> Result<ScopedProxy<'_, R>> {
        let r = self.get()?;
        Ok(ScopedProxy {
            proxy: self,
            resource: Some(r),
        })
    }
}

impl<R: Send + Sync + 'static> std::fmt::Debug for Proxy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy").finish_non_exhaustive()
    }
}

/// A materialized proxy resource that is released back to the pool when
/// dropped. Obtained via [`Proxy::scoped`].
pub struct ScopedProxy<'p, R: Send + Sync + 'static> {
    proxy: &'p Proxy<R>,
    resource: Option<Arc<R>>,
}

impl<R: Send + Sync + 'static> std::ops::Deref for ScopedProxy<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource
            .as_deref()
            .expect("scoped proxy used after drop")
    }
}

impl<R: Send + Sync + 'static> Drop for ScopedProxy<'_, R> {
    fn drop(&mut self) {
        if self.resource.take().is_some() {
            self.proxy.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    fn counter_pool() -> Pool<u64> {
        let opts = PoolOptions::builder(|i: u64| i)
            .min_size(0)
            .start_housekeeper(false)
            .build()
            .unwrap();
        Pool::new(opts)
    }

    #[test]
    fn shared_scope_materializes_once() {
        let proxy = Proxy::new(counter_pool(), Scope::Shared);
        let first = *proxy.get().unwrap();
        let second = *proxy.get().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn thread_scope_gives_each_thread_its_own_resource() {
        let pool = counter_pool();
        let proxy = Arc::new(Proxy::new(pool, Scope::Thread));

        let v_main = proxy.get().unwrap();

        let proxy2 = proxy.clone();
        let v_other = std::thread::spawn(move || *proxy2.get().unwrap())
            .join()
            .unwrap();

        // Distinct threads draw distinct creation indices from the pool.
        assert_ne!(*v_main, v_other);
    }

    #[test]
    fn release_returns_resource_and_allows_rematerialization() {
        let proxy = Proxy::new(counter_pool(), Scope::Thread);
        let first = *proxy.get().unwrap();
        proxy.release();
        // After release, the next access pulls from the pool's avail set
        // (the just-released resource), not a fresh creation index.
        let second = *proxy.get().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn scoped_releases_on_drop() {
        let pool = counter_pool();
        let proxy = Proxy::new(pool.clone(), Scope::Thread);
        {
            let guard = proxy.scoped().unwrap();
            assert_eq!(*guard, 0);
        }
        assert_eq!(pool.stats().nusing, 0);
    }

    #[test]
    #[should_panic(expected = "tokio")]
    #[cfg(not(feature = "tokio"))]
    fn versatile_without_tokio_feature_panics() {
        let _ = Proxy::new(counter_pool(), Scope::Versatile);
    }
}
