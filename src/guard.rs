//! RAII scoped acquisition: guarantees `ret` runs on every exit path.

use std::sync::Arc;

use crate::pool::Pool;

/// A resource borrowed from a [`Pool`] that is returned automatically when
/// dropped — on a normal scope exit or on panic unwind alike. Equivalent in
/// contract to `try { r = pool.get()?; ... } finally { pool.ret(r); }`.
///
/// Obtained via [`Pool::scoped`].
pub struct ScopedResource<'p, R> {
    pool: &'p Pool<R>,
    resource: Option<Arc<R>>,
}

impl<'p, R> ScopedResource<'p, R> {
    pub(crate) fn new(pool: &'p Pool<R>, resource: Arc<R>) -> Self {
        Self {
            pool,
            resource: Some(resource),
        }
    }

    /// Take the resource out of the guard, returning it to the caller
    /// without returning it to the pool. The caller becomes responsible for
    /// eventually calling [`Pool::ret`] itself.
    #[must_use]
    pub fn into_inner(mut self) -> Arc<R> {
        self.resource.take().expect("guard used after into_inner")
    }
}

impl<R: Send + Sync + 'static> std::ops::Deref for ScopedResource<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource.as_deref().expect("guard used after into_inner")
    }
}

impl<R: Send + Sync + 'static> Drop for ScopedResource<'_, R> {
    fn drop(&mut self) {
        if let Some(r) = self.resource.take() {
            self.pool.ret(r);
        }
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for ScopedResource<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedResource")
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    fn test_pool() -> Pool<u64> {
        let opts = PoolOptions::builder(|i: u64| i)
            .max_size(1)
            .min_size(0)
            .start_housekeeper(false)
            .build()
            .unwrap();
        Pool::new(opts)
    }

    #[test]
    fn scoped_returns_on_normal_drop() {
        let pool = test_pool();
        {
            let guard = pool.scoped(None).unwrap();
            assert_eq!(*guard, 0);
        }
        assert_eq!(pool.stats().nusing, 0);
        assert_eq!(pool.stats().navail, 1);
    }

    #[test]
    fn into_inner_bypasses_automatic_return() {
        let pool = test_pool();
        let guard = pool.scoped(None).unwrap();
        let r = guard.into_inner();
        assert_eq!(pool.stats().nusing, 1);
        pool.ret(r);
        assert_eq!(pool.stats().nusing, 0);
    }
}
