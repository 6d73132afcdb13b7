//! Materialization-on-first-access for each `Scope`, and the isolation
//! guarantees each scope is supposed to provide.

use std::sync::Arc;

use proxy_pattern_pool::{PoolOptions, Proxy, Scope};

fn counter_pool() -> proxy_pattern_pool::Pool<u64> {
    let opts = PoolOptions::builder(|i: u64| i)
        .min_size(0)
        .start_housekeeper(false)
        .build()
        .unwrap();
    proxy_pattern_pool::Pool::new(opts)
}

#[test]
fn shared_scope_materializes_once_for_every_caller() {
    let proxy = Arc::new(Proxy::new(counter_pool(), Scope::Shared));

    let a = *proxy.get().unwrap();
    let b = *std::thread::spawn({
        let proxy = proxy.clone();
        move || *proxy.get().unwrap()
    })
    .join()
    .unwrap();

    assert_eq!(a, b, "SHARED scope must hand every caller the same resource");
}

#[test]
fn thread_scope_materializes_independently_per_thread() {
    let pool = counter_pool();
    let proxy = Arc::new(Proxy::new(pool, Scope::Thread));

    let on_main = *proxy.get().unwrap();
    let on_other = std::thread::spawn({
        let proxy = proxy.clone();
        move || *proxy.get().unwrap()
    })
    .join()
    .unwrap();

    assert_ne!(
        on_main, on_other,
        "THREAD scope must not leak a resource materialized on one thread to another"
    );
}

#[test]
fn thread_scope_reuses_the_same_resource_within_one_thread() {
    let proxy = Proxy::new(counter_pool(), Scope::Thread);
    let first = *proxy.get().unwrap();
    let second = *proxy.get().unwrap();
    assert_eq!(first, second, "repeated access within one context must not re-materialize");
}

#[test]
fn release_clears_the_context_slot_so_the_next_get_rematerializes() {
    let proxy = Proxy::new(counter_pool(), Scope::Thread);
    let before = *proxy.get().unwrap();
    proxy.release();
    // After release the resource is back in `avail`; the next `get` should
    // draw it from there rather than create a new one.
    let after = *proxy.get().unwrap();
    assert_eq!(before, after);
}

#[test]
fn scoped_proxy_releases_on_drop() {
    let pool = counter_pool();
    let proxy = Proxy::new(pool.clone(), Scope::Thread);
    {
        let guard = proxy.scoped().unwrap();
        assert_eq!(*guard, 0);
    }
    assert_eq!(pool.stats().nusing, 0);
}

#[cfg(feature = "tokio")]
mod versatile {
    use super::*;

    #[tokio::test]
    async fn versatile_scope_materializes_independently_per_task() {
        let proxy = Arc::new(Proxy::new(counter_pool(), Scope::Versatile));

        let in_task_a = proxy.get().unwrap();
        let in_task_b = tokio::spawn({
            let proxy = proxy.clone();
            async move { *proxy.get().unwrap() }
        })
        .await
        .unwrap();

        assert_ne!(*in_task_a, in_task_b);
    }
}

#[cfg(not(feature = "tokio"))]
#[test]
#[should_panic(expected = "tokio")]
fn versatile_scope_requires_the_tokio_feature() {
    let _ = Proxy::new(counter_pool(), Scope::Versatile);
}
