//! Context-local storage strategies backing [`crate::Proxy`]'s three scopes.
//!
//! See `SPEC_FULL.md` §9 "Context-local binding in the proxy": a small
//! strategy trait, `ContextStore`, with a shared single-slot implementation,
//! a per-OS-thread implementation, and (behind the `tokio` feature) a
//! per-cooperative-task implementation.

use std::sync::Arc;
use std::thread::ThreadId;

use dashmap::DashMap;
use parking_lot::Mutex;

/// `get`/`set`/`clear` over whatever "current context" means for a given
/// [`crate::Scope`]. Implementations must be safe to call from any thread
/// concurrently; they do not themselves decide *which* context a call
/// belongs to (that's `std::thread::current().id()`, a task id, or nothing
/// at all for the shared scope) — they just key storage by it.
pub trait ContextStore<R>: Send + Sync {
    /// Look up the resource materialized for the calling context, if any.
    fn get(&self) -> Option<Arc<R>>;
    /// Materialize the resource for the calling context.
    fn set(&self, value: Arc<R>);
    /// Clear (and return) the calling context's resource, if any.
    fn clear(&self) -> Option<Arc<R>>;
}

/// `Scope::Shared`: a single slot shared across every caller, regardless of
/// thread or task.
pub struct SharedStore<R>(Mutex<Option<Arc<R>>>);

impl<R> SharedStore<R> {
    pub fn new() -> Self {
        Self(Mutex::new(None))
    }
}

impl<R> Default for SharedStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync> ContextStore<R> for SharedStore<R> {
    fn get(&self) -> Option<Arc<R>> {
        self.0.lock().clone()
    }

    fn set(&self, value: Arc<R>) {
        *self.0.lock() = Some(value);
    }

    fn clear(&self) -> Option<Arc<R>> {
        self.0.lock().take()
    }
}

/// `Scope::Thread`: one resource per OS thread, keyed by [`ThreadId`].
pub struct ThreadStore<R>(DashMap<ThreadId, Arc<R>>);

impl<R> ThreadStore<R> {
    pub fn new() -> Self {
        Self(DashMap::new())
    }
}

impl<R> Default for ThreadStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync> ContextStore<R> for ThreadStore<R> {
    fn get(&self) -> Option<Arc<R>> {
        self.0.get(&std::thread::current().id()).map(|e| e.clone())
    }

    fn set(&self, value: Arc<R>) {
        self.0.insert(std::thread::current().id(), value);
    }

    fn clear(&self) -> Option<Arc<R>> {
        self.0.remove(&std::thread::current().id()).map(|(_, v)| v)
    }
}

/// `Scope::Versatile`: one resource per cooperative task, keyed by
/// [`tokio::task::Id`]. Only meaningful when called from within a Tokio
/// task; see [`TaskStore::current_task_panic_message`].
#[cfg(feature = "tokio")]
pub struct TaskStore<R>(DashMap<tokio::task::Id, Arc<R>>);

#[cfg(feature = "tokio")]
impl<R> TaskStore<R> {
    pub fn new() -> Self {
        Self(DashMap::new())
    }

    fn current_task_panic_message() -> &'static str {
        "Scope::Versatile requires a current Tokio task (use Handle::block_on or run within a tokio::task)"
    }
}

#[cfg(feature = "tokio")]
impl<R> Default for TaskStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tokio")]
impl<R: Send + Sync> ContextStore<R> for TaskStore<R> {
    fn get(&self) -> Option<Arc<R>> {
        let id = tokio::task::try_id().expect(Self::current_task_panic_message());
        self.0.get(&id).map(|e| e.clone())
    }

    fn set(&self, value: Arc<R>) {
        let id = tokio::task::try_id().expect(Self::current_task_panic_message());
        self.0.insert(id, value);
    }

    fn clear(&self) -> Option<Arc<R>> {
        let id = tokio::task::try_id().expect(Self::current_task_panic_message());
        self.0.remove(&id).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_store_is_visible_across_threads() {
        let store: Arc<SharedStore<u32>> = Arc::new(SharedStore::new());
        store.set(Arc::new(42));
        let store2 = store.clone();
        let seen = std::thread::spawn(move || store2.get()).join().unwrap();
        assert_eq!(seen.map(|a| *a), Some(42));
    }

    #[test]
    fn thread_store_is_per_thread() {
        let store: Arc<ThreadStore<u32>> = Arc::new(ThreadStore::new());
        store.set(Arc::new(1));
        assert_eq!(store.get().map(|a| *a), Some(1));

        let store2 = store.clone();
        let seen_elsewhere = std::thread::spawn(move || store2.get()).join().unwrap();
        assert_eq!(seen_elsewhere, None, "another thread must not see this thread's slot");

        assert_eq!(store.get().map(|a| *a), Some(1));
    }

    #[test]
    fn thread_store_clear_removes_only_current_thread() {
        let store: Arc<ThreadStore<u32>> = Arc::new(ThreadStore::new());
        store.set(Arc::new(7));
        assert_eq!(store.clear().map(|a| *a), Some(7));
        assert_eq!(store.get(), None);
    }
}
