//! # Proxy Pattern Pool
//!
//! A generic, thread-safe resource pool paired with a context-binding proxy
//! layer. Pools manage arbitrary `R: Send + Sync + 'static` resources behind
//! a bounded (or unbounded) capacity gate, with idle eviction, long-use
//! detection, periodic health checks, and use-count-based recycling handled
//! by a background housekeeper. The proxy layer lets callers bind a single
//! logical resource to the lifetime of a thread, a task, or the whole
//! process, materializing it lazily from the pool on first access.
//!
//! See `SPEC_FULL.md` for the full module-by-module contract and `DESIGN.md`
//! for how each piece is grounded.

pub mod config;
pub mod error;
pub mod guard;
pub mod pool;
pub mod proxy;
mod registry;
mod semaphore;
pub mod stats;
pub mod store;

pub use config::{Factory, HealthHook, PoolOptions, PoolOptionsBuilder, SideEffectHook, StatsHook, TracerHook};
pub use error::{Error, Result};
pub use guard::ScopedResource;
pub use pool::Pool;
pub use proxy::{Proxy, Scope, ScopedProxy};
pub use stats::{PoolStats, Rendering, ResourceDetail};
pub use store::{ContextStore, SharedStore, ThreadStore};

#[cfg(feature = "tokio")]
pub use store::TaskStore;
