//! The JSON-shaped statistics snapshot returned by [`crate::Pool::stats`].
//! See `SPEC_FULL.md` §4.9.

use serde::Serialize;
use serde_json::Value;

/// How a single resource was rendered for the `avail`/`using` detail lists
/// in [`PoolStats`]: the `stats` hook's JSON value, the `tracer` hook's
/// string, or a default placeholder when neither is configured (or the hook
/// panicked).
#[derive(Debug, Clone)]
pub enum Rendering {
    /// Output of the `stats` hook.
    Json(Value),
    /// Output of the `tracer` hook.
    Tracer(String),
    /// Neither hook is configured, or the configured one panicked.
    Default,
}

impl Serialize for Rendering {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Rendering::Json(v) => v.serialize(serializer),
            Rendering::Tracer(s) => s.serialize(serializer),
            Rendering::Default => "<resource>".serialize(serializer),
        }
    }
}

/// Per-resource detail entry in [`PoolStats::avail`] / [`PoolStats::using`].
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDetail {
    /// The `stats`/`tracer` rendering, or a default placeholder. `Rendering`
    /// may serialize to a JSON object, a bare string, or a fixed default
    /// string depending on which hook (if any) produced it, so it is kept
    /// under its own key rather than flattened into this struct.
    pub rendering: Rendering,
    /// `UseInfo::uses` for this resource.
    pub uses: u64,
    /// Seconds elapsed since `last_get`, relative to the snapshot time.
    pub last_get_secs: f64,
    /// Seconds elapsed since `last_ret`, relative to the snapshot time.
    pub last_ret_secs: f64,
}

/// A JSON-serializable snapshot of a pool's configuration, instantaneous
/// counts, monotonic counters, and per-resource detail. See `SPEC_FULL.md`
/// §4.9 for the derivation of each field.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    // -- configuration --
    /// Configured `min_size`.
    pub min_size: usize,
    /// Configured `max_size` (0 = unbounded).
    pub max_size: usize,
    /// Configured default acquire timeout, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Configured `max_use` (0 = unlimited).
    pub max_use: u64,
    /// Configured idle-eviction threshold, in milliseconds (0 = never).
    pub max_avail_delay_ms: u64,
    /// Configured long-use warn threshold, in milliseconds (0 = never).
    pub max_using_delay_ms: u64,
    /// Configured long-use kill threshold, in milliseconds (0 = never).
    pub max_using_delay_kill_ms: u64,
    /// Configured housekeeping rounds between health sweeps.
    pub health_freq: u64,

    // -- instantaneous counts --
    /// Current size of `avail`.
    pub navail: usize,
    /// Current size of `using`.
    pub nusing: usize,
    /// Current size of `todel` (awaiting the next deferred-destroy pass).
    pub ntodel: usize,
    /// `|avail| + |using|`.
    pub nobjs: usize,
    /// Current capacity-gate permit count, `None` if unbounded.
    pub semaphore_value: Option<usize>,
    /// Initial capacity-gate permit count, `None` if unbounded.
    pub semaphore_initial: Option<usize>,

    // -- monotonic counters --
    /// In-flight + completed factory invocations started.
    pub ncreating: u64,
    /// Completed factory invocations.
    pub ncreated: u64,
    /// Total `get` calls that successfully lent a resource.
    pub nuses: u64,
    /// Total resources health-checked.
    pub nhealth: u64,
    /// Total resources retired by a `false` health result.
    pub bad_health: u64,
    /// Total internal `borrow` calls (health checks).
    pub nborrows: u64,
    /// Total internal `return` calls (health checks).
    pub nreturns: u64,
    /// Total resources killed for exceeding `max_using_delay_kill`.
    pub nkilled: u64,
    /// Total resources recycled for exceeding `max_avail_delay`.
    pub nrecycled: u64,
    /// Total resources retired for exceeding `max_use`.
    pub nwornout: u64,
    /// Total resources actually destroyed via `closer`.
    pub ndestroys: u64,
    /// Total housekeeping rounds completed.
    pub hk_rounds: u64,
    /// Total housekeeping rounds that panicked.
    pub hk_errors: u64,
    /// Total health-check sweeps completed.
    pub hc_rounds: u64,
    /// Total health-hook invocations that panicked.
    pub hc_errors: u64,

    // -- derived --
    /// `false` once [`crate::Pool::shutdown`] has been called.
    pub running: bool,
    /// Average housekeeping round duration, in milliseconds.
    pub time_per_hk_ms: f64,
    /// `hk_last - now` in seconds: non-positive, how long ago the last
    /// housekeeping round completed. `None` if the housekeeper has never
    /// run a round.
    pub rel_hk_last_secs: Option<f64>,

    // -- per-resource detail --
    /// One entry per resource currently in `avail`.
    pub avail: Vec<ResourceDetail>,
    /// One entry per resource currently in `using`.
    pub using: Vec<ResourceDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering_serializes_by_variant() {
        let json = serde_json::to_value(Rendering::Json(serde_json::json!({"ok": true}))).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true}));

        let tracer = serde_json::to_value(Rendering::Tracer("conn#3".to_string())).unwrap();
        assert_eq!(tracer, serde_json::json!("conn#3"));

        let default = serde_json::to_value(Rendering::Default).unwrap();
        assert_eq!(default, serde_json::json!("<resource>"));
    }
}
