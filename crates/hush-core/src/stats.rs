//! Observational counters.
//!
//! One [`Stats`] instance is shared (behind an `Rc`) by every component of a
//! hush runtime. Counters only ever increase within a session; they carry no
//! invariants beyond that and never influence behavior.

use std::cell::Cell;

/// Shared monotonic counters.
#[derive(Debug, Default)]
pub struct Stats {
    deferred_generations: Cell<u64>,
    cache_hits: Cell<u64>,
    cache_misses: Cell<u64>,
    embeds_created: Cell<u64>,
    embeds_destroyed: Cell<u64>,
    scroll_restores: Cell<u64>,
    reapply_passes: Cell<u64>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get().saturating_add(1));
}

impl Stats {
    /// Fresh counters, all zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A generation ran with transforms deferred.
    pub fn record_deferred_generation(&self) {
        bump(&self.deferred_generations);
    }

    /// A pattern was served from the cache.
    pub fn record_cache_hit(&self) {
        bump(&self.cache_hits);
    }

    /// A pattern had to be compiled.
    pub fn record_cache_miss(&self) {
        bump(&self.cache_misses);
    }

    /// A sandboxed surface was mounted.
    pub fn record_embed_created(&self) {
        bump(&self.embeds_created);
    }

    /// A sandboxed surface was unmounted.
    pub fn record_embed_destroyed(&self) {
        bump(&self.embeds_destroyed);
    }

    /// A scroll position was restored after the page came back.
    pub fn record_scroll_restore(&self) {
        bump(&self.scroll_restores);
    }

    /// The post-stream reapplication pass ran.
    pub fn record_reapply_pass(&self) {
        bump(&self.reapply_passes);
    }

    /// Zero every counter. Only for explicit user action.
    pub fn reset(&self) {
        for counter in [
            &self.deferred_generations,
            &self.cache_hits,
            &self.cache_misses,
            &self.embeds_created,
            &self.embeds_destroyed,
            &self.scroll_restores,
            &self.reapply_passes,
        ] {
            counter.set(0);
        }
    }

    /// Copy the current values out.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            deferred_generations: self.deferred_generations.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            embeds_created: self.embeds_created.get(),
            embeds_destroyed: self.embeds_destroyed.get(),
            scroll_restores: self.scroll_restores.get(),
            reapply_passes: self.reapply_passes.get(),
        }
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Generations during which transforms were deferred.
    pub deferred_generations: u64,
    /// Pattern cache hits.
    pub cache_hits: u64,
    /// Pattern cache misses.
    pub cache_misses: u64,
    /// Sandboxed surfaces created.
    pub embeds_created: u64,
    /// Sandboxed surfaces destroyed.
    pub embeds_destroyed: u64,
    /// Scroll anchors restored.
    pub scroll_restores: u64,
    /// Post-stream reapplication passes that ran.
    pub reapply_passes: u64,
}

impl StatsSnapshot {
    /// Cache hit rate in `0.0..=1.0`; `0.0` before any lookup.
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total > 0 {
            self.cache_hits as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Surfaces currently alive according to the counters.
    #[must_use]
    pub const fn embeds_live(&self) -> u64 {
        self.embeds_created.saturating_sub(self.embeds_destroyed)
    }

    /// Format as a JSONL line for host instrumentation.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"hush-stats-v1","deferred_generations":{},"cache_hits":{},"cache_misses":{},"cache_hit_rate":{:.4},"embeds_created":{},"embeds_destroyed":{},"scroll_restores":{},"reapply_passes":{}}}"#,
            self.deferred_generations,
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate(),
            self.embeds_created,
            self.embeds_destroyed,
            self.scroll_restores,
            self.reapply_passes,
        )
    }
}
