//! Bounded cache of compiled patterns.
//!
//! [`PatternCache`] maps an exact `(source, flags)` pair to one shared
//! [`CompiledPattern`]. Two lookups of the same pair return the *same*
//! object (`Rc::ptr_eq`), never an equivalent copy, because callers observe
//! each other through the shared cursor.
//!
//! # Eviction
//!
//! Eviction is strictly by insertion order: when full, the oldest-inserted
//! entry goes, however often it was hit. A hit only rewinds the cursor; it
//! does not move the entry in the queue.
//!
//! # Cursor reset
//!
//! Every object handed out has its cursor at zero, including on a hit, so a
//! caller that left a global pattern mid-scan cannot make the next caller
//! skip matches.
//!
//! [`CachingCompiler`] wraps any [`PatternCompiler`] with a cache and is what
//! [`PatternSlot`](crate::slot::PatternSlot) installs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use hush_core::stats::Stats;
use rustc_hash::FxHashMap;

use crate::compiler::{PatternCompiler, PatternError};
use crate::pattern::CompiledPattern;

const TARGET: &str = "hush.pattern";

/// Statistics about pattern cache performance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternCacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Maximum number of entries.
    pub capacity: usize,
    /// Total cache hits since creation or last reset.
    pub hits: u64,
    /// Total cache misses since creation or last reset.
    pub misses: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Insertion-ordered, bounded map of shared compiled patterns.
#[derive(Debug)]
pub struct PatternCache {
    /// flags -> source -> pattern; nested so lookups borrow `&str` keys.
    entries: FxHashMap<String, FxHashMap<String, Rc<CompiledPattern>>>,
    /// `(flags, source)` oldest first.
    order: VecDeque<(String, String)>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    /// Runtime-wide counters fed alongside the local ones.
    shared: Option<Rc<Stats>>,
}

impl PatternCache {
    /// Create a cache holding at most `capacity` patterns (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
            shared: None,
        }
    }

    /// Also count hits and misses into shared runtime counters.
    #[must_use]
    pub fn with_stats(mut self, stats: Rc<Stats>) -> Self {
        self.shared = Some(stats);
        self
    }

    /// Return the cached pattern for `(source, flags)` or compile, insert and
    /// return a new one. The returned object's cursor is always zero.
    ///
    /// Compilation errors are returned as-is and nothing is cached.
    pub fn get_or_compile<F>(
        &mut self,
        source: &str,
        flags: &str,
        compile: F,
    ) -> Result<Rc<CompiledPattern>, PatternError>
    where
        F: FnOnce() -> Result<Rc<CompiledPattern>, PatternError>,
    {
        if let Some(pattern) = self.peek(source, flags).cloned() {
            self.hits += 1;
            if let Some(shared) = &self.shared {
                shared.record_cache_hit();
            }
            pattern.reset_cursor();
            tracing::trace!(target: TARGET, source, flags, "pattern cache hit");
            return Ok(pattern);
        }

        self.misses += 1;
        if let Some(shared) = &self.shared {
            shared.record_cache_miss();
        }
        tracing::trace!(target: TARGET, source, flags, "pattern cache miss");
        let pattern = compile()?;
        pattern.reset_cursor();

        if self.order.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries
            .entry(flags.to_owned())
            .or_default()
            .insert(source.to_owned(), Rc::clone(&pattern));
        self.order.push_back((flags.to_owned(), source.to_owned()));
        Ok(pattern)
    }

    /// Look up without counting, rewinding, or compiling.
    #[must_use]
    pub fn peek(&self, source: &str, flags: &str) -> Option<&Rc<CompiledPattern>> {
        self.entries.get(flags)?.get(source)
    }

    /// Whether `(source, flags)` is cached.
    #[must_use]
    pub fn contains(&self, source: &str, flags: &str) -> bool {
        self.peek(source, flags).is_some()
    }

    /// Cached keys as `(source, flags)`, oldest first.
    #[must_use]
    pub fn keys(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .map(|(flags, source)| (source.clone(), flags.clone()))
            .collect()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Reset statistics counters to zero.
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> PatternCacheStats {
        let total = self.hits + self.misses;
        PatternCacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_oldest(&mut self) {
        let Some((flags, source)) = self.order.pop_front() else {
            return;
        };
        if let Some(by_source) = self.entries.get_mut(&flags) {
            by_source.remove(&source);
            if by_source.is_empty() {
                self.entries.remove(&flags);
            }
        }
        self.evictions += 1;
        tracing::debug!(target: TARGET, source = %source, flags = %flags, "evicted oldest pattern");
    }
}

impl Default for PatternCache {
    /// Creates a cache with the default capacity of 500 entries.
    fn default() -> Self {
        Self::new(500)
    }
}

// ---------------------------------------------------------------------------
// Caching decorator
// ---------------------------------------------------------------------------

/// A [`PatternCompiler`] that serves repeated requests from a
/// [`PatternCache`] and delegates misses to the wrapped compiler.
pub struct CachingCompiler {
    inner: Rc<dyn PatternCompiler>,
    cache: RefCell<PatternCache>,
}

impl std::fmt::Debug for CachingCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingCompiler")
            .field("inner", &self.inner.name())
            .field("cache", &self.cache)
            .finish()
    }
}

impl CachingCompiler {
    /// Wrap `inner` with a cache of `capacity` entries.
    #[must_use]
    pub fn new(inner: Rc<dyn PatternCompiler>, capacity: usize) -> Self {
        Self {
            inner,
            cache: RefCell::new(PatternCache::new(capacity)),
        }
    }

    /// Also report hits and misses into shared counters.
    #[must_use]
    pub fn with_stats(mut self, stats: Rc<Stats>) -> Self {
        self.cache.get_mut().shared = Some(stats);
        self
    }

    /// The wrapped compiler.
    #[must_use]
    pub fn inner(&self) -> &Rc<dyn PatternCompiler> {
        &self.inner
    }

    /// Current cache statistics.
    #[must_use]
    pub fn stats(&self) -> PatternCacheStats {
        self.cache.borrow().stats()
    }

    /// Number of cached patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// Drop every cached pattern.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl PatternCompiler for CachingCompiler {
    fn compile(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        self.cache
            .borrow_mut()
            .get_or_compile(source, flags, || self.inner.compile(source, flags))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
