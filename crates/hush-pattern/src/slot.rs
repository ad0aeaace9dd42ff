//! The single process-wide compilation point.
//!
//! Every pattern compilation in the host goes through one [`PatternSlot`].
//! By default the slot forwards to the original (native) compiler. Installing
//! the cache swaps the active compiler for a [`CachingCompiler`] wrapping
//! that original; disabling swaps the original back and drops every cached
//! entry. Only one cache can be installed at a time, and the presence of an
//! installed cache is the guard.
//!
//! The slot keeps the original compiler's contract visible:
//! [`construct`](PatternSlot::construct) goes through the active compiler,
//! [`call`](PatternSlot::call) (the non-constructor convention) always goes
//! to the unwrapped original, [`name`](PatternCompiler::name) is mirrored from
//! the original, and patterns from either path are the same
//! [`CompiledPattern`] type for [`is_compiled_pattern`].

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use hush_core::stats::Stats;

use crate::cache::{CachingCompiler, PatternCacheStats};
use crate::compiler::{NativeCompiler, PatternCompiler, PatternError};
use crate::engine::EngineFamily;
use crate::pattern::CompiledPattern;

const TARGET: &str = "hush.pattern";

/// Result of [`PatternSlot::install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The cache is now active.
    Installed,
    /// A cache was already active; nothing changed.
    AlreadyInstalled,
    /// The engine guard refused; the slot stays a pass-through.
    Refused(EngineFamily),
}

/// Holder of the active pattern compiler.
pub struct PatternSlot {
    original: Rc<dyn PatternCompiler>,
    installed: RefCell<Option<Rc<CachingCompiler>>>,
    stats: Rc<Stats>,
}

impl std::fmt::Debug for PatternSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternSlot")
            .field("original", &self.original.name())
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl PatternSlot {
    /// Slot forwarding to `original` until a cache is installed.
    #[must_use]
    pub fn new(original: Rc<dyn PatternCompiler>, stats: Rc<Stats>) -> Self {
        Self {
            original,
            installed: RefCell::new(None),
            stats,
        }
    }

    /// Slot over the [`NativeCompiler`].
    #[must_use]
    pub fn native(stats: Rc<Stats>) -> Self {
        Self::new(Rc::new(NativeCompiler), stats)
    }

    /// Install a cache of `capacity` entries, unless `engine` cannot take the
    /// substitution or a cache is already installed.
    pub fn install(&self, capacity: usize, engine: EngineFamily) -> InstallOutcome {
        if !engine.supports_compiler_substitution() {
            tracing::warn!(
                target: TARGET,
                engine = %engine,
                "pattern cache skipped: compiler substitution unsafe on this engine"
            );
            return InstallOutcome::Refused(engine);
        }

        let mut installed = self.installed.borrow_mut();
        if installed.is_some() {
            return InstallOutcome::AlreadyInstalled;
        }
        let caching = CachingCompiler::new(Rc::clone(&self.original), capacity)
            .with_stats(Rc::clone(&self.stats));
        *installed = Some(Rc::new(caching));
        tracing::info!(target: TARGET, capacity, engine = %engine, "pattern cache installed");
        InstallOutcome::Installed
    }

    /// Restore the original compiler and drop every cached pattern.
    ///
    /// Returns whether a cache was installed. Calling it again is a no-op.
    pub fn disable(&self) -> bool {
        let Some(caching) = self.installed.borrow_mut().take() else {
            return false;
        };
        let dropped = caching.len();
        caching.clear();
        tracing::info!(target: TARGET, dropped, "pattern cache disabled");
        true
    }

    /// Whether a cache is installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.borrow().is_some()
    }

    /// Compile through the active compiler (cached when installed).
    pub fn construct(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        let active = self.installed.borrow().clone();
        match active {
            Some(caching) => caching.compile(source, flags),
            None => self.original.compile(source, flags),
        }
    }

    /// Compile through the unwrapped original, bypassing the cache.
    pub fn call(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        self.original.compile(source, flags)
    }

    /// The unwrapped original compiler.
    #[must_use]
    pub fn original(&self) -> &Rc<dyn PatternCompiler> {
        &self.original
    }

    /// Statistics of the installed cache, if any.
    #[must_use]
    pub fn cache_stats(&self) -> Option<PatternCacheStats> {
        self.installed.borrow().as_ref().map(|c| c.stats())
    }
}

impl PatternCompiler for PatternSlot {
    fn compile(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        self.construct(source, flags)
    }

    fn name(&self) -> &'static str {
        self.original.name()
    }
}

/// Whether `value` is a compiled pattern, whichever compiler produced it.
#[must_use]
pub fn is_compiled_pattern(value: &dyn Any) -> bool {
    value.is::<CompiledPattern>() || value.is::<Rc<CompiledPattern>>()
}
