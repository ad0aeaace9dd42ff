#![forbid(unsafe_code)]

//! Compiled-pattern cache for hush.
//!
//! # Role in hush
//! Text transforms compile the same handful of patterns over and over while
//! a message streams. This crate puts a bounded cache between every caller
//! and the pattern compiler without callers having to change: all
//! compilation goes through one [`PatternSlot`], and installing the cache
//! swaps the slot's active compiler for a [`CachingCompiler`] decorator.
//!
//! # Key pieces
//! - [`CompiledPattern`]: a compiled pattern with a shared, mutable read
//!   cursor (`last_index`) for global and sticky matching.
//! - [`PatternCompiler`]: the `compile(source, flags)` capability.
//! - [`PatternCache`]: insertion-ordered (FIFO) bounded map of shared
//!   pattern objects.
//! - [`PatternSlot`]: the single install point, with an engine guard that
//!   keeps the cache out on hosts where substitution is unsafe.

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod flags;
pub mod pattern;
pub mod slot;

pub use cache::{CachingCompiler, PatternCache, PatternCacheStats};
pub use compiler::{NativeCompiler, PatternCompiler, PatternError};
pub use engine::EngineFamily;
pub use flags::PatternFlags;
pub use pattern::{CompiledPattern, PatternMatch};
pub use slot::{InstallOutcome, PatternSlot, is_compiled_pattern};
