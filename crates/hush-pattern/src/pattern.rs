//! Compiled pattern objects with a shared read cursor.
//!
//! A [`CompiledPattern`] is shared by reference between every caller that
//! compiled the same `(source, flags)` pair through the cache. Global (`g`)
//! and sticky (`y`) patterns keep a mutable `last_index` cursor, exactly like
//! the host's native pattern objects:
//!
//! - [`exec`](CompiledPattern::exec) starts searching at the cursor, moves it
//!   to the end of the match on success and back to zero on failure;
//! - sticky patterns only match when the match starts at the cursor;
//! - non-stateful patterns ignore and never touch the cursor.
//!
//! Because the cursor is shared, the cache resets it before handing the
//! object to a new caller.

use std::cell::Cell;
use std::ops::Range;

use regex_lite::{Regex, RegexBuilder};

use crate::compiler::PatternError;
use crate::flags::PatternFlags;

/// A successful match: overall span plus capture group spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Byte range of the whole match.
    pub span: Range<usize>,
    /// Byte ranges of capture groups `1..`, `None` for groups that did not
    /// participate.
    pub groups: Vec<Option<Range<usize>>>,
}

impl PatternMatch {
    /// Text of the whole match within `haystack`.
    #[must_use]
    pub fn as_str<'h>(&self, haystack: &'h str) -> &'h str {
        &haystack[self.span.clone()]
    }

    /// Text of capture group `index` (1-based) within `haystack`.
    #[must_use]
    pub fn group<'h>(&self, haystack: &'h str, index: usize) -> Option<&'h str> {
        let span = self.groups.get(index.checked_sub(1)?)?.clone()?;
        Some(&haystack[span])
    }
}

/// A compiled pattern.
#[derive(Debug)]
pub struct CompiledPattern {
    source: String,
    flag_string: String,
    flags: PatternFlags,
    regex: Regex,
    last_index: Cell<usize>,
}

impl CompiledPattern {
    /// Compile `source` with the exact flag string `flags`.
    pub fn new(source: &str, flags: &str) -> Result<Self, PatternError> {
        let parsed = PatternFlags::parse(flags)?;
        let regex = RegexBuilder::new(source)
            .case_insensitive(parsed.contains(PatternFlags::IGNORE_CASE))
            .multi_line(parsed.contains(PatternFlags::MULTILINE))
            .dot_matches_new_line(parsed.contains(PatternFlags::DOT_ALL))
            .build()
            .map_err(PatternError::Syntax)?;
        Ok(Self {
            source: source.to_owned(),
            flag_string: flags.to_owned(),
            flags: parsed,
            regex,
            last_index: Cell::new(0),
        })
    }

    /// The pattern source, as given.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The flag string, as given.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flag_string
    }

    /// The parsed flags.
    #[must_use]
    pub const fn flag_set(&self) -> PatternFlags {
        self.flags
    }

    /// Whether `g` is set, so matching advances the shared cursor.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.flags.contains(PatternFlags::GLOBAL)
    }

    /// Whether `y` is set, so matches must start at the cursor.
    #[must_use]
    pub const fn is_sticky(&self) -> bool {
        self.flags.contains(PatternFlags::STICKY)
    }

    /// Current cursor position (byte offset).
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.last_index.get()
    }

    /// Move the cursor.
    pub fn set_last_index(&self, index: usize) {
        self.last_index.set(index);
    }

    /// Move the cursor back to the start.
    pub fn reset_cursor(&self) {
        self.last_index.set(0);
    }

    /// Search `haystack`, honoring and updating the cursor for global and
    /// sticky patterns.
    pub fn exec(&self, haystack: &str) -> Option<PatternMatch> {
        let stateful = self.flags.is_stateful();
        let start = if stateful { self.last_index.get() } else { 0 };
        if start > haystack.len() || !haystack.is_char_boundary(start) {
            if stateful {
                self.last_index.set(0);
            }
            return None;
        }

        let found = self
            .regex
            .captures_at(haystack, start)
            .filter(|caps| !self.is_sticky() || caps.get(0).is_some_and(|m| m.start() == start));

        let Some(caps) = found else {
            if stateful {
                self.last_index.set(0);
            }
            return None;
        };

        let whole = caps.get(0)?;
        if stateful {
            self.last_index.set(whole.end());
        }
        Some(PatternMatch {
            span: whole.range(),
            groups: (1..caps.len())
                .map(|i| caps.get(i).map(|m| m.range()))
                .collect(),
        })
    }

    /// Whether `haystack` matches, with the same cursor semantics as
    /// [`exec`](Self::exec).
    pub fn test(&self, haystack: &str) -> bool {
        self.exec(haystack).is_some()
    }

    /// Every non-overlapping match from the start of `haystack`. Never reads
    /// or moves the cursor.
    #[must_use]
    pub fn find_iter(&self, haystack: &str) -> Vec<Range<usize>> {
        self.regex.find_iter(haystack).map(|m| m.range()).collect()
    }

    /// Replace every match (global) or the first match (otherwise) with
    /// `replacement`, expanding `$1`-style group references. Never reads or
    /// moves the cursor.
    #[must_use]
    pub fn replace(&self, haystack: &str, replacement: &str) -> String {
        if self.is_global() {
            self.regex.replace_all(haystack, replacement).into_owned()
        } else {
            self.regex.replace(haystack, replacement).into_owned()
        }
    }
}
