//! Pattern flag parsing.

use bitflags::bitflags;

use crate::compiler::PatternError;

bitflags! {
    /// Flags a pattern was compiled with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatternFlags: u8 {
        /// `d`: report match indices.
        const HAS_INDICES = 1 << 0;
        /// `g`: global; matching advances the shared cursor.
        const GLOBAL = 1 << 1;
        /// `i`: case-insensitive.
        const IGNORE_CASE = 1 << 2;
        /// `m`: `^`/`$` match at line boundaries.
        const MULTILINE = 1 << 3;
        /// `s`: `.` matches newlines.
        const DOT_ALL = 1 << 4;
        /// `u`: unicode mode.
        const UNICODE = 1 << 5;
        /// `v`: unicode sets mode.
        const UNICODE_SETS = 1 << 6;
        /// `y`: sticky; matches only at the cursor.
        const STICKY = 1 << 7;
    }
}

impl PatternFlags {
    /// Parse a flag string such as `"gi"`.
    ///
    /// Unknown and repeated flags are rejected, as are `u` and `v` together.
    pub fn parse(flags: &str) -> Result<Self, PatternError> {
        let mut parsed = Self::empty();
        for ch in flags.chars() {
            let flag = match ch {
                'd' => Self::HAS_INDICES,
                'g' => Self::GLOBAL,
                'i' => Self::IGNORE_CASE,
                'm' => Self::MULTILINE,
                's' => Self::DOT_ALL,
                'u' => Self::UNICODE,
                'v' => Self::UNICODE_SETS,
                'y' => Self::STICKY,
                other => return Err(PatternError::UnknownFlag(other)),
            };
            if parsed.contains(flag) {
                return Err(PatternError::DuplicateFlag(ch));
            }
            parsed |= flag;
        }
        if parsed.contains(Self::UNICODE | Self::UNICODE_SETS) {
            return Err(PatternError::ConflictingFlags);
        }
        Ok(parsed)
    }

    /// Whether matching reads and advances the shared cursor.
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        self.intersects(Self::GLOBAL.union(Self::STICKY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flags_in_any_order() {
        let f = PatternFlags::parse("yig").unwrap();
        assert!(f.contains(PatternFlags::GLOBAL | PatternFlags::IGNORE_CASE | PatternFlags::STICKY));
        assert!(f.is_stateful());
        assert_eq!(PatternFlags::parse("").unwrap(), PatternFlags::empty());
        assert!(!PatternFlags::parse("ims").unwrap().is_stateful());
    }

    #[test]
    fn rejects_bad_flag_strings() {
        assert!(matches!(
            PatternFlags::parse("gx"),
            Err(PatternError::UnknownFlag('x'))
        ));
        assert!(matches!(
            PatternFlags::parse("gig"),
            Err(PatternError::DuplicateFlag('g'))
        ));
        assert!(matches!(
            PatternFlags::parse("uv"),
            Err(PatternError::ConflictingFlags)
        ));
    }
}
