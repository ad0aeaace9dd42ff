//! The pattern-compilation capability.

use std::rc::Rc;

use crate::pattern::CompiledPattern;

/// Errors from compiling a pattern.
#[derive(Debug)]
pub enum PatternError {
    /// A flag character that is not one of `dgimsuvy`.
    UnknownFlag(char),
    /// A flag given more than once.
    DuplicateFlag(char),
    /// `u` and `v` together.
    ConflictingFlags,
    /// The pattern source does not parse.
    Syntax(regex_lite::Error),
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFlag(c) => write!(f, "invalid flag '{c}'"),
            Self::DuplicateFlag(c) => write!(f, "duplicate flag '{c}'"),
            Self::ConflictingFlags => write!(f, "flags 'u' and 'v' are mutually exclusive"),
            Self::Syntax(e) => write!(f, "invalid pattern: {e}"),
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(e) => Some(e),
            _ => None,
        }
    }
}

/// Anything that can turn `(source, flags)` into a shared compiled pattern.
///
/// Implementations take `&self` so one compiler can be shared by every
/// caller; stateful implementations use interior mutability.
pub trait PatternCompiler {
    /// Compile `source` with the exact flag string `flags`.
    fn compile(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError>;

    /// Name reported to introspection (mirrors the native compiler's name).
    fn name(&self) -> &'static str {
        "RegExp"
    }
}

/// The unwrapped compiler: every call compiles a fresh object.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCompiler;

impl PatternCompiler for NativeCompiler {
    fn compile(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        CompiledPattern::new(source, flags).map(Rc::new)
    }
}
