#![forbid(unsafe_code)]

//! hush public facade crate.
//!
//! Re-exports the stable surface of the internal crates and offers a small
//! prelude. Hosts implement [`Host`] over their UI, build a [`Hush`] once at
//! startup, and forward lifecycle signals, watcher callbacks, surface
//! messages, elapsed time and frame boundaries to it.

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use hush_core::config::{
    EmbedPolicyConfig, PatternPolicyConfig, ScrollPolicyConfig, StreamingPolicyConfig,
};
pub use hush_core::{
    CodeBlock, ConfigError, EmbedHost, GenerationKind, Host, HostError, HushConfig,
    LifecycleSignal, MemorySettingsStore, MessageHost, MessageId, NodeId, ScrollHost,
    ScrollMetrics, SettingKey, Settings, SettingsStore, Stats, StatsSnapshot, SurfaceId,
    SurfaceSpec, SuspensionCoordinator, SuspensionToken, TimerQueue, Visibility,
};

// --- Pattern re-exports ----------------------------------------------------

pub use hush_pattern::{
    CachingCompiler, CompiledPattern, EngineFamily, InstallOutcome, NativeCompiler,
    PatternCacheStats, PatternCompiler, PatternError, PatternFlags, PatternMatch, PatternSlot,
    is_compiled_pattern,
};

// --- Embed re-exports ------------------------------------------------------

pub use hush_embed::{EmbedManager, SurfaceMessage, iframe_markup};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use hush_runtime::{Hush, HushOptions, InitError, Phase};

#[cfg(feature = "test-helpers")]
pub use hush_core::testing;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for hush hosts.
#[derive(Debug)]
pub enum Error {
    /// Loading or validating configuration failed.
    Config(ConfigError),
    /// A pattern failed to compile.
    Pattern(PatternError),
    /// A host request failed.
    Host(HostError),
    /// The runtime could not start.
    #[cfg(feature = "runtime")]
    Init(InitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Pattern(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Init(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Pattern(err) => Some(err),
            Self::Host(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Init(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

#[cfg(feature = "runtime")]
impl From<InitError> for Error {
    fn from(err: InitError) -> Self {
        Self::Init(err)
    }
}

/// Standard result type for hush APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    //! Everything a host adapter usually needs.

    pub use crate::{
        EmbedHost, Error, GenerationKind, Host, HostError, HushConfig, LifecycleSignal,
        MessageHost, MessageId, NodeId, Result, ScrollHost, ScrollMetrics, SettingKey, Settings,
        SurfaceId, SurfaceSpec, Visibility,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{Hush, HushOptions};
}
