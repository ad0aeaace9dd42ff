#![forbid(unsafe_code)]

//! Core: shared vocabulary for the hush streaming performance layer.
//!
//! # Role in hush
//! `hush-core` owns the types every other crate speaks in: the
//! user-facing [`Settings`](settings::Settings), the tunable
//! [`HushConfig`](config::HushConfig), the [`LifecycleSignal`](signal::LifecycleSignal)
//! stream fed by the host application, shared [`Stats`](stats::Stats)
//! counters, the reference-counted [`SuspensionCoordinator`](suspension::SuspensionCoordinator),
//! a deterministic host-driven [`TimerQueue`](clock::TimerQueue), and the
//! host collaborator traits in [`host`].
//!
//! # How it fits in the system
//! The pattern cache (`hush-pattern`) and embed manager (`hush-embed`) depend
//! only on this crate. `hush-runtime` composes them around the streaming phase
//! controller and drives deferred work from host frame/time ticks.

pub mod clock;
pub mod config;
pub mod host;
pub mod settings;
pub mod signal;
pub mod stats;
pub mod suspension;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use clock::{DeterministicClock, TimerId, TimerQueue};
pub use config::{ConfigError, HushConfig};
pub use host::{
    CodeBlock, EmbedHost, Host, HostError, MessageHost, MessageId, NodeId, ScrollHost,
    ScrollMetrics, SurfaceId, SurfaceSpec,
};
pub use settings::{MemorySettingsStore, SettingKey, Settings, SettingsStore};
pub use signal::{GenerationKind, LifecycleSignal, Visibility};
pub use stats::{Stats, StatsSnapshot};
pub use suspension::{SuspensionCoordinator, SuspensionToken};
