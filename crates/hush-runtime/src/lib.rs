#![forbid(unsafe_code)]

//! The hush runtime.
//!
//! [`Hush`] owns the host adapter and every component, routes
//! [`LifecycleSignal`]s to them, and runs deferred work when the host
//! reports elapsed time ([`Hush::advance`]) or a rendering frame
//! ([`Hush::frame`]). Nothing here blocks or spawns.
//!
//! Initialization fails closed: [`Hush::new`] never errors. If setup fails
//! it logs the cause and returns a passive runtime that ignores every
//! signal and leaves pattern compilation as a plain pass-through, so the
//! host keeps working without any of the optimizations.
//!
//! ```ignore
//! let mut hush = Hush::new(host, HushOptions::default());
//! hush.dispatch(LifecycleSignal::GenerationStarted { kind: GenerationKind::Normal });
//! hush.dispatch(LifecycleSignal::StreamTokenReceived);
//! hush.dispatch(LifecycleSignal::GenerationEnded);
//! hush.advance(Duration::from_millis(100)); // one reapplication pass
//! ```

pub mod controller;
pub mod error;
pub mod scroll_anchor;

use std::rc::Rc;
use std::time::Duration;

use hush_core::{
    Host, HushConfig, LifecycleSignal, NodeId, SettingKey, Settings, SettingsStore, Stats,
    StatsSnapshot, SurfaceId, SuspensionCoordinator, TimerQueue, Visibility,
};
use hush_embed::EmbedManager;
use hush_pattern::{
    CompiledPattern, EngineFamily, InstallOutcome, PatternError, PatternSlot,
};

pub use controller::{Phase, StreamingController};
pub use error::InitError;
pub use scroll_anchor::ScrollAnchor;

const TARGET: &str = "hush.runtime";

/// Everything needed to start a runtime besides the host.
#[derive(Debug, Clone, Default)]
pub struct HushOptions {
    /// Tunables; validated on start.
    pub config: HushConfig,
    /// Initial toggles.
    pub settings: Settings,
    /// Host user agent, for the pattern cache's engine guard. `None` means
    /// a non-browser host.
    pub user_agent: Option<String>,
}

impl HushOptions {
    /// Options from the host's raw sources: a TOML config document and the
    /// stored settings JSON. Missing settings keys take their defaults.
    pub fn from_sources(config_toml: Option<&str>, settings_json: Option<&str>) -> error::Result<Self> {
        let config = match config_toml {
            Some(text) => HushConfig::from_toml_str(text)?,
            None => HushConfig::default(),
        };
        let settings = match settings_json {
            Some(text) => {
                let value: serde_json::Value = serde_json::from_str(text)?;
                Settings::merge_defaults(Some(&value)).settings
            }
            None => Settings::default(),
        };
        Ok(Self {
            config,
            settings,
            user_agent: None,
        })
    }

    /// Set the user agent used by the engine guard.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Work waiting on time or frames.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    Reapply,
    RestoreScroll { distance: f64 },
}

/// The runtime. Single-threaded; the host drives it.
pub struct Hush<H: Host> {
    host: H,
    settings: Settings,
    config: HushConfig,
    engine: EngineFamily,
    stats: Rc<Stats>,
    suspension: SuspensionCoordinator,
    patterns: Rc<PatternSlot>,
    controller: StreamingController,
    embeds: EmbedManager,
    anchor: ScrollAnchor,
    timers: TimerQueue<Deferred>,
    active: bool,
}

impl<H: Host> std::fmt::Debug for Hush<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hush")
            .field("active", &self.active)
            .field("engine", &self.engine)
            .field("settings", &self.settings)
            .field("phase", &self.controller.phase())
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}

impl<H: Host> Hush<H> {
    /// Start a runtime, or fall back to a passive one if setup fails.
    pub fn new(host: H, options: HushOptions) -> Self {
        match options.config.clone().validated() {
            Ok(config) => Self::start(host, HushOptions { config, ..options }),
            Err(err) => {
                tracing::warn!(target: TARGET, error = %InitError::from(err), "hush disabled: initialization failed");
                Self::passive(host)
            }
        }
    }

    /// Start a runtime, reporting setup failures.
    pub fn try_new(host: H, options: HushOptions) -> error::Result<Self> {
        let config = options.config.clone().validated()?;
        Ok(Self::start(host, HushOptions { config, ..options }))
    }

    /// Start from a settings store. Missing keys are backfilled and saved.
    pub fn from_store(host: H, config: HushConfig, store: &mut dyn SettingsStore, user_agent: Option<String>) -> Self {
        let settings = Settings::load(store);
        Self::new(
            host,
            HushOptions {
                config,
                settings,
                user_agent,
            },
        )
    }

    /// A runtime that does nothing: no signal handling, no cache, no embeds.
    pub fn passive(host: H) -> Self {
        let stats = Rc::new(Stats::new());
        let suspension = SuspensionCoordinator::new();
        let config = HushConfig::default();
        Self {
            host,
            settings: Settings::default(),
            engine: EngineFamily::Unknown,
            patterns: Rc::new(PatternSlot::native(Rc::clone(&stats))),
            controller: StreamingController::new(suspension.clone(), Rc::clone(&stats)),
            embeds: EmbedManager::new(&config.embed, Rc::clone(&stats)).with_enabled(false),
            anchor: ScrollAnchor::new(Rc::clone(&stats)),
            timers: TimerQueue::new(),
            config,
            stats,
            suspension,
            active: false,
        }
    }

    fn start(mut host: H, options: HushOptions) -> Self {
        let HushOptions {
            config,
            settings,
            user_agent,
        } = options;
        let engine = user_agent
            .as_deref()
            .map_or(EngineFamily::Unknown, EngineFamily::from_user_agent);
        let stats = Rc::new(Stats::new());
        let suspension = SuspensionCoordinator::new();

        let patterns = Rc::new(PatternSlot::native(Rc::clone(&stats)));
        if settings.cache_patterns {
            patterns.install(config.patterns.capacity, engine);
        }

        let mut embeds = EmbedManager::new(&config.embed, Rc::clone(&stats))
            .with_enabled(settings.lazy_embed_rendering);
        embeds.scan_all(&mut host);
        host.set_blur_suppressed(settings.suppress_blur_globally);

        tracing::info!(
            target: TARGET,
            engine = %engine,
            pattern_cache = patterns.is_installed(),
            lazy_embeds = settings.lazy_embed_rendering,
            "hush initialized"
        );

        Self {
            host,
            settings,
            engine,
            patterns,
            controller: StreamingController::new(suspension.clone(), Rc::clone(&stats)),
            embeds,
            anchor: ScrollAnchor::new(Rc::clone(&stats)),
            timers: TimerQueue::new(),
            config,
            stats,
            suspension,
            active: true,
        }
    }

    // -----------------------------------------------------------------------
    // Signals
    // -----------------------------------------------------------------------

    /// Route one lifecycle signal.
    pub fn dispatch(&mut self, signal: LifecycleSignal) {
        if !self.active {
            return;
        }
        tracing::trace!(target: TARGET, signal = signal.name(), "signal");
        match signal {
            LifecycleSignal::GenerationStarted { kind } => {
                self.controller.on_generation_started(&kind, &self.settings);
            }
            LifecycleSignal::StreamTokenReceived => {
                self.controller.on_stream_token(&mut self.host, &self.settings);
            }
            LifecycleSignal::GenerationEnded | LifecycleSignal::GenerationStopped => {
                if self.controller.on_generation_finished(&mut self.host) {
                    self.timers
                        .after(self.config.streaming.reapply_delay(), Deferred::Reapply);
                }
            }
            LifecycleSignal::MessageRendered { message } => {
                self.embeds.on_message_rendered(&mut self.host, message);
            }
            LifecycleSignal::MessageUpdated { message } | LifecycleSignal::MessageSwiped { message } => {
                self.embeds.on_message_replaced(&mut self.host, message);
                self.host.emit_message_rendered(message);
            }
            LifecycleSignal::MoreMessagesLoaded => {
                self.embeds.on_more_loaded(&mut self.host);
            }
            LifecycleSignal::ConversationChanged => {
                self.embeds.on_conversation_changed(&mut self.host);
            }
            LifecycleSignal::VisibilityChanged { visibility } => self.on_visibility(visibility),
            LifecycleSignal::SettingsChanged { key, enabled } => self.apply_setting(key, enabled),
        }
    }

    /// Decode and route a signal from the host bridge's JSON form.
    pub fn dispatch_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let signal = LifecycleSignal::from_json(json)?;
        self.dispatch(signal);
        Ok(())
    }

    fn on_visibility(&mut self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden => {
                if self.settings.preserve_scroll {
                    self.anchor.on_hidden(&self.host);
                }
            }
            Visibility::Visible => {
                let Some(distance) = self.anchor.on_visible() else {
                    return;
                };
                if self.settings.preserve_scroll {
                    self.timers.after_frames(
                        self.config.scroll.settle_frames,
                        Deferred::RestoreScroll { distance },
                    );
                }
            }
        }
    }

    /// Viewport watcher callback for an embed placeholder.
    pub fn on_intersection(&mut self, placeholder: NodeId, visible: bool) {
        if self.active {
            self.embeds.on_intersection(&mut self.host, placeholder, visible);
        }
    }

    /// A sandboxed surface posted `payload`. Returns whether a height was
    /// applied.
    pub fn on_surface_message(&mut self, source: SurfaceId, payload: &str) -> bool {
        self.active && self.embeds.on_surface_message(&mut self.host, source, payload)
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance host time by `dt` and run whatever became due.
    pub fn advance(&mut self, dt: Duration) {
        let due = self.timers.advance(dt);
        self.run(due);
    }

    /// A rendering frame boundary passed.
    pub fn frame(&mut self) {
        let due = self.timers.frame();
        self.run(due);
    }

    /// Number of deferred tasks still waiting.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.timers.len()
    }

    fn run(&mut self, tasks: Vec<Deferred>) {
        for task in tasks {
            match task {
                Deferred::Reapply => {
                    self.controller.reapply(&mut self.host);
                }
                Deferred::RestoreScroll { distance } => {
                    self.anchor.restore(&mut self.host, distance);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Change one toggle at runtime.
    pub fn apply_setting(&mut self, key: SettingKey, enabled: bool) {
        if self.settings.get(key) == enabled {
            return;
        }
        self.settings.set(key, enabled);
        tracing::debug!(target: TARGET, setting = key.as_str(), enabled, "setting changed");
        match key {
            SettingKey::CachePatterns => {
                if enabled {
                    self.install_pattern_cache();
                } else {
                    self.patterns.disable();
                }
            }
            SettingKey::LazyEmbedRendering => self.embeds.set_enabled(&mut self.host, enabled),
            SettingKey::SuppressBlurGlobally => self.host.set_blur_suppressed(enabled),
            SettingKey::DeferDuringStreaming
            | SettingKey::ReduceEffectsDuringStreaming
            | SettingKey::PreserveScroll => {}
        }
    }

    /// Change one toggle and persist it.
    pub fn persist_setting(&mut self, key: SettingKey, enabled: bool, store: &mut dyn SettingsStore) {
        self.apply_setting(key, enabled);
        self.settings.persist(key, enabled, store);
    }

    fn install_pattern_cache(&self) -> InstallOutcome {
        self.patterns.install(self.config.patterns.capacity, self.engine)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Compile a pattern through the process-wide slot.
    pub fn compile(&self, source: &str, flags: &str) -> Result<Rc<CompiledPattern>, PatternError> {
        self.patterns.construct(source, flags)
    }

    /// The process-wide pattern slot, for the host's compilation hook.
    #[must_use]
    pub fn patterns(&self) -> &Rc<PatternSlot> {
        &self.patterns
    }

    /// The suspension coordinator the host's transform pipeline consults.
    #[must_use]
    pub fn suspension(&self) -> &SuspensionCoordinator {
        &self.suspension
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero every counter.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validated tunables.
    #[must_use]
    pub const fn config(&self) -> &HushConfig {
        &self.config
    }

    /// Engine family detected from the user agent.
    #[must_use]
    pub const fn engine(&self) -> EngineFamily {
        self.engine
    }

    /// `false` for a passive runtime.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Streaming controller phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// The embed manager, for inspection.
    #[must_use]
    pub fn embeds(&self) -> &EmbedManager {
        &self.embeds
    }

    /// The host adapter.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// The host adapter, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Undo everything: release any suspension, restore effects, uninstall
    /// the pattern cache, destroy surfaces, drop pending work. The runtime
    /// is passive afterwards.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.controller.on_generation_finished(&mut self.host);
        self.timers.clear();
        self.anchor.clear();
        self.patterns.disable();
        self.embeds.teardown_all(&mut self.host);
        self.active = false;
        tracing::info!(target: TARGET, "hush shut down");
    }

    /// Shut down and hand the host back.
    pub fn into_host(mut self) -> H {
        self.shutdown();
        self.host
    }
}
