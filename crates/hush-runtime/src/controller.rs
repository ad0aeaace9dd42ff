//! Streaming phase controller.
//!
//! ```text
//!            started             first token
//!   Idle ─────────────▶ Generating ─────────────▶ Deferring
//!    ▲                      │ ended/stopped           │ ended/stopped
//!    └──────────────────────┴─────────────────────────┘
//! ```
//!
//! While `Deferring` the controller holds a suspension token, so the host's
//! deferred transform pipeline is paused, and optionally the host's
//! reduced-effects mode is on. Leaving `Deferring` releases exactly that
//! token and undoes exactly what was turned on, then asks the caller to
//! schedule one reapplication pass. Holds taken by other actors are never
//! touched: if the pipeline was already suspended when the stream began it
//! stays suspended afterwards.

use std::rc::Rc;

use hush_core::{
    GenerationKind, HostError, MessageHost, MessageId, Settings, Stats, SuspensionCoordinator,
    SuspensionToken,
};

const TARGET: &str = "hush.controller";
const HOLDER: &str = "hush.streaming";

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No generation in flight.
    #[default]
    Idle,
    /// A generation started; no token has arrived yet.
    Generating,
    /// Tokens are streaming and transforms are deferred.
    Deferring,
}

/// Streaming phase state machine.
///
/// Holds a suspension token between the first streamed token and the end
/// of the generation, and turns the visual cost reduction on for the same
/// span.
#[derive(Debug)]
pub struct StreamingController {
    phase: Phase,
    first_token_seen: bool,
    token: Option<SuspensionToken>,
    was_already_suspended: bool,
    effects_reduced: bool,
    suspension: SuspensionCoordinator,
    stats: Rc<Stats>,
}

impl StreamingController {
    /// Idle controller taking its tokens from `suspension`.
    #[must_use]
    pub fn new(suspension: SuspensionCoordinator, stats: Rc<Stats>) -> Self {
        Self {
            phase: Phase::Idle,
            first_token_seen: false,
            token: None,
            was_already_suspended: false,
            effects_reduced: false,
            suspension,
            stats,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a foreground generation is in progress.
    #[must_use]
    pub const fn is_generating(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Whether this controller currently holds a suspension token.
    #[must_use]
    pub fn holds_suspension(&self) -> bool {
        self.token.as_ref().is_some_and(SuspensionToken::is_held)
    }

    /// Whether another actor had the pipeline suspended when the current
    /// (or last) deferral began.
    #[must_use]
    pub const fn was_already_suspended(&self) -> bool {
        self.was_already_suspended
    }

    /// A generation of `kind` started. Returns whether it was accepted.
    pub fn on_generation_started(&mut self, kind: &GenerationKind, settings: &Settings) -> bool {
        if !settings.defer_during_streaming || !kind.is_foreground() {
            tracing::trace!(target: TARGET, kind = kind.as_str(), "generation ignored");
            return false;
        }
        if self.phase == Phase::Deferring {
            tracing::debug!(target: TARGET, kind = kind.as_str(), "start while deferring ignored");
            return false;
        }
        self.phase = Phase::Generating;
        self.first_token_seen = false;
        tracing::debug!(target: TARGET, kind = kind.as_str(), "generating");
        true
    }

    /// A token arrived. Only the first token of an accepted generation
    /// does anything. Returns whether deferral began.
    pub fn on_stream_token<H: MessageHost + ?Sized>(&mut self, host: &mut H, settings: &Settings) -> bool {
        if self.phase != Phase::Generating || self.first_token_seen {
            return false;
        }
        self.first_token_seen = true;
        if !settings.defer_during_streaming {
            return false;
        }

        self.was_already_suspended = self.suspension.is_suspended();
        self.token = Some(self.suspension.acquire(HOLDER));
        if !self.was_already_suspended {
            self.stats.record_deferred_generation();
        }
        if settings.reduce_effects_during_streaming {
            host.set_effects_reduced(true);
            self.effects_reduced = true;
        }
        self.phase = Phase::Deferring;
        tracing::debug!(
            target: TARGET,
            already_suspended = self.was_already_suspended,
            effects_reduced = self.effects_reduced,
            "deferring transforms"
        );
        true
    }

    /// The generation ended or was stopped. Returns whether a
    /// reapplication pass is now owed.
    pub fn on_generation_finished<H: MessageHost + ?Sized>(&mut self, host: &mut H) -> bool {
        match self.phase {
            Phase::Idle => false,
            Phase::Generating => {
                self.phase = Phase::Idle;
                false
            }
            Phase::Deferring => {
                if let Some(token) = self.token.take() {
                    token.release();
                }
                if self.effects_reduced {
                    host.set_effects_reduced(false);
                    self.effects_reduced = false;
                }
                self.phase = Phase::Idle;
                tracing::debug!(
                    target: TARGET,
                    still_suspended = self.suspension.is_suspended(),
                    "deferral released"
                );
                true
            }
        }
    }

    /// Run the host's transform pipeline once over the latest message and
    /// announce it. A message that disappeared meanwhile is skipped.
    pub fn reapply<H: MessageHost + ?Sized>(&self, host: &mut H) -> Option<MessageId> {
        let message = host.latest_message()?;
        let started = web_time::Instant::now();
        match host.reapply_transforms(message) {
            Ok(()) => {
                self.stats.record_reapply_pass();
                host.emit_message_rendered(message);
                tracing::debug!(
                    target: TARGET,
                    message = %message,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "transforms reapplied"
                );
                Some(message)
            }
            Err(HostError::MissingTarget) => None,
            Err(err) => {
                tracing::debug!(target: TARGET, message = %message, error = %err, "reapplication skipped");
                None
            }
        }
    }
}
