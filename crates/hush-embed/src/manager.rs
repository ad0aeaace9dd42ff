//! Embedded-content lifecycle.
//!
//! [`EmbedManager`] reacts to message lifecycle signals and viewport
//! callbacks. It owns the placeholder registry and the state of the single
//! shared watcher; every DOM effect goes through the [`EmbedHost`].
//!
//! Lifecycle of one fragment:
//!
//! 1. a scan finds a code block whose decoded text is a full page, marks it
//!    processed, swaps it for a placeholder and starts watching that;
//! 2. entering the prefetch region mounts a surface built from the stored
//!    markup;
//! 3. leaving it unmounts the surface and restores the idle label;
//! 4. editing or swiping the owning message, or switching conversations,
//!    drops the entry along with any surface it has.

use std::rc::Rc;

use hush_core::config::EmbedPolicyConfig;
use hush_core::{EmbedHost, MessageId, NodeId, Stats, SurfaceId};

use crate::detect::{decode_entities, is_renderable_markup};
use crate::registry::{PlaceholderId, PlaceholderRegistry};
use crate::surface::{IDLE_LABEL, SurfaceMessage, build_surface};

const TARGET: &str = "hush.embed";

/// Owner of every placeholder entry and of the shared viewport watcher.
#[derive(Debug)]
pub struct EmbedManager {
    registry: PlaceholderRegistry,
    enabled: bool,
    watcher_live: bool,
    margin_px: u32,
    max_height_px: f64,
    stats: Rc<Stats>,
}

impl EmbedManager {
    /// Enabled manager with no entries and no watcher yet.
    #[must_use]
    pub fn new(config: &EmbedPolicyConfig, stats: Rc<Stats>) -> Self {
        Self {
            registry: PlaceholderRegistry::new(),
            enabled: true,
            watcher_live: false,
            margin_px: config.prefetch_margin_px,
            max_height_px: config.max_surface_height_px,
            stats,
        }
    }

    /// Start enabled or disabled without touching the host.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether lazy rendering is on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The placeholder entries.
    #[must_use]
    pub fn registry(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    /// Surfaces currently mounted.
    #[must_use]
    pub fn live_surfaces(&self) -> Vec<SurfaceId> {
        self.registry.iter().filter_map(|(_, e)| e.active).collect()
    }

    // -----------------------------------------------------------------------
    // Lifecycle signals
    // -----------------------------------------------------------------------

    /// A message was rendered (own or user message).
    pub fn on_message_rendered<H: EmbedHost + ?Sized>(&mut self, host: &mut H, message: MessageId) -> usize {
        self.scan_message(host, message)
    }

    /// A message was edited or swiped: drop its entries, then rescan it.
    pub fn on_message_replaced<H: EmbedHost + ?Sized>(&mut self, host: &mut H, message: MessageId) -> usize {
        self.purge_owner(host, message);
        self.scan_message(host, message)
    }

    /// Older messages were loaded above the current ones.
    pub fn on_more_loaded<H: EmbedHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.scan_all(host)
    }

    /// The whole view now shows a different conversation.
    pub fn on_conversation_changed<H: EmbedHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.teardown_all(host);
        self.scan_all(host)
    }

    /// Turn lazy rendering on or off.
    ///
    /// Off destroys every surface and disconnects the watcher but keeps the
    /// entries, so placeholders already in the page keep their stored markup.
    /// On watches those placeholders again, then rescans for new blocks.
    pub fn set_enabled<H: EmbedHost + ?Sized>(&mut self, host: &mut H, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.resume_watching(host);
            self.scan_all(host);
        } else {
            self.stop_watching(host);
        }
    }

    // -----------------------------------------------------------------------
    // Scanning
    // -----------------------------------------------------------------------

    /// Register every unprocessed full-page code block in `message`.
    /// Returns how many were registered.
    pub fn scan_message<H: EmbedHost + ?Sized>(&mut self, host: &mut H, message: MessageId) -> usize {
        if !self.enabled {
            return 0;
        }
        let mut registered = 0;
        for block in host.code_blocks(message) {
            if block.processed {
                continue;
            }
            let decoded = decode_entities(&block.text);
            if !is_renderable_markup(&decoded) {
                continue;
            }
            let raw_html = decoded.into_owned();

            host.mark_processed(block.node);
            let placeholder = match host.replace_with_placeholder(block.node) {
                Ok(placeholder) => placeholder,
                Err(err) => {
                    tracing::debug!(target: TARGET, message = %message, error = %err, "code block vanished before replacement");
                    continue;
                }
            };
            self.ensure_watcher(host);
            self.registry.register(placeholder, raw_html, message);
            host.show_idle_placeholder(placeholder, IDLE_LABEL);
            host.observe(placeholder);
            registered += 1;
        }
        if registered > 0 {
            tracing::debug!(target: TARGET, message = %message, registered, "embedded pages registered");
        }
        registered
    }

    /// Scan every rendered message.
    pub fn scan_all<H: EmbedHost + ?Sized>(&mut self, host: &mut H) -> usize {
        host.messages()
            .into_iter()
            .map(|message| self.scan_message(host, message))
            .sum()
    }

    fn ensure_watcher<H: EmbedHost + ?Sized>(&mut self, host: &mut H) {
        if !self.watcher_live {
            host.create_watcher(self.margin_px);
            self.watcher_live = true;
        }
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    /// Drop every entry owned by `owner`: stop watching it, destroy its
    /// surface and remove its placeholder if still attached.
    pub fn purge_owner<H: EmbedHost + ?Sized>(&mut self, host: &mut H, owner: MessageId) -> usize {
        let stale = self.registry.owned_by(owner);
        for &id in &stale {
            let Some(entry) = self.registry.remove(id) else {
                continue;
            };
            host.unobserve(entry.placeholder);
            if let Some(surface) = entry.active {
                self.destroy_surface(host, entry.placeholder, surface);
            }
            if host.is_attached(entry.placeholder) {
                host.remove_placeholder(entry.placeholder);
            }
        }
        if !stale.is_empty() {
            tracing::debug!(target: TARGET, message = %owner, purged = stale.len(), "stale embeds purged");
        }
        stale.len()
    }

    fn stop_watching<H: EmbedHost + ?Sized>(&mut self, host: &mut H) {
        let entries: Vec<(PlaceholderId, NodeId)> =
            self.registry.iter().map(|(id, e)| (id, e.placeholder)).collect();
        for &(id, placeholder) in &entries {
            host.unobserve(placeholder);
            if let Some(surface) = self.registry.detach_surface(id) {
                self.destroy_surface(host, placeholder, surface);
                host.show_idle_placeholder(placeholder, IDLE_LABEL);
            }
        }
        if self.watcher_live {
            host.disconnect_watcher();
            self.watcher_live = false;
        }
        tracing::debug!(target: TARGET, entries = entries.len(), "embed watching stopped");
    }

    fn resume_watching<H: EmbedHost + ?Sized>(&mut self, host: &mut H) {
        let entries: Vec<(PlaceholderId, NodeId)> =
            self.registry.iter().map(|(id, e)| (id, e.placeholder)).collect();
        let mut resumed = 0;
        for (id, placeholder) in entries {
            // Left the page while off; nothing to watch.
            if !host.is_attached(placeholder) {
                self.registry.remove(id);
                continue;
            }
            self.ensure_watcher(host);
            host.observe(placeholder);
            resumed += 1;
        }
        if resumed > 0 {
            tracing::debug!(target: TARGET, resumed, "embed watching resumed");
        }
    }

    /// Disconnect the shared watcher, destroy every surface and clear the
    /// registry.
    pub fn teardown_all<H: EmbedHost + ?Sized>(&mut self, host: &mut H) {
        if self.watcher_live {
            host.disconnect_watcher();
            self.watcher_live = false;
        }
        let entries = self.registry.drain();
        let count = entries.len();
        for entry in entries {
            if let Some(surface) = entry.active {
                self.destroy_surface(host, entry.placeholder, surface);
            }
        }
        tracing::debug!(target: TARGET, entries = count, "embed registry torn down");
    }

    // -----------------------------------------------------------------------
    // Viewport and surface callbacks
    // -----------------------------------------------------------------------

    /// The shared watcher reported `placeholder` entering (`visible`) or
    /// leaving the prefetch region.
    pub fn on_intersection<H: EmbedHost + ?Sized>(&mut self, host: &mut H, placeholder: NodeId, visible: bool) {
        if !self.enabled {
            return;
        }
        let Some(id) = self.registry.lookup(placeholder) else {
            return;
        };
        if visible {
            self.materialize(host, id, placeholder);
        } else if let Some(surface) = self.registry.detach_surface(id) {
            self.destroy_surface(host, placeholder, surface);
            host.show_idle_placeholder(placeholder, IDLE_LABEL);
        }
    }

    fn materialize<H: EmbedHost + ?Sized>(&mut self, host: &mut H, id: PlaceholderId, placeholder: NodeId) {
        let spec = match self.registry.get(id) {
            Some(entry) if entry.active.is_none() => build_surface(&entry.raw_html),
            _ => return,
        };
        match host.mount_surface(placeholder, &spec) {
            Ok(surface) => {
                self.registry.attach_surface(id, surface);
                self.stats.record_embed_created();
                tracing::debug!(target: TARGET, surface = surface.0, "surface mounted");
            }
            Err(err) => {
                tracing::debug!(target: TARGET, error = %err, "surface mount skipped");
            }
        }
    }

    fn destroy_surface<H: EmbedHost + ?Sized>(&self, host: &mut H, placeholder: NodeId, surface: SurfaceId) {
        host.unmount_surface(placeholder, surface);
        self.stats.record_embed_destroyed();
        tracing::debug!(target: TARGET, surface = surface.0, "surface destroyed");
    }

    /// A surface posted `payload`. Applies a valid resize to the surface it
    /// came from; returns whether a height was applied.
    pub fn on_surface_message<H: EmbedHost + ?Sized>(&mut self, host: &mut H, source: SurfaceId, payload: &str) -> bool {
        let height = match SurfaceMessage::from_json(payload).and_then(|m| m.height(self.max_height_px)) {
            Ok(Some(height)) => height,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(target: TARGET, surface = source.0, error = %err, "surface message rejected");
                return false;
            }
        };
        if self.registry.find_by_surface(source).is_none() {
            return false;
        }
        host.set_surface_height(source, height).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_core::HushConfig;
    use hush_core::testing::{HostCall, RecordingHost};

    const PAGE: &str = "<!doctype html><html><body><h1>hi</h1></body></html>";

    fn manager() -> (EmbedManager, Rc<Stats>) {
        let stats = Rc::new(Stats::new());
        let config = HushConfig::default();
        (EmbedManager::new(&config.embed, Rc::clone(&stats)), stats)
    }

    #[test]
    fn scan_replaces_only_full_pages() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        let blocks = host.render_message(MessageId(1), &[PAGE, "<div>snippet</div>", "let x = 1;"]);
        assert_eq!(m.on_message_rendered(&mut host, MessageId(1)), 1);
        assert!(!host.is_attached(blocks[0]));
        assert!(host.is_attached(blocks[1]));
        assert_eq!(m.registry().len(), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::CreateWatcher { margin_px: 200 })), 1);
    }

    #[test]
    fn scan_is_idempotent() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE]);
        m.on_message_rendered(&mut host, MessageId(1));
        assert_eq!(m.on_message_rendered(&mut host, MessageId(1)), 0);
        assert_eq!(m.on_more_loaded(&mut host), 0);
        assert_eq!(m.registry().len(), 1);
    }

    #[test]
    fn escaped_pages_are_stored_decoded() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &["&lt;html&gt;&lt;body&gt;x&lt;/body&gt;&lt;/html&gt;"]);
        m.on_message_rendered(&mut host, MessageId(1));
        let (_, entry) = m.registry().iter().next().unwrap();
        assert_eq!(entry.raw_html, "<html><body>x</body></html>");
    }

    #[test]
    fn watcher_is_created_once() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE, PAGE]);
        host.render_message(MessageId(2), &[PAGE]);
        m.scan_all(&mut host);
        assert_eq!(host.count(|c| matches!(c, HostCall::CreateWatcher { .. })), 1);
        assert_eq!(host.count(|c| matches!(c, HostCall::Observe(_))), 3);
    }

    #[test]
    fn visibility_mounts_and_unmounts() {
        let (mut m, stats) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE]);
        m.on_message_rendered(&mut host, MessageId(1));
        let placeholder = host.placeholders()[0];

        m.on_intersection(&mut host, placeholder, true);
        m.on_intersection(&mut host, placeholder, true);
        assert_eq!(host.live_surfaces().len(), 1);
        let surface = host.live_surfaces()[0];
        assert!(host.surface_spec(surface).unwrap().document.contains("<h1>hi</h1>"));

        m.on_intersection(&mut host, placeholder, false);
        assert!(host.live_surfaces().is_empty());
        m.on_intersection(&mut host, placeholder, true);
        assert_eq!(host.live_surfaces().len(), 1);

        let snap = stats.snapshot();
        assert_eq!(snap.embeds_created, 2);
        assert_eq!(snap.embeds_destroyed, 1);
    }

    #[test]
    fn resize_targets_the_sending_surface() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE, PAGE]);
        m.on_message_rendered(&mut host, MessageId(1));
        for p in host.placeholders() {
            m.on_intersection(&mut host, p, true);
        }
        let second = host.live_surfaces()[1];
        assert!(m.on_surface_message(&mut host, second, r#"{"type":"resize","height":321}"#));
        assert_eq!(
            host.calls.last(),
            Some(&HostCall::SetHeight { surface: second, height_px: 321.0 })
        );
        assert!(!m.on_surface_message(&mut host, SurfaceId(999), r#"{"type":"resize","height":5}"#));
        assert!(!m.on_surface_message(&mut host, second, r#"{"type":"resize","height":-5}"#));
        assert!(!m.on_surface_message(&mut host, second, "garbage"));
    }

    #[test]
    fn disabling_unmounts_and_enabling_resumes() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE]);
        m.on_message_rendered(&mut host, MessageId(1));
        let placeholder = host.placeholders()[0];
        m.on_intersection(&mut host, placeholder, true);

        m.set_enabled(&mut host, false);
        assert_eq!(m.registry().len(), 1);
        assert_eq!(m.registry().active_count(), 0);
        assert!(host.live_surfaces().is_empty());
        assert!(!host.watcher_live());
        assert_eq!(host.calls.last(), Some(&HostCall::DisconnectWatcher));

        host.render_message(MessageId(2), &[PAGE]);
        assert_eq!(m.on_message_rendered(&mut host, MessageId(2)), 0);
        m.on_intersection(&mut host, placeholder, true);
        assert!(host.live_surfaces().is_empty());

        m.set_enabled(&mut host, true);
        assert_eq!(m.registry().len(), 2);
        assert!(host.watcher_live());
        assert_eq!(host.count(|c| *c == HostCall::Observe(placeholder)), 2);
    }

    #[test]
    fn enabling_forgets_placeholders_detached_while_off() {
        let (mut m, _) = manager();
        let mut host = RecordingHost::new();
        host.render_message(MessageId(1), &[PAGE]);
        m.on_message_rendered(&mut host, MessageId(1));
        let placeholder = host.placeholders()[0];

        m.set_enabled(&mut host, false);
        host.detach(placeholder);
        m.set_enabled(&mut host, true);
        assert!(m.registry().is_empty());
        assert!(!host.watcher_live());
    }
}
