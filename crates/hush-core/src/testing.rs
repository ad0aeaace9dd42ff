//! Recording host for tests.
//!
//! [`RecordingHost`] implements every host trait over an in-memory model of a
//! conversation view. It records each request in order as a [`HostCall`] and
//! lets tests script the parts of the environment hush reads: the latest
//! message, messages whose element went missing, scroll metrics, and the
//! code blocks inside each message.

use std::collections::{BTreeMap, BTreeSet};

use crate::host::{
    CodeBlock, EmbedHost, HostError, MessageHost, MessageId, NodeId, ScrollHost, ScrollMetrics,
    SurfaceId, SurfaceSpec,
};

/// One recorded host request.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Reapply(MessageId),
    EmitRendered(MessageId),
    EffectsReduced(bool),
    BlurSuppressed(bool),
    SetScrollTop(f64),
    MarkProcessed(NodeId),
    ReplaceWithPlaceholder { block: NodeId, placeholder: NodeId },
    RemovePlaceholder(NodeId),
    ShowIdle(NodeId),
    CreateWatcher { margin_px: u32 },
    Observe(NodeId),
    Unobserve(NodeId),
    DisconnectWatcher,
    Mount { placeholder: NodeId, surface: SurfaceId },
    Unmount { placeholder: NodeId, surface: SurfaceId },
    SetHeight { surface: SurfaceId, height_px: f64 },
}

#[derive(Debug, Clone)]
struct FakeBlock {
    node: NodeId,
    text: String,
    processed: bool,
}

/// In-memory host that records every request.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Requests in the order they were made.
    pub calls: Vec<HostCall>,
    /// Answer for [`MessageHost::latest_message`].
    pub latest: Option<MessageId>,
    /// Messages whose element is gone: reapplying them fails.
    pub missing_messages: BTreeSet<MessageId>,
    /// Answer for [`ScrollHost::scroll_metrics`].
    pub scroll: Option<ScrollMetrics>,
    messages: BTreeMap<MessageId, Vec<FakeBlock>>,
    attached: BTreeSet<NodeId>,
    surfaces: BTreeMap<SurfaceId, (NodeId, SurfaceSpec)>,
    watcher_live: bool,
    next_node: u64,
    next_surface: u64,
}

impl RecordingHost {
    /// Empty host: no messages, no scroll container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_node(&mut self) -> NodeId {
        self.next_node += 1;
        let node = NodeId(self.next_node);
        self.attached.insert(node);
        node
    }

    /// Render (or re-render) `message` with one code block per entry of
    /// `blocks`. Any previous elements of that message are detached, as an
    /// edit or swipe would. The message becomes the latest one if it has the
    /// highest id. Returns the new code block handles.
    pub fn render_message(&mut self, message: MessageId, blocks: &[&str]) -> Vec<NodeId> {
        if let Some(old) = self.messages.remove(&message) {
            for block in old {
                self.attached.remove(&block.node);
            }
        }
        let fresh: Vec<FakeBlock> = blocks
            .iter()
            .map(|text| FakeBlock {
                node: self.mint_node(),
                text: (*text).to_owned(),
                processed: false,
            })
            .collect();
        let nodes = fresh.iter().map(|b| b.node).collect();
        self.messages.insert(message, fresh);
        if self.latest.is_none_or(|latest| latest <= message) {
            self.latest = Some(message);
        }
        nodes
    }

    /// Drop every message and detach every element, as a conversation
    /// switch would.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.attached.clear();
        self.latest = None;
    }

    /// Detach a single element.
    pub fn detach(&mut self, node: NodeId) {
        self.attached.remove(&node);
    }

    /// Surfaces currently mounted.
    #[must_use]
    pub fn live_surfaces(&self) -> Vec<SurfaceId> {
        self.surfaces.keys().copied().collect()
    }

    /// Spec a live surface was mounted with.
    #[must_use]
    pub fn surface_spec(&self, surface: SurfaceId) -> Option<&SurfaceSpec> {
        self.surfaces.get(&surface).map(|(_, spec)| spec)
    }

    /// Whether the shared watcher exists.
    #[must_use]
    pub const fn watcher_live(&self) -> bool {
        self.watcher_live
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Placeholders created so far, in order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::ReplaceWithPlaceholder { placeholder, .. } => Some(*placeholder),
                _ => None,
            })
            .collect()
    }

    fn block_mut(&mut self, node: NodeId) -> Option<&mut FakeBlock> {
        self.messages
            .values_mut()
            .flat_map(|blocks| blocks.iter_mut())
            .find(|b| b.node == node)
    }
}

impl MessageHost for RecordingHost {
    fn latest_message(&self) -> Option<MessageId> {
        self.latest
    }

    fn reapply_transforms(&mut self, message: MessageId) -> Result<(), HostError> {
        if self.missing_messages.contains(&message) {
            return Err(HostError::MissingTarget);
        }
        self.calls.push(HostCall::Reapply(message));
        Ok(())
    }

    fn emit_message_rendered(&mut self, message: MessageId) {
        self.calls.push(HostCall::EmitRendered(message));
    }

    fn set_effects_reduced(&mut self, reduced: bool) {
        self.calls.push(HostCall::EffectsReduced(reduced));
    }

    fn set_blur_suppressed(&mut self, suppressed: bool) {
        self.calls.push(HostCall::BlurSuppressed(suppressed));
    }
}

impl ScrollHost for RecordingHost {
    fn scroll_metrics(&self) -> Option<ScrollMetrics> {
        self.scroll
    }

    fn set_scroll_top(&mut self, top: f64) -> Result<(), HostError> {
        let Some(metrics) = self.scroll.as_mut() else {
            return Err(HostError::MissingTarget);
        };
        metrics.scroll_top = top;
        self.calls.push(HostCall::SetScrollTop(top));
        Ok(())
    }
}

impl EmbedHost for RecordingHost {
    fn messages(&self) -> Vec<MessageId> {
        self.messages.keys().copied().collect()
    }

    fn code_blocks(&self, message: MessageId) -> Vec<CodeBlock> {
        self.messages
            .get(&message)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| self.attached.contains(&b.node))
                    .map(|b| CodeBlock {
                        node: b.node,
                        text: b.text.clone(),
                        processed: b.processed,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn mark_processed(&mut self, block: NodeId) {
        if let Some(b) = self.block_mut(block) {
            b.processed = true;
        }
        self.calls.push(HostCall::MarkProcessed(block));
    }

    fn replace_with_placeholder(&mut self, block: NodeId) -> Result<NodeId, HostError> {
        if !self.attached.contains(&block) {
            return Err(HostError::MissingTarget);
        }
        self.attached.remove(&block);
        let placeholder = self.mint_node();
        self.calls
            .push(HostCall::ReplaceWithPlaceholder { block, placeholder });
        Ok(placeholder)
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.attached.contains(&node)
    }

    fn remove_placeholder(&mut self, placeholder: NodeId) {
        self.attached.remove(&placeholder);
        self.calls.push(HostCall::RemovePlaceholder(placeholder));
    }

    fn show_idle_placeholder(&mut self, placeholder: NodeId, _label: &str) {
        self.calls.push(HostCall::ShowIdle(placeholder));
    }

    fn create_watcher(&mut self, margin_px: u32) {
        self.watcher_live = true;
        self.calls.push(HostCall::CreateWatcher { margin_px });
    }

    fn observe(&mut self, placeholder: NodeId) {
        self.calls.push(HostCall::Observe(placeholder));
    }

    fn unobserve(&mut self, placeholder: NodeId) {
        self.calls.push(HostCall::Unobserve(placeholder));
    }

    fn disconnect_watcher(&mut self) {
        self.watcher_live = false;
        self.calls.push(HostCall::DisconnectWatcher);
    }

    fn mount_surface(
        &mut self,
        placeholder: NodeId,
        spec: &SurfaceSpec,
    ) -> Result<SurfaceId, HostError> {
        if !self.attached.contains(&placeholder) {
            return Err(HostError::MissingTarget);
        }
        self.next_surface += 1;
        let surface = SurfaceId(self.next_surface);
        self.surfaces.insert(surface, (placeholder, spec.clone()));
        self.calls.push(HostCall::Mount {
            placeholder,
            surface,
        });
        Ok(surface)
    }

    fn unmount_surface(&mut self, placeholder: NodeId, surface: SurfaceId) {
        self.surfaces.remove(&surface);
        self.calls.push(HostCall::Unmount {
            placeholder,
            surface,
        });
    }

    fn set_surface_height(
        &mut self,
        surface: SurfaceId,
        height_px: f64,
    ) -> Result<(), HostError> {
        if !self.surfaces.contains_key(&surface) {
            return Err(HostError::MissingTarget);
        }
        self.calls.push(HostCall::SetHeight { surface, height_px });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerender_detaches_old_blocks() {
        let mut host = RecordingHost::new();
        let old = host.render_message(MessageId(1), &["a"]);
        let new = host.render_message(MessageId(1), &["b"]);
        assert!(!host.is_attached(old[0]));
        assert!(host.is_attached(new[0]));
        assert_eq!(host.code_blocks(MessageId(1)).len(), 1);
        assert_eq!(host.latest_message(), Some(MessageId(1)));
    }

    #[test]
    fn latest_tracks_highest_message() {
        let mut host = RecordingHost::new();
        host.render_message(MessageId(5), &[]);
        host.render_message(MessageId(2), &[]);
        assert_eq!(host.latest_message(), Some(MessageId(5)));
    }

    #[test]
    fn missing_message_fails_reapply() {
        let mut host = RecordingHost::new();
        host.missing_messages.insert(MessageId(3));
        assert_eq!(
            host.reapply_transforms(MessageId(3)),
            Err(HostError::MissingTarget)
        );
        assert!(host.calls.is_empty());
    }
}
