//! Host collaborator traits.
//!
//! hush never touches a DOM directly. The embedding application implements
//! these traits over whatever rendering technology it uses and hush issues
//! requests through them. Every handle type is an opaque id minted by the
//! host; hush only compares and stores them.
//!
//! Requests that target an element may fail with [`HostError::MissingTarget`]
//! when the element was removed between scheduling and execution. Callers in
//! hush treat that as a silent skip.

use serde::{Deserialize, Serialize};

/// Identity of a chat message as known to the host (its index or id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle for a host element (code block or placeholder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Opaque handle for a mounted sandboxed surface. It doubles as the
/// "originating window" reference carried by messages the surface posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Host error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The target element no longer exists or is detached.
    MissingTarget,
    /// The host cannot perform this operation.
    Unsupported(&'static str),
    /// The host refused the request.
    Rejected(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTarget => write!(f, "target element is missing"),
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
            Self::Rejected(why) => write!(f, "rejected: {why}"),
        }
    }
}

impl std::error::Error for HostError {}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Access to the host's transform pipeline and message list.
pub trait MessageHost {
    /// The most recent message in the conversation, if any.
    fn latest_message(&self) -> Option<MessageId>;

    /// Run the host's full text-transform pipeline against `message`.
    fn reapply_transforms(&mut self, message: MessageId) -> Result<(), HostError>;

    /// Announce that `message` was (re-)rendered, so other consumers can
    /// attach their own post-processing.
    fn emit_message_rendered(&mut self, message: MessageId);

    /// Enable or disable the reduced-cost visual mode (animations, shadows,
    /// filters) used while a message streams.
    fn set_effects_reduced(&mut self, reduced: bool);

    /// Enable or disable global backdrop blur suppression.
    fn set_blur_suppressed(&mut self, suppressed: bool);
}

// ---------------------------------------------------------------------------
// Scrolling
// ---------------------------------------------------------------------------

/// Scroll geometry of the message container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Total scrollable content height.
    pub scroll_height: f64,
    /// Current scroll offset from the top.
    pub scroll_top: f64,
    /// Visible height of the container.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Distance between the bottom of the viewport and the bottom of the
    /// content.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

/// Access to the message container's scroll position.
pub trait ScrollHost {
    /// Current metrics, or `None` if the container is absent.
    fn scroll_metrics(&self) -> Option<ScrollMetrics>;

    /// Set the container's scroll offset.
    fn set_scroll_top(&mut self, top: f64) -> Result<(), HostError>;
}

// ---------------------------------------------------------------------------
// Embedded content
// ---------------------------------------------------------------------------

/// A code block inside a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Host handle of the block element.
    pub node: NodeId,
    /// The block's text content, possibly still entity-escaped.
    pub text: String,
    /// Whether the block already carries hush's processed marker.
    pub processed: bool,
}

/// Everything the host needs to mount a sandboxed surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    /// Complete document to load into the surface.
    pub document: String,
    /// Sandbox token list for the isolation primitive.
    pub sandbox: &'static str,
}

/// Access to rendered message markup, placeholders, the shared viewport
/// watcher, and sandboxed surfaces.
pub trait EmbedHost {
    /// Every message currently rendered in the conversation view.
    fn messages(&self) -> Vec<MessageId>;

    /// Code blocks inside `message`, in document order.
    fn code_blocks(&self, message: MessageId) -> Vec<CodeBlock>;

    /// Set the processed marker on a code block.
    fn mark_processed(&mut self, block: NodeId);

    /// Replace a code block with an empty placeholder element and return
    /// the placeholder's handle.
    fn replace_with_placeholder(&mut self, block: NodeId) -> Result<NodeId, HostError>;

    /// Whether `node` is still attached to the document.
    fn is_attached(&self, node: NodeId) -> bool;

    /// Remove a placeholder element from the document.
    fn remove_placeholder(&mut self, placeholder: NodeId);

    /// Show lightweight text inside a placeholder that has no surface.
    fn show_idle_placeholder(&mut self, placeholder: NodeId, label: &str);

    /// Create the shared viewport watcher with the given prefetch margin.
    fn create_watcher(&mut self, margin_px: u32);

    /// Start watching `placeholder` with the shared watcher.
    fn observe(&mut self, placeholder: NodeId);

    /// Stop watching `placeholder`.
    fn unobserve(&mut self, placeholder: NodeId);

    /// Disconnect and drop the shared watcher.
    fn disconnect_watcher(&mut self);

    /// Mount a sandboxed surface inside `placeholder`.
    fn mount_surface(
        &mut self,
        placeholder: NodeId,
        spec: &SurfaceSpec,
    ) -> Result<SurfaceId, HostError>;

    /// Destroy a mounted surface.
    fn unmount_surface(&mut self, placeholder: NodeId, surface: SurfaceId);

    /// Apply a height to a mounted surface.
    fn set_surface_height(&mut self, surface: SurfaceId, height_px: f64)
    -> Result<(), HostError>;
}

/// Everything the hush runtime needs from its host.
pub trait Host: MessageHost + ScrollHost + EmbedHost {}

impl<T: MessageHost + ScrollHost + EmbedHost> Host for T {}
