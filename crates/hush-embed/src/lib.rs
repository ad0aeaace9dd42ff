#![forbid(unsafe_code)]

//! Lazy, sandboxed rendering of HTML fragments found in chat messages.
//!
//! Code blocks whose text is a full HTML page are swapped for placeholders.
//! A single shared viewport watcher reports when a placeholder comes near
//! the viewport; only then is an isolated surface mounted for it, and it is
//! torn down again when the placeholder leaves. Surfaces are untrusted peers
//! that can only report their content height through a typed message.
//!
//! The pieces:
//!
//! - [`detect`] classifies code block text and decodes entities.
//! - [`surface`] builds the sandboxed document and parses its messages.
//! - [`registry`] is the placeholder arena.
//! - [`manager`] ties them to the host's lifecycle signals.

pub mod detect;
pub mod manager;
pub mod registry;
pub mod surface;

pub use detect::{decode_entities, is_renderable_markup};
pub use manager::EmbedManager;
pub use registry::{PlaceholderEntry, PlaceholderId, PlaceholderRegistry};
pub use surface::{
    IDLE_LABEL, SANDBOX, SurfaceMessage, SurfaceMessageError, build_surface, iframe_markup,
};
