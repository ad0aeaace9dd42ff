//! Lifecycle signals consumed from the host application.
//!
//! The host's event bridge forwards its named events as [`LifecycleSignal`]
//! values, either constructed directly or decoded from the bridge's JSON
//! form:
//!
//! ```
//! use hush_core::signal::{GenerationKind, LifecycleSignal};
//!
//! let signal = LifecycleSignal::from_json(r#"{"event":"generation_started","kind":"quiet"}"#).unwrap();
//! assert_eq!(
//!     signal,
//!     LifecycleSignal::GenerationStarted { kind: GenerationKind::Quiet }
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::host::MessageId;
use crate::settings::SettingKey;

/// Kind of generation the host started.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GenerationKind {
    /// Regular reply.
    #[default]
    Normal,
    Swipe,
    Regenerate,
    Continue,
    Impersonate,
    Quiet,
    /// Generation that never streams into the visible chat.
    Background,
    /// Any kind this version does not recognize.
    Other(String),
}

impl GenerationKind {
    /// The host's name for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Swipe => "swipe",
            Self::Regenerate => "regenerate",
            Self::Continue => "continue",
            Self::Impersonate => "impersonate",
            Self::Quiet => "quiet",
            Self::Background => "background",
            Self::Other(name) => name,
        }
    }

    /// Whether this generation streams into the visible chat.
    #[must_use]
    pub fn is_foreground(&self) -> bool {
        !matches!(self, Self::Background)
    }
}

impl From<&str> for GenerationKind {
    fn from(name: &str) -> Self {
        match name {
            "" | "normal" => Self::Normal,
            "swipe" => Self::Swipe,
            "regenerate" => Self::Regenerate,
            "continue" => Self::Continue,
            "impersonate" => Self::Impersonate,
            "quiet" => Self::Quiet,
            "background" => Self::Background,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for GenerationKind {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<GenerationKind> for String {
    fn from(kind: GenerationKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Every signal hush reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// A generation began.
    GenerationStarted {
        #[serde(default)]
        kind: GenerationKind,
    },
    /// A streamed token arrived.
    StreamTokenReceived,
    /// The generation completed.
    GenerationEnded,
    /// The user stopped the generation.
    GenerationStopped,
    /// A message (own or user) finished rendering.
    MessageRendered { message: MessageId },
    /// A message was edited and re-rendered.
    MessageUpdated { message: MessageId },
    /// A message was swiped to another alternative.
    MessageSwiped { message: MessageId },
    /// Older messages were loaded into the view.
    MoreMessagesLoaded,
    /// The user switched conversations.
    ConversationChanged,
    /// The page was hidden or shown.
    VisibilityChanged { visibility: Visibility },
    /// A toggle changed at runtime.
    SettingsChanged { key: SettingKey, enabled: bool },
}

impl LifecycleSignal {
    /// Decode a signal from the host bridge's JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GenerationStarted { .. } => "generation_started",
            Self::StreamTokenReceived => "stream_token_received",
            Self::GenerationEnded => "generation_ended",
            Self::GenerationStopped => "generation_stopped",
            Self::MessageRendered { .. } => "message_rendered",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageSwiped { .. } => "message_swiped",
            Self::MoreMessagesLoaded => "more_messages_loaded",
            Self::ConversationChanged => "conversation_changed",
            Self::VisibilityChanged { .. } => "visibility_changed",
            Self::SettingsChanged { .. } => "settings_changed",
        }
    }
}
