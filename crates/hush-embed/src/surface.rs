//! The sandboxed surface document and its message channel.
//!
//! A surface gets the stored raw markup plus a small reporter script and
//! nothing else: no shared stylesheets or libraries. The sandbox allows
//! scripts but not same-origin access, so the only way out is
//! `parent.postMessage`, and the only message the parent acts on is
//! `{"type": "resize", "height": <number>}`.

use hush_core::SurfaceSpec;
use serde::Deserialize;

/// Sandbox token list for every surface.
pub const SANDBOX: &str = "allow-scripts";

/// Text shown in a placeholder that has no live surface.
pub const IDLE_LABEL: &str = "[embedded page: scroll to load]";

/// Observes the document's own size and reports it to the parent.
const REPORTER_SCRIPT: &str = concat!(
    "<script>(function(){",
    "var root=document.documentElement;",
    "var post=function(){parent.postMessage({type:\"resize\",height:root.scrollHeight},\"*\");};",
    "if(typeof ResizeObserver===\"function\"){new ResizeObserver(post).observe(root);}",
    "window.addEventListener(\"load\",post);",
    "post();",
    "})();</script>"
);

const BODY_CLOSE: &str = "</body>";

/// Build the surface for a stored fragment.
///
/// The reporter script goes right before the last `</body>` (matched
/// case-insensitively) or at the end when there is none.
#[must_use]
pub fn build_surface(raw_html: &str) -> SurfaceSpec {
    let mut document = String::with_capacity(raw_html.len() + REPORTER_SCRIPT.len());
    match raw_html.to_ascii_lowercase().rfind(BODY_CLOSE) {
        Some(at) => {
            document.push_str(&raw_html[..at]);
            document.push_str(REPORTER_SCRIPT);
            document.push_str(&raw_html[at..]);
        }
        None => {
            document.push_str(raw_html);
            document.push_str(REPORTER_SCRIPT);
        }
    }
    SurfaceSpec {
        document,
        sandbox: SANDBOX,
    }
}

/// `<iframe>` markup for hosts that mount surfaces from an HTML string.
#[must_use]
pub fn iframe_markup(spec: &SurfaceSpec) -> String {
    format!(
        "<iframe sandbox=\"{}\" srcdoc=\"{}\" style=\"width:100%;border:0;\" loading=\"lazy\"></iframe>",
        spec.sandbox,
        v_htmlescape::escape(&spec.document)
    )
}

/// A message posted by a surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceMessage {
    /// The surface's content height changed.
    Resize { height: f64 },
    /// Any other tag. Surfaces are untrusted; unknown messages are ignored.
    #[serde(other)]
    Unknown,
}

/// Why a surface message was rejected.
#[derive(Debug)]
pub enum SurfaceMessageError {
    /// Not JSON, or missing/mistyped fields.
    Malformed(serde_json::Error),
    /// `height` is negative or not finite.
    InvalidHeight(f64),
}

impl std::fmt::Display for SurfaceMessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed surface message: {e}"),
            Self::InvalidHeight(h) => write!(f, "invalid surface height: {h}"),
        }
    }
}

impl std::error::Error for SurfaceMessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            Self::InvalidHeight(_) => None,
        }
    }
}

impl SurfaceMessage {
    /// Decode a posted payload.
    pub fn from_json(payload: &str) -> Result<Self, SurfaceMessageError> {
        serde_json::from_str(payload).map_err(SurfaceMessageError::Malformed)
    }

    /// Validated height of a resize message, clamped to `max_height`.
    /// `Ok(None)` for messages that carry no height.
    pub fn height(&self, max_height: f64) -> Result<Option<f64>, SurfaceMessageError> {
        match *self {
            Self::Resize { height } if height.is_finite() && height >= 0.0 => {
                Ok(Some(height.min(max_height)))
            }
            Self::Resize { height } => Err(SurfaceMessageError::InvalidHeight(height)),
            Self::Unknown => Ok(None),
        }
    }
}
