//! Policy-as-data tunables for hush.
//!
//! [`Settings`](crate::settings::Settings) are the user-facing toggles;
//! [`HushConfig`] holds the numeric knobs that the host application, not the
//! user, decides: cache capacity, the reapplication delay, the embed prefetch
//! margin, and so on. It can be loaded from TOML or JSON at startup.
//!
//! ```toml
//! # hush.toml
//! [patterns]
//! capacity = 500
//!
//! [streaming]
//! reapply_delay_ms = 100
//!
//! [embed]
//! prefetch_margin_px = 200
//! ```
//!
//! Every field has a default, so a partial file (or no file) is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level HushConfig
// ---------------------------------------------------------------------------

/// Top-level tunables, grouped by component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HushConfig {
    /// Compiled-pattern cache parameters.
    pub patterns: PatternPolicyConfig,
    /// Streaming phase controller parameters.
    pub streaming: StreamingPolicyConfig,
    /// Embedded-content lifecycle parameters.
    pub embed: EmbedPolicyConfig,
    /// Scroll-anchor parameters.
    pub scroll: ScrollPolicyConfig,
}

impl HushConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.patterns.capacity == 0 {
            errors.push("patterns.capacity must be > 0".into());
        }

        if self.scroll.settle_frames == 0 {
            errors.push("scroll.settle_frames must be >= 1".into());
        }

        if !self.embed.max_surface_height_px.is_finite() || self.embed.max_surface_height_px <= 0.0
        {
            errors.push(format!(
                "embed.max_surface_height_px must be finite and > 0, got {}",
                self.embed.max_surface_height_px
            ));
        }

        errors
    }

    /// Validate, turning a non-empty error list into [`ConfigError::Validation`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Compiled-pattern cache parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternPolicyConfig {
    /// Maximum number of cached compiled patterns. Default: 500.
    pub capacity: usize,
}

impl Default for PatternPolicyConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

/// Streaming phase controller parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingPolicyConfig {
    /// Delay between the end of a stream and the one-shot reapplication
    /// pass, in milliseconds. Default: 100.
    pub reapply_delay_ms: u64,
}

impl StreamingPolicyConfig {
    /// The reapplication delay as a [`Duration`].
    #[must_use]
    pub const fn reapply_delay(&self) -> Duration {
        Duration::from_millis(self.reapply_delay_ms)
    }
}

impl Default for StreamingPolicyConfig {
    fn default() -> Self {
        Self {
            reapply_delay_ms: 100,
        }
    }
}

/// Embedded-content lifecycle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedPolicyConfig {
    /// Margin around the viewport within which surfaces are created early
    /// and kept alive after leaving, in CSS pixels. Default: 200.
    pub prefetch_margin_px: u32,
    /// Upper bound applied to heights reported by surfaces. Default: 10 000.
    pub max_surface_height_px: f64,
}

impl Default for EmbedPolicyConfig {
    fn default() -> Self {
        Self {
            prefetch_margin_px: 200,
            max_surface_height_px: 10_000.0,
        }
    }
}

/// Scroll-anchor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollPolicyConfig {
    /// Rendering frames to wait after the page becomes visible before the
    /// anchor is restored. Default: 2.
    pub settle_frames: u32,
}

impl Default for ScrollPolicyConfig {
    fn default() -> Self {
        Self { settle_frames: 2 }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a [`HushConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
