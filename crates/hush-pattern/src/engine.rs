//! Host engine detection for the install guard.
//!
//! Substituting the process-wide pattern compiler is only safe where the
//! engine's native pattern objects behave like the ones the cache was
//! designed around. The WebKit family diverges, so the cache stays out
//! there and compilation is passed straight through.

/// Broad browser-engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineFamily {
    /// Chromium-based engines.
    Blink,
    /// Firefox.
    Gecko,
    /// Safari, and every browser on iOS.
    WebKit,
    /// Anything else, including non-browser hosts.
    Unknown,
}

impl EngineFamily {
    /// Classify a user-agent string.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        // iOS browsers brand themselves but all run WebKit.
        if ["CriOS/", "FxiOS/", "EdgiOS/"]
            .iter()
            .any(|tag| user_agent.contains(tag))
        {
            return Self::WebKit;
        }
        if user_agent.contains("Firefox/") {
            return Self::Gecko;
        }
        if ["Chrome/", "Chromium/", "Edg/", "OPR/"]
            .iter()
            .any(|tag| user_agent.contains(tag))
        {
            return Self::Blink;
        }
        if user_agent.contains("AppleWebKit/") {
            return Self::WebKit;
        }
        Self::Unknown
    }

    /// Whether the process-wide compiler may be substituted on this engine.
    #[must_use]
    pub const fn supports_compiler_substitution(self) -> bool {
        !matches!(self, Self::WebKit)
    }

    /// Lowercase name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Gecko => "gecko",
            Self::WebKit => "webkit",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EngineFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
