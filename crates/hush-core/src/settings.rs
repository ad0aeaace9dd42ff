//! User-facing toggles and their persistence.
//!
//! Settings are persisted by the host as an opaque JSON object. Reading them
//! is lenient: defaults are merged in without clobbering anything already
//! stored (including keys this version does not know about), values with
//! the wrong type fall back to the default for that key, and a stored value
//! that is not an object at all is replaced by the defaults. Loading never
//! fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TARGET: &str = "hush.settings";

/// One independently toggleable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Suspend the host's expensive text transforms while a message streams.
    DeferDuringStreaming,
    /// Cache compiled patterns process-wide.
    CachePatterns,
    /// Switch to a reduced-cost visual mode while a message streams.
    ReduceEffectsDuringStreaming,
    /// Materialize embedded documents only near the viewport.
    LazyEmbedRendering,
    /// Keep the scroll anchor across page visibility changes.
    PreserveScroll,
    /// Disable backdrop blur everywhere.
    SuppressBlurGlobally,
}

impl SettingKey {
    /// Every key, in storage order.
    pub const ALL: [Self; 6] = [
        Self::DeferDuringStreaming,
        Self::CachePatterns,
        Self::ReduceEffectsDuringStreaming,
        Self::LazyEmbedRendering,
        Self::PreserveScroll,
        Self::SuppressBlurGlobally,
    ];

    /// The key's name in the persisted object.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeferDuringStreaming => "defer_during_streaming",
            Self::CachePatterns => "cache_patterns",
            Self::ReduceEffectsDuringStreaming => "reduce_effects_during_streaming",
            Self::LazyEmbedRendering => "lazy_embed_rendering",
            Self::PreserveScroll => "preserve_scroll",
            Self::SuppressBlurGlobally => "suppress_blur_globally",
        }
    }
}

/// The full set of toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Suspend the host's transforms while tokens stream in.
    pub defer_during_streaming: bool,
    /// Serve repeated pattern compilations from the cache.
    pub cache_patterns: bool,
    /// Turn on the visual cost reduction mode while deferring.
    pub reduce_effects_during_streaming: bool,
    /// Replace full-page code blocks with viewport-driven surfaces.
    pub lazy_embed_rendering: bool,
    /// Restore the distance from the bottom when the page becomes visible.
    pub preserve_scroll: bool,
    /// Keep backdrop blur off everywhere.
    pub suppress_blur_globally: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            defer_during_streaming: true,
            cache_patterns: true,
            reduce_effects_during_streaming: true,
            lazy_embed_rendering: true,
            preserve_scroll: true,
            suppress_blur_globally: false,
        }
    }
}

impl Settings {
    /// Read one toggle.
    #[must_use]
    pub const fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::DeferDuringStreaming => self.defer_during_streaming,
            SettingKey::CachePatterns => self.cache_patterns,
            SettingKey::ReduceEffectsDuringStreaming => self.reduce_effects_during_streaming,
            SettingKey::LazyEmbedRendering => self.lazy_embed_rendering,
            SettingKey::PreserveScroll => self.preserve_scroll,
            SettingKey::SuppressBlurGlobally => self.suppress_blur_globally,
        }
    }

    /// Write one toggle.
    pub fn set(&mut self, key: SettingKey, enabled: bool) {
        let slot = match key {
            SettingKey::DeferDuringStreaming => &mut self.defer_during_streaming,
            SettingKey::CachePatterns => &mut self.cache_patterns,
            SettingKey::ReduceEffectsDuringStreaming => &mut self.reduce_effects_during_streaming,
            SettingKey::LazyEmbedRendering => &mut self.lazy_embed_rendering,
            SettingKey::PreserveScroll => &mut self.preserve_scroll,
            SettingKey::SuppressBlurGlobally => &mut self.suppress_blur_globally,
        };
        *slot = enabled;
    }

    /// Merge defaults into a stored value without clobbering it.
    ///
    /// Returns the typed settings and the merged object. The merged object
    /// differs from `stored` only by backfilled keys (or wholesale
    /// replacement when `stored` was not an object).
    #[must_use]
    pub fn merge_defaults(stored: Option<&Value>) -> Merged {
        let defaults = Self::default();
        let mut object = match stored {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                tracing::warn!(
                    target: TARGET,
                    found = %kind_of(other),
                    "stored settings are not an object; replacing with defaults"
                );
                Map::new()
            }
            None => Map::new(),
        };

        let mut settings = defaults;
        let mut backfilled = Vec::new();
        for key in SettingKey::ALL {
            match object.get(key.as_str()) {
                Some(Value::Bool(value)) => settings.set(key, *value),
                Some(other) => {
                    tracing::warn!(
                        target: TARGET,
                        key = key.as_str(),
                        found = %kind_of(other),
                        "setting has the wrong type; using default"
                    );
                }
                None => {
                    object.insert(key.as_str().to_owned(), Value::Bool(defaults.get(key)));
                    backfilled.push(key);
                }
            }
        }

        let replaced = matches!(stored, Some(v) if !v.is_object());
        Merged {
            settings,
            value: Value::Object(object),
            backfilled,
            replaced,
        }
    }

    /// Load settings from `store`, writing the merged object back only if
    /// something had to be backfilled.
    pub fn load(store: &mut dyn SettingsStore) -> Self {
        let stored = store.load();
        let merged = Self::merge_defaults(stored.as_ref());
        if merged.needs_save() {
            tracing::debug!(
                target: TARGET,
                backfilled = merged.backfilled.len(),
                replaced = merged.replaced,
                "persisting backfilled settings"
            );
            store.save(&merged.value);
        }
        merged.settings
    }

    /// Persist a single toggle, preserving every other stored key.
    pub fn persist(&mut self, key: SettingKey, enabled: bool, store: &mut dyn SettingsStore) {
        self.set(key, enabled);
        let stored = store.load();
        let mut merged = Self::merge_defaults(stored.as_ref());
        if let Value::Object(map) = &mut merged.value {
            map.insert(key.as_str().to_owned(), Value::Bool(enabled));
        }
        store.save(&merged.value);
    }
}

/// Result of [`Settings::merge_defaults`].
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// Typed view of the merged settings.
    pub settings: Settings,
    /// The merged object to persist.
    pub value: Value,
    /// Keys that were missing and got their defaults.
    pub backfilled: Vec<SettingKey>,
    /// Whether the stored value was not an object and got replaced.
    pub replaced: bool,
}

impl Merged {
    /// Whether the merged object differs from what was stored.
    #[must_use]
    pub fn needs_save(&self) -> bool {
        self.replaced || !self.backfilled.is_empty()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// External persistence for the settings object.
///
/// Hosts typically back this with their extension-settings blob and a
/// debounced save.
pub trait SettingsStore {
    /// The stored object, if any.
    fn load(&self) -> Option<Value>;

    /// Replace the stored object.
    fn save(&mut self, value: &Value);
}

/// In-memory [`SettingsStore`] that counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    value: Option<Value>,
    saves: usize,
}

impl MemorySettingsStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `value`.
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            saves: 0,
        }
    }

    /// Current stored value.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Number of times [`SettingsStore::save`] was called.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Option<Value> {
        self.value.clone()
    }

    fn save(&mut self, value: &Value) {
        self.value = Some(value.clone());
        self.saves += 1;
    }
}
