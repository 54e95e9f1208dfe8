//! Runtime configuration

use serde::Deserialize;

use crate::gc::DEFAULT_GC_THRESHOLD;
use crate::prelude::*;

/// Settings applied when an [`Interpreter`](crate::Interpreter) is created.
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```
/// use jsview::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "gcThreshold": 1 }"#).unwrap();
/// assert_eq!(config.gc_threshold, 1);
/// assert_eq!(config.default_locale, "en-US");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Net allocations between automatic collections (0 = manual only)
    pub gc_threshold: usize,
    /// Locale reported by NumberFormats created without one
    pub default_locale: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            default_locale: "en-US".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Defaults, with `GC_THRESHOLD` taken from the environment when it
    /// parses as an integer.
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threshold) = std::env::var("GC_THRESHOLD")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            config.gc_threshold = threshold;
        }
        config
    }

    pub fn with_gc_threshold(mut self, threshold: usize) -> Self {
        self.gc_threshold = threshold;
        self
    }
}
