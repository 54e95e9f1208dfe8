//! String dictionary for deduplicating JsString instances.
//!
//! Property names of the built-in prototypes are interned once so that every
//! key installed on or looked up from them shares one `Rc<str>`.

use crate::prelude::*;
use crate::value::{CheapClone, JsString};

/// A dictionary for deduplicating JsString instances.
///
/// Strings inserted into the dictionary are stored once and subsequent
/// requests for the same string return a cheap clone of the existing instance.
pub struct StringDict {
    /// Using Box<str> as key to avoid double-indirection through Rc.
    strings: FxHashMap<Box<str>, JsString>,
}

impl StringDict {
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with the built-in property names.
    pub fn with_builtin_names() -> Self {
        let mut dict = Self::new();
        for s in BUILTIN_NAMES {
            dict.get_or_insert(s);
        }
        dict
    }

    /// Get an existing string or insert a new one.
    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.strings.get(s) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from(s);
        self.strings.insert(s.into(), js_str.cheap_clone());
        js_str
    }

    /// Get an existing string without inserting.
    pub fn get(&self, s: &str) -> Option<JsString> {
        self.strings.get(s).map(|s| s.cheap_clone())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

/// Names installed on the built-in prototypes.
const BUILTIN_NAMES: &[&str] = &[
    // Function objects
    "length",
    "name",
    // ArrayBuffer
    "byteLength",
    "detached",
    // Typed array views
    "buffer",
    "byteOffset",
    "at",
    "every",
    "find",
    "findIndex",
    "forEach",
    // Intl.NumberFormat
    "format",
    "resolvedOptions",
    "locale",
    "style",
    "minimumFractionDigits",
    "maximumFractionDigits",
    "useGrouping",
    "decimal",
    "percent",
];
