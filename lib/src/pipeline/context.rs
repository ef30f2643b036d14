use std::sync::Arc;

use crate::collection::Collections;
use crate::tags::TagListing;
use crate::taxonomy::DocumentSet;

/// The state one pass threads through its stages.
#[derive(Debug, Default)]
pub struct Context {
    /// The pass locale, `None` without i18n.
    pub locale: Option<Arc<str>>,
    /// Every configured locale, default first. Empty without i18n.
    pub locales: Vec<Arc<str>>,
    pub documents: DocumentSet,
    pub collections: Collections,
    pub listings: Vec<TagListing>,
    pub emitted: Vec<Emitted>,
}

/// A document handed to the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub identity: Arc<str>,
    pub path: Option<String>,
    /// Output file relative to the output root.
    pub location: String,
}

impl Context {
    pub fn new(locale: Option<Arc<str>>, locales: Vec<Arc<str>>) -> Self {
        Context { locale, locales, ..Context::default() }
    }

    /// `"[fr] "` in a locale pass, empty otherwise.
    pub fn log_prefix(&self) -> String {
        match &self.locale {
            Some(locale) => format!("[{locale}] "),
            None => String::new(),
        }
    }
}
