use std::sync::Arc;

use chrono::NaiveDateTime;
use derive_more::Debug;
use either::Either;

use crate::paginate::Pagination;
use crate::taxonomy::Metadata;
use crate::value::Value;

/// Frontmatter keys the pipeline itself reads or writes.
pub mod keys {
    use super::*;

    crate::define_meta_key! {
        pub Slug : "slug" => Arc<str>,
        pub Title : "title" => Arc<str>,
        pub Type : "type" => Arc<str>,
        pub Date : "date" => NaiveDateTime,
        pub Layout : "layout" => Arc<str>,
        pub Locale : "locale" => Arc<str>,
        pub Permalink : "permalink" => Value,
    }
}

/// How a document wants its output path computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Permalink {
    /// Use the pattern configured for the document's type.
    #[default]
    Default,
    /// Use this pattern instead of the configured one.
    Pattern(Arc<str>),
    /// Never compute a path from a pattern (error pages and the like).
    Disabled,
}

impl Permalink {
    /// Interprets a frontmatter `permalink` value: `false` disables, a
    /// non-empty string is a pattern, anything else keeps the default.
    pub fn from_value(value: Option<&Value>) -> Permalink {
        match value {
            Some(Value::Bool(false)) => Permalink::Disabled,
            Some(Value::String(s)) if !s.trim().is_empty() => Permalink::Pattern(s.clone()),
            _ => Permalink::Default,
        }
    }
}

/// A document's place in a collection's final order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub name: Arc<str>,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Document {
    /// Source-relative path, `/`-separated. Unique within a set.
    pub identity: Arc<str>,
    #[debug(ignore)]
    pub contents: Either<Arc<str>, Arc<[u8]>>,
    pub metadata: Metadata,
    pub path: Option<String>,
    pub permalink: Permalink,
    pub collections: Vec<Membership>,
    pub pagination: Option<Pagination>,
    pub layout: Option<Arc<str>>,
    pub locale: Option<Arc<str>>,
}

impl Document {
    pub fn new<I, C>(identity: I, contents: C) -> Self
        where I: Into<Arc<str>>, C: Into<Either<Arc<str>, Arc<[u8]>>>
    {
        Document {
            identity: identity.into(),
            contents: contents.into(),
            metadata: Metadata::new(),
            path: None,
            permalink: Permalink::Default,
            collections: vec![],
            pagination: None,
            layout: None,
            locale: None,
        }
    }

    pub fn text<I: Into<Arc<str>>, S: Into<Arc<str>>>(identity: I, text: S) -> Self {
        Document::new(identity, Either::Left(text.into()))
    }

    pub fn bytes<I: Into<Arc<str>>, B: Into<Arc<[u8]>>>(identity: I, bytes: B) -> Self {
        Document::new(identity, Either::Right(bytes.into()))
    }

    pub fn with_metadata(self, metadata: Metadata) -> Self {
        Document { metadata, ..self }
    }

    /// A deep copy: mutating the copy's metadata leaves `self` untouched.
    pub fn fork(&self) -> Self {
        Document { metadata: self.metadata.fork(), ..self.clone() }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.contents.as_ref().left().map(|s| &**s)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_ref().either(|s| s.as_bytes(), |b| &b[..])
    }

    pub fn set_text<S: Into<Arc<str>>>(&mut self, text: S) {
        self.contents = Either::Left(text.into());
    }

    /// `true` for `.html` and `.htm` documents, the only ones given output
    /// paths.
    pub fn is_page(&self) -> bool {
        matches!(crate::util::file_ext(&self.identity), Some("html" | "htm"))
    }

    /// The discriminator used to pick a permalink pattern: the `type` field,
    /// else the first collection the document belongs to.
    pub fn kind(&self) -> Option<Arc<str>> {
        self.metadata.get_ok(keys::Type)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.collections.first().map(|m| m.name.clone()))
    }

    pub fn membership(&self, collection: &str) -> Option<&Membership> {
        self.collections.iter().find(|m| &*m.name == collection)
    }

    pub fn title(&self) -> Option<Arc<str>> {
        self.metadata.get_ok(keys::Title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forks_are_independent() {
        let doc = Document::text("blog/a.html", "<p>a</p>");
        doc.metadata.insert(keys::Title, "A");

        let copy = doc.fork();
        copy.metadata.insert(keys::Title, "B");
        assert_eq!(&*doc.title().unwrap(), "A");
        assert_eq!(&*copy.title().unwrap(), "B");
    }

    #[test]
    fn kind_prefers_frontmatter() {
        let mut doc = Document::text("blog/a.html", "");
        assert_eq!(doc.kind(), None);

        doc.collections.push(Membership { name: "blog".into(), index: 0 });
        assert_eq!(doc.kind().as_deref(), Some("blog"));

        doc.metadata.insert(keys::Type, "post");
        assert_eq!(doc.kind().as_deref(), Some("post"));
    }

    #[test]
    fn permalink_values() {
        assert_eq!(Permalink::from_value(Some(&Value::from(false))), Permalink::Disabled);
        assert_eq!(Permalink::from_value(Some(&Value::from(true))), Permalink::Default);
        assert_eq!(Permalink::from_value(None), Permalink::Default);
        assert_eq!(
            Permalink::from_value(Some(&Value::from("x/:slug"))),
            Permalink::Pattern("x/:slug".into())
        );
    }

    #[test]
    fn only_html_is_a_page() {
        assert!(Document::text("a/index.html", "").is_page());
        assert!(Document::text("old.htm", "").is_page());
        assert!(!Document::bytes("img/logo.png", vec![1u8, 2]).is_page());
    }
}
