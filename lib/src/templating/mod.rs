pub mod minijinja;

use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;

use crate::collection::Collections;
use crate::error::Result;
use crate::paginate::PageLink;
use crate::taxonomy::{DocId, Document, DocumentSet};
use crate::value::Dict;

/// A layout engine.
pub trait Engine: Send + Sync + Debug {
    /// The file extension given to bare layout names, without the dot.
    fn extension(&self) -> &str;

    /// Renders the layout `name` with `page` as the context.
    fn render(&self, name: &str, page: &Page) -> Result<String>;

    /// Renders `template` itself, reporting errors against `name`.
    fn render_str(&self, name: &str, template: &str, page: &Page) -> Result<String>;
}

/// `name` with the engine's extension appended unless it already has one.
pub fn layout_name(name: &str, engine: &dyn Engine) -> String {
    crate::util::ensure_ext(name, engine.extension())
}

/// The context a document is rendered with.
///
/// Frontmatter keys are top-level variables; so are the fields below, which
/// win over frontmatter keys of the same name.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    #[serde(flatten)]
    pub metadata: Dict,
    pub identity: Arc<str>,
    pub path: Option<String>,
    /// The rendered body, empty for binary documents.
    pub contents: Arc<str>,
    /// Names of the collections the document belongs to.
    pub collections: Vec<Arc<str>>,
    /// Neighbours in the document's first collection.
    pub next: Option<Summary>,
    pub previous: Option<Summary>,
    pub pagination: Option<PageView>,
    pub locale: Option<Arc<str>>,
    pub locales: Vec<Arc<str>>,
}

/// Another document as seen from a page.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    #[serde(flatten)]
    pub metadata: Dict,
    pub identity: Arc<str>,
    pub path: Option<String>,
    pub contents: Arc<str>,
}

/// A page shell's slot, with its documents resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub collection: Arc<str>,
    pub files: Vec<Summary>,
    pub index: usize,
    pub num: usize,
    pub pages: Arc<[PageLink]>,
    pub next: Option<PageLink>,
    pub previous: Option<PageLink>,
}

impl Summary {
    pub fn of(document: &Document) -> Summary {
        Summary {
            metadata: document.metadata.snapshot(),
            identity: document.identity.clone(),
            path: document.path.clone(),
            contents: document.as_text().map(Arc::from).unwrap_or_else(|| "".into()),
        }
    }
}

impl Page {
    /// The context of `id` in `set`, rendered in `locale`.
    pub fn of(
        set: &DocumentSet,
        collections: &Collections,
        id: DocId,
        locale: Option<&Arc<str>>,
        locales: &[Arc<str>],
    ) -> Page {
        let document = &set[id];
        let neighbour = |offset: isize| -> Option<Summary> {
            let membership = document.collections.first()?;
            let members = collections.get(&membership.name)?;
            let index = membership.index.checked_add_signed(offset)?;
            let member = set.get(*members.get(index)?)?;

            // Clones share their source's membership; prefer the copy in
            // this document's locale.
            let member = match (&document.locale, &member.locale) {
                (Some(own), None) => set.by_identity(&format!("{own}/{}", member.identity))
                    .and_then(|id| set.get(id))
                    .unwrap_or(member),
                _ => member,
            };

            Some(Summary::of(member))
        };

        let pagination = document.pagination.as_ref().map(|p| PageView {
            collection: p.collection.clone(),
            files: p.files.iter().filter_map(|id| set.get(*id)).map(Summary::of).collect(),
            index: p.index,
            num: p.num,
            pages: p.pages.clone(),
            next: p.next.clone(),
            previous: p.previous.clone(),
        });

        let Summary { metadata, identity, path, contents } = Summary::of(document);
        Page {
            metadata,
            identity,
            path,
            contents,
            collections: document.collections.iter().map(|m| m.name.clone()).collect(),
            next: neighbour(1),
            previous: neighbour(-1),
            pagination,
            locale: document.locale.clone().or_else(|| locale.cloned()),
            locales: locales.to_vec(),
        }
    }
}
