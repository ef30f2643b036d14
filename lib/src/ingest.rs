use std::path::{Path, PathBuf};
use std::sync::Arc;

use either::Either;
use glob::Pattern;
use parking_lot::Mutex;

use crate::error::{Chainable, Fault, Result};
use crate::fstree::{Entry, FsTree};
use crate::markdown::split_frontmatter;
use crate::permalink::default_slug;
use crate::taxonomy::{keys, Document, Metadata, Permalink};
use crate::util::file_name;
use crate::value::Source;

/// Yields the source documents of a pass, in discovery order.
pub trait Provider: Send + Sync {
    fn provide(&self) -> Result<Vec<Document>>;
}

/// Reads documents from a directory.
///
/// UTF-8 files become text documents with their frontmatter split off;
/// anything else is kept as opaque bytes. Files whose relative path, any
/// parent directory, or file name matches an ignore pattern are skipped.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
    ignore: Vec<Pattern>,
}

impl FsProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsProvider { root: root.as_ref().to_path_buf(), ignore: vec![] }
    }

    pub fn ignoring<I, S>(mut self, patterns: I) -> Result<Self>
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        for (i, pattern) in patterns.into_iter().enumerate() {
            let pattern = Pattern::new(pattern.as_ref())
                .map_err(|e| Fault::config(format!("ignore[{i}]"), e.to_string()))?;

            self.ignore.push(pattern);
        }

        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, tree: &FsTree, entry: &Entry) -> bool {
        let matches = |name: &str| !name.is_empty() && self.ignore.iter().any(|p| p.matches(name));
        matches(&entry.identity())
            || matches(&entry.file_name)
            || tree.ancestors_of(entry.id).any(|id| matches(&tree[id].identity()))
    }
}

impl Provider for FsProvider {
    fn provide(&self) -> Result<Vec<Document>> {
        let tree = FsTree::build(&self.root)?;
        let mut documents = vec![];
        for entry in tree.files() {
            if self.is_ignored(&tree, entry) {
                continue;
            }

            let identity = entry.identity();
            let document = match entry.read()? {
                Either::Left(text) => text_document(identity, &text)?,
                Either::Right(bytes) => Document::bytes(identity, bytes),
            };

            documents.push(document);
        }

        Ok(documents)
    }
}

/// Parses `text` into a document, splitting off its frontmatter.
pub fn text_document(identity: impl Into<Arc<str>>, text: &str) -> Result<Document> {
    let identity = identity.into();
    let (frontmatter, body) = split_frontmatter(text)
        .chain_with(|| error!("invalid frontmatter", "document" => &identity))?;

    let metadata = frontmatter.map(Metadata::from).unwrap_or_default();
    Ok(Document::text(identity, body).with_metadata(metadata))
}

/// A fixed set of documents, copied fresh on every call.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    documents: Mutex<Vec<Document>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider::default()
    }

    /// Adds a text document, parsing its frontmatter.
    pub fn add(&self, identity: &str, text: &str) -> Result<&Self> {
        self.documents.lock().push(text_document(identity, text)?);
        Ok(self)
    }

    pub fn add_bytes(&self, identity: &str, bytes: &[u8]) -> &Self {
        self.documents.lock().push(Document::bytes(identity, bytes));
        self
    }

    pub fn remove(&self, identity: &str) {
        self.documents.lock().retain(|d| &*d.identity != identity);
    }
}

impl Provider for MemoryProvider {
    fn provide(&self) -> Result<Vec<Document>> {
        Ok(self.documents.lock().iter().map(Document::fork).collect())
    }
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn provide(&self) -> Result<Vec<Document>> {
        (**self).provide()
    }
}

/// Interprets the frontmatter keys the pipeline owns: `slug` gets a default,
/// `permalink`, `layout`, and `locale` move onto the document, and error
/// pages (`404.*`, `500.*`) have their permalink disabled.
pub fn prepare(document: &mut Document) {
    let slug = default_slug(document);
    document.metadata.insert(keys::Slug, slug);

    document.permalink = Permalink::from_value(document.metadata.get_ok(keys::Permalink).as_ref());
    let stem = file_name(&document.identity).split('.').next().unwrap_or_default();
    if matches!(stem, "404" | "500") {
        document.permalink = Permalink::Disabled;
    }

    if let Some(layout) = document.metadata.get_ok(keys::Layout).filter(|l| !l.is_empty()) {
        document.layout = Some(layout);
    }

    if let Some(locale) = document.metadata.get_ok(keys::Locale).filter(|l| !l.is_empty()) {
        document.locale = Some(locale);
    }
}
