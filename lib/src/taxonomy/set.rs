use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::taxonomy::Document;

/// A stable handle to a document in a [`DocumentSet`]. Unlike the identity,
/// it never changes once assigned.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub(crate) usize);

/// Every document of one pass, in discovery order, indexed by identity.
#[derive(Debug, Default, Clone)]
pub struct DocumentSet {
    slots: Vec<Option<Document>>,
    index: FxHashMap<Arc<str>, DocId>,
}

impl DocumentSet {
    pub fn new() -> Self {
        DocumentSet::default()
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn insert(&mut self, document: Document) -> Result<DocId> {
        if let Some(existing) = self.index.get(&document.identity) {
            return err! {
                "duplicate document identity",
                "identity" => &document.identity,
                "existing" => format!("{existing:?}"),
            };
        }

        let id = DocId(self.slots.len());
        self.index.insert(document.identity.clone(), id);
        self.slots.push(Some(document));
        Ok(id)
    }

    /// Changes the identity of `id` to `identity`. Fails, leaving the set
    /// untouched, if another live document already has that identity.
    pub fn rename<I: Into<Arc<str>>>(&mut self, id: DocId, identity: I) -> Result<()> {
        let identity = identity.into();
        match self.index.get(&identity) {
            Some(&owner) if owner == id => return Ok(()),
            Some(_) => return err! {
                "document identity is already taken",
                "identity" => &identity,
            },
            None => {}
        }

        let Some(document) = self.get_mut(id) else {
            return err!("attempted to rename a retired document", "identity" => &identity);
        };

        let old = std::mem::replace(&mut document.identity, identity.clone());
        self.index.remove(&old);
        self.index.insert(identity, id);
        Ok(())
    }

    /// Removes `id` from the set. Its slot stays empty so other handles remain
    /// valid.
    pub fn retire(&mut self, id: DocId) -> Option<Document> {
        let document = self.slots.get_mut(id.0)?.take()?;
        self.index.remove(&document.identity);
        Some(document)
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: DocId) -> Option<&mut Document> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    pub fn by_identity(&self, identity: &str) -> Option<DocId> {
        self.index.get(identity).copied()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Live documents in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.slots.iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((DocId(i), slot.as_ref()?)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (DocId, &mut Document)> {
        self.slots.iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| Some((DocId(i), slot.as_mut()?)))
    }

    /// Identities must not be changed through this iterator.
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = (DocId, &mut Document)> {
        self.slots.par_iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| Some((DocId(i), slot.as_mut()?)))
    }

    pub fn ids(&self) -> Vec<DocId> {
        self.iter().map(|(id, _)| id).collect()
    }
}

impl FromIterator<Document> for Result<DocumentSet> {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        let mut set = DocumentSet::new();
        for document in iter {
            set.insert(document)?;
        }

        Ok(set)
    }
}

impl std::ops::Index<DocId> for DocumentSet {
    type Output = Document;

    #[track_caller]
    fn index(&self, id: DocId) -> &Self::Output {
        match self.get(id) {
            Some(document) => document,
            None => panic!("document {id:?} was retired"),
        }
    }
}

impl std::ops::IndexMut<DocId> for DocumentSet {
    #[track_caller]
    fn index_mut(&mut self, id: DocId) -> &mut Self::Output {
        match self.get_mut(id) {
            Some(document) => document,
            None => panic!("document {id:?} was retired"),
        }
    }
}

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(identities: &[&str]) -> DocumentSet {
        identities.iter()
            .map(|id| Document::text(*id, ""))
            .collect::<Result<DocumentSet>>()
            .unwrap()
    }

    #[test]
    fn identities_stay_unique() {
        let mut docs = set(&["a.html", "b.html"]);
        assert!(docs.insert(Document::text("a.html", "")).is_err());

        let a = docs.by_identity("a.html").unwrap();
        assert!(docs.rename(a, "b.html").is_err());
        assert_eq!(&*docs[a].identity, "a.html");

        docs.rename(a, "en/a.html").unwrap();
        assert!(!docs.contains("a.html"));
        assert_eq!(docs.by_identity("en/a.html"), Some(a));
    }

    #[test]
    fn retired_slots_keep_handles_stable() {
        let mut docs = set(&["a.html", "b.html", "c.html"]);
        let b = docs.by_identity("b.html").unwrap();
        let c = docs.by_identity("c.html").unwrap();

        docs.retire(b).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.get(b).is_none());
        assert_eq!(&*docs[c].identity, "c.html");

        let order: Vec<_> = docs.iter().map(|(_, d)| d.identity.to_string()).collect();
        assert_eq!(order, ["a.html", "c.html"]);
    }
}
