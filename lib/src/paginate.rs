use std::sync::Arc;

use serde::Serialize;

use crate::error::{Fault, Result};
use crate::path::normalize;
use crate::taxonomy::{DocId, Document, DocumentSet, Permalink};
use crate::value::Dict;

/// How a collection is split into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRule {
    /// Documents per page. Zero disables pagination.
    pub per_page: usize,
    /// Pattern for page paths, containing `:num`.
    pub path: Option<Arc<str>>,
    /// Path of the first page, overriding `path` for it. `:num` is `1`.
    pub first: Option<Arc<str>>,
    /// Layout for the page shells.
    pub layout: Option<Arc<str>>,
    /// Extra metadata for every shell.
    pub metadata: Dict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub path: String,
}

/// The slot a page shell occupies in a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub collection: Arc<str>,
    /// This page's documents, in collection order.
    pub files: Vec<DocId>,
    /// Zero-based.
    pub index: usize,
    /// One-based; always `index + 1`.
    pub num: usize,
    /// Every page of the collection, shared between its shells.
    pub pages: Arc<[PageLink]>,
    pub next: Option<PageLink>,
    pub previous: Option<PageLink>,
}

impl PageRule {
    /// Validates a configured rule. `field` is the dotted configuration path
    /// used in errors.
    pub fn new(
        field: &str,
        per_page: i64,
        path: Option<&str>,
        first: Option<&str>,
        layout: Option<&str>,
    ) -> Result<PageRule> {
        let per_page = usize::try_from(per_page).ok().filter(|n| *n > 0)
            .ok_or_else(|| Fault::config(
                format!("{field}.per_page"),
                format!("page size must be a positive integer, found {per_page}"),
            ))?;

        if let Some(path) = path {
            if !path.contains(":num") {
                let reason = format!("page path `{path}` does not contain `:num`");
                return Err(Fault::config(format!("{field}.path"), reason).into());
            }
        }

        if let Some(first) = first {
            if first.trim().is_empty() {
                return Err(Fault::config(format!("{field}.first"), "first page path is empty").into());
            }
        }

        Ok(PageRule {
            per_page,
            path: path.map(Arc::from),
            first: first.map(Arc::from),
            layout: layout.map(Arc::from),
            metadata: Dict::new(),
        })
    }

    /// A rule with the default `/name/`, `/name/N/` paths.
    pub fn with_per_page(per_page: usize) -> PageRule {
        PageRule { per_page, path: None, first: None, layout: None, metadata: Dict::new() }
    }

    /// The normalized path of page `num` (one-based) of collection `name`.
    ///
    /// ```rust
    /// use smithy::paginate::PageRule;
    ///
    /// let rule = PageRule::with_per_page(5);
    /// assert_eq!(rule.page_path("blog", 1), "/blog/");
    /// assert_eq!(rule.page_path("blog", 3), "/blog/3/");
    ///
    /// let rule = PageRule::new("c", 5, Some("news/page/:num"), Some("news"), None).unwrap();
    /// assert_eq!(rule.page_path("blog", 1), "/news/");
    /// assert_eq!(rule.page_path("blog", 2), "/news/page/2/");
    /// ```
    pub fn page_path(&self, name: &str, num: usize) -> String {
        let path = match (&self.path, &self.first) {
            (_, Some(first)) if num == 1 => first.replace(":num", "1"),
            (Some(path), _) => path.replace(":num", &num.to_string()),
            (None, _) if num == 1 => format!("/{name}/"),
            (None, _) => format!("/{name}/{num}/"),
        };

        normalize(&path)
    }
}

/// Splits `documents` into pages of `rule.per_page`. Empty input or a zero
/// page size yields no pages.
pub fn paginate(name: &str, documents: &[DocId], rule: &PageRule) -> Vec<Pagination> {
    if documents.is_empty() || rule.per_page == 0 {
        return vec![];
    }

    let chunks: Vec<&[DocId]> = documents.chunks(rule.per_page).collect();
    let pages: Arc<[PageLink]> = (1..=chunks.len())
        .map(|num| PageLink { path: rule.page_path(name, num) })
        .collect();

    let collection: Arc<str> = name.into();
    chunks.into_iter()
        .enumerate()
        .map(|(index, files)| Pagination {
            collection: collection.clone(),
            files: files.to_vec(),
            index,
            num: index + 1,
            next: pages.get(index + 1).cloned(),
            previous: index.checked_sub(1).and_then(|i| pages.get(i)).cloned(),
            pages: pages.clone(),
        })
        .collect()
}

/// Adds one shell document per page to `set`, at identity
/// `{name}/{num}/index`, and returns their ids in page order.
pub fn attach(
    set: &mut DocumentSet,
    pages: Vec<Pagination>,
    rule: &PageRule,
    layout: Option<&Arc<str>>,
) -> Result<Vec<DocId>> {
    let mut shells = Vec::with_capacity(pages.len());
    for pagination in pages {
        let identity = format!("{}/{}/index", pagination.collection, pagination.num);
        let mut shell = Document::text(identity, "");
        shell.metadata.append_all(&rule.metadata);
        shell.path = Some(pagination.pages[pagination.index].path.clone());
        shell.permalink = Permalink::Disabled;
        shell.layout = rule.layout.clone().or_else(|| layout.cloned());
        shell.pagination = Some(pagination);
        shells.push(set.insert(shell)?);
    }

    Ok(shells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<DocId> {
        (0..n).map(DocId).collect()
    }

    #[test]
    fn twelve_by_five() {
        let pages = paginate("blog", &ids(12), &PageRule::with_per_page(5));
        assert_eq!(pages.len(), 3);

        let paths: Vec<_> = pages[0].pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["/blog/", "/blog/2/", "/blog/3/"]);

        assert_eq!(pages[0].previous, None);
        assert_eq!(pages[0].next.as_ref().unwrap().path, "/blog/2/");
        assert_eq!(pages[1].previous.as_ref().unwrap().path, "/blog/");
        assert_eq!(pages[2].previous.as_ref().unwrap().path, "/blog/2/");
        assert_eq!(pages[2].next, None);

        assert_eq!(pages[2].files, ids(12)[10..]);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.index, i);
            assert_eq!(page.num, page.index + 1);
            assert!(Arc::ptr_eq(&page.pages, &pages[0].pages));
        }
    }

    #[test]
    fn nothing_to_paginate() {
        assert!(paginate("blog", &[], &PageRule::with_per_page(5)).is_empty());
        assert!(paginate("blog", &ids(3), &PageRule::with_per_page(0)).is_empty());
    }

    #[test]
    fn path_without_first_numbers_page_one() {
        let rule = PageRule::new("c", 2, Some("archive/:num"), None, None).unwrap();
        let pages = paginate("blog", &ids(3), &rule);
        assert_eq!(pages[0].pages[0].path, "/archive/1/");
        assert_eq!(pages[1].previous.as_ref().unwrap().path, "/archive/1/");
    }

    #[test]
    fn first_page_numbers_itself_one() {
        let rule = PageRule::new("c", 2, Some("archive/:num"), Some("start/:num"), None).unwrap();
        assert_eq!(rule.page_path("blog", 1), "/start/1/");
        assert_eq!(rule.page_path("blog", 2), "/archive/2/");
    }

    #[test]
    fn invalid_rules() {
        let error = PageRule::new("collections.blog.paginate", 0, None, None, None).unwrap_err();
        assert!(error.to_string().contains("collections.blog.paginate.per_page"));
        assert!(PageRule::new("c", -3, None, None, None).is_err());
        assert!(PageRule::new("c", 5, Some("blog/page"), None, None).is_err());
    }

    #[test]
    fn shells_join_the_set() {
        let mut set = DocumentSet::new();
        let rule = PageRule::with_per_page(2);
        let layout: Arc<str> = "blog.html".into();
        let pages = paginate("blog", &ids(3), &rule);
        let shells = attach(&mut set, pages, &rule, Some(&layout)).unwrap();

        assert_eq!(shells.len(), 2);
        let second = &set[shells[1]];
        assert_eq!(&*second.identity, "blog/2/index");
        assert_eq!(second.path.as_deref(), Some("/blog/2/"));
        assert_eq!(second.layout.as_deref(), Some("blog.html"));
        assert_eq!(second.pagination.as_ref().unwrap().files, ids(3)[2..]);
    }
}
