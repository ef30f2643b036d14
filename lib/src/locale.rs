use std::sync::Arc;

use serde::Deserialize;

use crate::collection::{forget, reindex, Collections};
use crate::error::{Fault, Result};
use crate::taxonomy::{DocumentSet, DocId};

/// The configured locales. The first one is the default and is never used as
/// a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locales {
    list: Arc<[Arc<str>]>,
}

/// How documents are expanded across locales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expand {
    /// One pass per locale; each pass moves unprefixed documents under the
    /// pass locale.
    #[default]
    Rewrite,
    /// One pass; every document is copied under each non-default locale.
    Clone,
    /// One pass per locale without touching identities.
    Off,
}

impl Locales {
    /// Fails if `list` is empty or repeats a locale.
    pub fn new<I, S>(list: I) -> Result<Locales>
        where I: IntoIterator<Item = S>, S: Into<Arc<str>>
    {
        let list: Vec<Arc<str>> = list.into_iter().map(Into::into).collect();
        if list.is_empty() {
            return Err(Fault::config("i18n.locales", "at least one locale is required").into());
        }

        for (i, locale) in list.iter().enumerate() {
            if locale.trim().is_empty() || locale.contains('/') {
                let reason = format!("`{locale}` is not a valid locale name");
                return Err(Fault::config(format!("i18n.locales[{i}]"), reason).into());
            }

            if list[..i].contains(locale) {
                let reason = format!("`{locale}` is listed more than once");
                return Err(Fault::config(format!("i18n.locales[{i}]"), reason).into());
            }
        }

        Ok(Locales { list: list.into() })
    }

    pub fn default_locale(&self) -> &Arc<str> {
        &self.list[0]
    }

    pub fn is_default(&self, locale: &str) -> bool {
        &*self.list[0] == locale
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.list.iter().any(|l| &**l == locale)
    }

    /// The known locale `identity` is filed under, if any.
    pub fn prefix_of<'a>(&'a self, identity: &str) -> Option<&'a Arc<str>> {
        let first = identity.split('/').next()?;
        self.list.iter().find(|l| &***l == first)
    }

    pub fn as_slice(&self) -> &[Arc<str>] {
        &self.list
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
        self.list.iter()
    }
}

/// Scopes the documents of one pass to locales.
///
/// Documents filed under a locale directory are tagged with it. Documents
/// whose `locale` is unknown fail the pass.
///
/// In [`Expand::Rewrite`] with a non-default `current` locale, every other
/// document moves to `{current}/{identity}`. When that identity is already
/// taken by an explicit translation, the source document is dropped from the
/// pass and the translation takes its place in the source's collections,
/// inheriting its layout unless it names its own.
///
/// In [`Expand::Clone`] every untagged document is copied to
/// `{locale}/{identity}` for each non-default locale not yet present.
///
/// Outside of clone mode, documents tagged with a locale other than
/// `current` are dropped from the pass. Every mode is a no-op when re-run.
pub fn expand(
    set: &mut DocumentSet,
    collections: &mut Collections,
    locales: &Locales,
    mode: Expand,
    current: Option<&str>,
) -> Result<()> {
    for (_, doc) in set.iter_mut() {
        if let Some(locale) = &doc.locale {
            if !locales.contains(locale) {
                let reason = format!("document `{}` names unknown locale `{locale}`", doc.identity);
                return Err(Fault::config("locale", reason).into());
            }
        } else if let Some(prefix) = locales.prefix_of(&doc.identity) {
            doc.locale = Some(prefix.clone());
        }
    }

    if mode == Expand::Clone {
        return clone(set, locales);
    }

    let Some(current) = current else { return Ok(()) };
    let current: Arc<str> = locales.iter()
        .find(|l| &***l == current)
        .cloned()
        .ok_or_else(|| Fault::config("locale", format!("unknown pass locale `{current}`")))?;

    scope(set, collections, &current);
    if mode == Expand::Rewrite && !locales.is_default(&current) {
        rewrite(set, collections, locales, &current)?;
    }

    Ok(())
}

/// Drops documents tagged with a locale other than `current`.
fn scope(set: &mut DocumentSet, collections: &mut Collections, current: &Arc<str>) {
    let mut dropped = vec![];
    for id in set.ids() {
        if set[id].locale.as_ref().map_or(false, |l| l != current) {
            set.retire(id);
            dropped.push(id);
        }
    }

    if !dropped.is_empty() {
        forget(set, collections, &dropped);
    }
}

fn rewrite(
    set: &mut DocumentSet,
    collections: &mut Collections,
    locales: &Locales,
    current: &Arc<str>,
) -> Result<()> {
    let mut replaced: Vec<(DocId, DocId)> = vec![];
    for id in set.ids() {
        let doc = &set[id];
        if locales.prefix_of(&doc.identity).is_some() || doc.locale.is_some() {
            continue;
        }

        let target = format!("{current}/{}", doc.identity);
        match set.by_identity(&target) {
            Some(translation) => {
                let Some(source) = set.retire(id) else { continue };
                let translation_doc = &mut set[translation];
                if translation_doc.layout.is_none() {
                    translation_doc.layout = source.layout;
                }

                for membership in source.collections {
                    if translation_doc.membership(&membership.name).is_none() {
                        translation_doc.collections.push(membership);
                    }
                }

                replaced.push((id, translation));
            }
            None => {
                set.rename(id, target)?;
                set[id].locale = Some(current.clone());
            }
        }
    }

    if replaced.is_empty() {
        return Ok(());
    }

    for members in collections.values_mut() {
        let mut seen = Vec::with_capacity(members.len());
        for id in members.iter() {
            let id = replaced.iter().find(|(old, _)| old == id).map_or(*id, |(_, new)| *new);
            if !seen.contains(&id) {
                seen.push(id);
            }
        }

        *members = seen;
    }

    reindex(set, collections);
    Ok(())
}

fn clone(set: &mut DocumentSet, locales: &Locales) -> Result<()> {
    for id in set.ids() {
        if set[id].locale.is_some() {
            continue;
        }

        for locale in locales.iter().skip(1) {
            let target = format!("{locale}/{}", set[id].identity);
            if set.contains(&target) {
                continue;
            }

            let mut copy = set[id].fork();
            copy.identity = target.into();
            copy.locale = Some(locale.clone());
            set.insert(copy)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{group, Grouping};
    use crate::taxonomy::{keys, Document};

    fn locales() -> Locales {
        Locales::new(["en", "fr", "de"]).unwrap()
    }

    fn docs(identities: &[&str]) -> DocumentSet {
        identities.iter()
            .map(|id| Document::text(*id, ""))
            .collect::<Result<_>>()
            .unwrap()
    }

    fn identities(set: &DocumentSet) -> Vec<String> {
        set.iter().map(|(_, d)| d.identity.to_string()).collect()
    }

    #[test]
    fn locale_lists_are_validated() {
        assert!(Locales::new(Vec::<&str>::new()).is_err());
        let error = Locales::new(["en", "fr", "en"]).unwrap_err();
        assert!(error.to_string().contains("i18n.locales[2]"));
        assert!(locales().is_default("en"));
        assert_eq!(locales().prefix_of("fr/a.md").map(|l| &**l), Some("fr"));
        assert_eq!(locales().prefix_of("french/a.md"), None);
    }

    #[test]
    fn rewrite_moves_under_the_pass_locale() {
        let mut set = docs(&["a.md", "b.md", "fr/b.md"]);
        let mut collections = group(&mut set, &[Grouping::new("all", "**").unwrap()]);

        expand(&mut set, &mut collections, &locales(), Expand::Rewrite, Some("fr")).unwrap();
        assert_eq!(identities(&set), ["fr/a.md", "fr/b.md"]);
        assert_eq!(collections["all"].len(), 2);
        for (_, doc) in set.iter() {
            assert_eq!(doc.locale.as_deref(), Some("fr"));
        }

        let fr_b = set.by_identity("fr/b.md").unwrap();
        assert_eq!(set[fr_b].membership("all").unwrap().index, 1);

        // Re-running changes nothing.
        expand(&mut set, &mut collections, &locales(), Expand::Rewrite, Some("fr")).unwrap();
        assert_eq!(identities(&set), ["fr/a.md", "fr/b.md"]);
    }

    #[test]
    fn translations_replace_their_sources() {
        let mut set = docs(&["blog/a.md", "blog/b.md", "fr/blog/a.md"]);
        let mut collections = group(&mut set, &[Grouping::new("blog", "blog/*").unwrap()]);

        expand(&mut set, &mut collections, &locales(), Expand::Rewrite, Some("fr")).unwrap();
        let members: Vec<_> = collections["blog"].iter().map(|id| set[*id].identity.to_string()).collect();
        assert_eq!(members, ["fr/blog/a.md", "fr/blog/b.md"]);

        let a = set.by_identity("fr/blog/a.md").unwrap();
        assert_eq!(set[a].membership("blog").unwrap().index, 0);
        assert_eq!(set[a].layout.as_deref(), Some("blog"));
    }

    #[test]
    fn rewrite_leaves_the_default_locale_alone() {
        let mut set = docs(&["a.md", "b.md", "fr/a.md"]);
        let mut collections = group(&mut set, &[Grouping::new("all", "**").unwrap()]);
        expand(&mut set, &mut collections, &locales(), Expand::Rewrite, Some("en")).unwrap();
        assert_eq!(identities(&set), ["a.md", "b.md"]);
        assert_eq!(collections["all"].len(), 2);

        let a = set.by_identity("a.md").unwrap();
        assert_eq!(set[a].locale, None);
    }

    #[test]
    fn passes_only_keep_their_own_translations() {
        let mut set = docs(&["a.md", "de/a.md", "fr/b.md"]);
        let mut collections = group(&mut set, &[Grouping::new("all", "**").unwrap()]);
        expand(&mut set, &mut collections, &locales(), Expand::Off, Some("fr")).unwrap();
        assert_eq!(identities(&set), ["a.md", "fr/b.md"]);

        let b = set.by_identity("fr/b.md").unwrap();
        assert_eq!(set[b].membership("all").unwrap().index, 1);
    }

    #[test]
    fn clone_copies_without_overwriting() {
        let mut set = docs(&["a.md", "de/a.md"]);
        let a = set.by_identity("a.md").unwrap();
        set[a].metadata.insert(keys::Title, "Hello");

        let mut collections = Collections::new();
        expand(&mut set, &mut collections, &locales(), Expand::Clone, None).unwrap();
        assert_eq!(identities(&set), ["a.md", "de/a.md", "fr/a.md"]);

        let fr = set.by_identity("fr/a.md").unwrap();
        set[fr].metadata.insert(keys::Title, "Bonjour");
        assert_eq!(&*set[a].title().unwrap(), "Hello");
        assert_eq!(set[fr].locale.as_deref(), Some("fr"));

        expand(&mut set, &mut collections, &locales(), Expand::Clone, None).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn unknown_document_locales_fail() {
        let mut set = docs(&["a.md"]);
        let a = set.by_identity("a.md").unwrap();
        set[a].locale = Some("xx".into());

        let error = expand(&mut set, &mut Collections::new(), &locales(), Expand::Off, None);
        assert!(error.unwrap_err().to_string().contains("unknown locale `xx`"));
    }
}
