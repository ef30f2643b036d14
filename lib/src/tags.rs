use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collection::by_key;
use crate::error::{Fault, Result};
use crate::paginate::PageRule;
use crate::taxonomy::{DocId, DocumentSet};
use crate::util::slugify;
use crate::value::Value;

/// Tag index pages: one paginated listing per distinct tag value.
#[derive(Debug, Clone)]
pub struct Tagging {
    /// Frontmatter field holding a document's tags.
    pub field: Arc<str>,
    /// Listing path pattern containing `:tag`.
    pub path: Arc<str>,
    pub layout: Option<Arc<str>>,
    pub sort_by: Option<Arc<str>>,
    pub reverse: bool,
    pub per_page: usize,
}

/// A tag listing ready to be paginated.
#[derive(Debug, Clone)]
pub struct TagListing {
    pub name: Arc<str>,
    pub tag: Arc<str>,
    pub members: Vec<DocId>,
    pub rule: PageRule,
}

impl Tagging {
    pub fn new(field: &str, path: &str, per_page: i64) -> Result<Tagging> {
        if !path.contains(":tag") {
            let reason = format!("tag path `{path}` does not contain `:tag`");
            return Err(Fault::config("tags.path", reason).into());
        }

        let per_page = usize::try_from(per_page).ok().filter(|n| *n > 0)
            .ok_or_else(|| Fault::config("tags.per_page", "page size must be a positive integer"))?;

        Ok(Tagging {
            field: field.into(),
            path: path.into(),
            layout: None,
            sort_by: None,
            reverse: false,
            per_page,
        })
    }

    /// The listing base path for `slug`, without surrounding slashes.
    pub fn base(&self, slug: &str) -> String {
        self.path.replace(":tag", slug).trim_matches('/').to_string()
    }
}

/// The tags of a field value: each element of an array, or the
/// comma-separated parts of a string.
fn tags_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split(',').map(|t| t.trim().to_string()).collect(),
        Value::Array(values) => values.iter().filter_map(|v| v.to_text("%Y-%m-%d")).collect(),
        _ => vec![],
    }
}

/// Builds one listing per distinct tag slug, ordered by slug. Members are in
/// discovery order unless `sort_by` is set.
///
/// Documents tagged with a locale other than `locale` are left out, so each
/// locale lists its own documents.
pub fn tag(set: &DocumentSet, tagging: &Tagging, locale: Option<&str>) -> Vec<TagListing> {
    let mut tags: BTreeMap<String, (String, Vec<DocId>)> = BTreeMap::new();
    for (id, doc) in set.iter() {
        if doc.locale.as_deref().map_or(false, |l| Some(l) != locale) {
            continue;
        }

        let Some(value) = doc.metadata.get_raw(&tagging.field) else { continue };
        for tag in tags_of(&value) {
            let slug = slugify(&tag);
            if slug.is_empty() {
                continue;
            }

            let (_, members) = tags.entry(slug).or_insert_with(|| (tag, vec![]));
            if !members.contains(&id) {
                members.push(id);
            }
        }
    }

    tags.into_iter()
        .map(|(slug, (tag, mut members))| {
            if let Some(field) = &tagging.sort_by {
                let key = |id: &DocId| set[*id].metadata.get_raw(field).filter(|v| !v.is_empty());
                members.sort_by(|a, b| by_key(&key(a), &key(b), tagging.reverse));
            } else if tagging.reverse {
                members.reverse();
            }

            let base = tagging.base(&slug);
            let mut rule = PageRule::with_per_page(tagging.per_page);
            rule.path = Some(format!("{base}/:num").into());
            rule.first = Some(base.as_str().into());
            rule.layout = tagging.layout.clone();
            rule.metadata.insert("tag".into(), Value::from(tag.as_str()));

            TagListing { name: base.into(), tag: tag.into(), members, rule }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::paginate;
    use crate::taxonomy::Document;

    fn tagged(identity: &str, tags: Value) -> Document {
        let doc = Document::text(identity, "");
        doc.metadata.insert_raw("tags", tags);
        doc
    }

    #[test]
    fn groups_by_slug() {
        let set: DocumentSet = vec![
            tagged("a.md", Value::from(vec!["Rust", "Web Dev"])),
            tagged("b.md", Value::from("rust, misc")),
            Document::text("c.md", ""),
        ].into_iter().collect::<Result<_>>().unwrap();

        let tagging = Tagging::new("tags", "/topics/:tag/", 10).unwrap();
        let listings = tag(&set, &tagging, None);
        let names: Vec<_> = listings.iter().map(|l| &*l.name).collect();
        assert_eq!(names, ["topics/misc", "topics/rust", "topics/web-dev"]);

        let rust = &listings[1];
        assert_eq!(&*rust.tag, "Rust");
        assert_eq!(rust.members.len(), 2);

        let pages = paginate(&rust.name, &rust.members, &rust.rule);
        assert_eq!(pages[0].pages[0].path, "/topics/rust/");
    }

    #[test]
    fn other_locales_are_left_out() {
        let mut fr = tagged("fr/a.md", Value::from("rust"));
        fr.locale = Some("fr".into());
        let set: DocumentSet = vec![tagged("a.md", Value::from("rust")), fr]
            .into_iter().collect::<Result<_>>().unwrap();

        let tagging = Tagging::new("tags", "tags/:tag", 10).unwrap();
        assert_eq!(tag(&set, &tagging, Some("en"))[0].members.len(), 1);
        assert_eq!(tag(&set, &tagging, Some("fr"))[0].members.len(), 2);
    }

    #[test]
    fn tag_paths_need_a_placeholder() {
        assert!(Tagging::new("tags", "tags/all", 10).is_err());
        assert!(Tagging::new("tags", "tags/:tag", 0).is_err());
    }
}
