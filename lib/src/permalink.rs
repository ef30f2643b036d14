use std::fmt;
use std::sync::Arc;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Fault, Result};
use crate::path::normalize;
use crate::taxonomy::{keys, Document, Permalink};
use crate::value::Value;

pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d";

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r":([A-Za-z0-9_]+)").unwrap());

/// A permalink pattern such as `blog/:date/:slug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: Arc<str>,
    /// `strftime` format for date-valued fields.
    pub date_format: Arc<str>,
}

/// Resolution failed: the document has no usable value for `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub field: Arc<str>,
}

/// Permalink rules keyed by document type.
#[derive(Debug, Clone, Default)]
pub struct Permalinks {
    rules: BTreeMap<Arc<str>, Rule>,
}

impl Rule {
    /// Checks `pattern` for emptiness and dangling `:`s. `field` names the
    /// configuration entry in errors.
    pub fn new(field: &str, pattern: &str, date_format: Option<&str>) -> Result<Rule> {
        if pattern.trim_matches(|c: char| c == '/' || c.is_whitespace()).is_empty() {
            return Err(Fault::config(field, "permalink pattern is empty").into());
        }

        let bytes = pattern.as_bytes();
        for (i, _) in pattern.match_indices(':') {
            let next = bytes.get(i + 1).copied();
            if !next.map_or(false, |b| b.is_ascii_alphanumeric() || b == b'_') {
                let reason = format!("`:` at byte {i} of `{pattern}` does not start a field name");
                return Err(Fault::config(field, reason).into());
            }
        }

        let date_format = date_format.unwrap_or(DEFAULT_DATE_FORMAT);
        check_date_format(field, date_format)?;
        Ok(Rule { pattern: pattern.into(), date_format: date_format.into() })
    }

    /// The distinct field names in order of first appearance.
    pub fn tokens(&self) -> Vec<&str> {
        tokens(&self.pattern)
    }
}

impl Permalinks {
    pub fn new() -> Self {
        Permalinks::default()
    }

    pub fn insert<K: Into<Arc<str>>>(&mut self, kind: K, rule: Rule) -> Option<Rule> {
        self.rules.insert(kind.into(), rule)
    }

    pub fn get(&self, kind: &str) -> Option<&Rule> {
        self.rules.get(kind)
    }

    /// The path for `document`, or `Ok(None)` when no pattern applies: the
    /// permalink is disabled or nothing is configured for its type. An
    /// explicit document pattern wins over the table.
    pub fn resolve(&self, document: &Document) -> Result<Option<String>, Unresolved> {
        let kind = document.kind();
        let rule = kind.as_deref().and_then(|k| self.get(k));
        let date_format = rule.map_or(DEFAULT_DATE_FORMAT, |r| &*r.date_format);
        let pattern = match (&document.permalink, rule) {
            (Permalink::Disabled, _) => return Ok(None),
            (Permalink::Pattern(pattern), _) => &**pattern,
            (Permalink::Default, Some(rule)) => &*rule.pattern,
            (Permalink::Default, None) => return Ok(None),
        };

        let path = substitute(pattern, date_format, |field| field_of(document, field))?;
        Ok(Some(normalize(&path)))
    }
}

/// Looks a pattern field up on `document`: frontmatter first, then the
/// document's locale.
fn field_of(document: &Document, field: &str) -> Option<Value> {
    document.metadata.get_raw(field)
        .or_else(|| match field {
            "locale" => document.locale.clone().map(Value::from),
            _ => None,
        })
}

/// Rejects `strftime` formats chrono cannot render.
pub fn check_date_format(field: &str, format: &str) -> Result<()> {
    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        let reason = format!("`{format}` is not a valid date format");
        return Err(Fault::config(field, reason).into());
    }

    Ok(())
}

fn tokens(pattern: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = vec![];
    for captures in TOKEN.captures_iter(pattern) {
        let token = captures.get(1).map_or("", |m| m.as_str());
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }

    tokens
}

/// Replaces every `:field` in `pattern` with `lookup(field)`. Fails without
/// substituting anything if any field is missing or empty.
///
/// ```rust
/// use smithy::permalink::substitute;
/// use smithy::value::Value;
///
/// let lookup = |field: &str| (field == "slug").then(|| Value::from("hello-world"));
/// assert_eq!(substitute("blog/:slug", "%Y", lookup).unwrap(), "blog/hello-world");
/// assert_eq!(substitute("blog/:slug/:slug", "%Y", lookup).unwrap(), "blog/hello-world/hello-world");
/// assert_eq!(&*substitute("blog/:title", "%Y", lookup).unwrap_err().field, "title");
/// ```
pub fn substitute<F>(pattern: &str, date_format: &str, lookup: F) -> Result<String, Unresolved>
    where F: Fn(&str) -> Option<Value>
{
    let mut values: Vec<(&str, String)> = vec![];
    for token in tokens(pattern) {
        let text = lookup(token)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.to_text(date_format))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Unresolved { field: token.into() })?;

        values.push((token, text));
    }

    let substituted = TOKEN.replace_all(pattern, |captures: &Captures<'_>| {
        let token = captures.get(1).map_or("", |m| m.as_str());
        values.iter()
            .find(|(t, _)| *t == token)
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    });

    Ok(substituted.into_owned())
}

/// [`Permalinks::resolve()`] with failures collapsed to `None`.
pub fn resolve(document: &Document, permalinks: &Permalinks) -> Option<String> {
    permalinks.resolve(document).ok().flatten()
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing or empty field `{}`", self.field)
    }
}

/// `slug` if present, else the slugified file stem.
pub fn default_slug(document: &Document) -> Arc<str> {
    document.metadata.get_ok(keys::Slug)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| crate::util::slugify(crate::util::file_stem(&document.identity)).into())
}

/// The path of a page no pattern applies to: `index.html` files stand for
/// their directory, everything else keeps its identity as an `.html` file.
///
/// ```rust
/// use smithy::permalink::default_path;
///
/// assert_eq!(default_path("index.html"), "/");
/// assert_eq!(default_path("docs/index.html"), "/docs/");
/// assert_eq!(default_path("404.html"), "/404.html");
/// assert_eq!(default_path("old/page.htm"), "/old/page.html");
/// ```
pub fn default_path(identity: &str) -> String {
    let identity = identity.trim_start_matches('/');
    if identity == "index.html" {
        return "/".into();
    }

    match identity.strip_suffix("/index.html") {
        Some(dir) => normalize(dir),
        None => normalize(&crate::util::with_ext(identity, "html")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Membership;
    use crate::value::parse_date;

    fn post(slug: Option<&str>) -> Document {
        let mut doc = Document::text("blog/hello.html", "");
        doc.collections.push(Membership { name: "blog".into(), index: 0 });
        if let Some(slug) = slug {
            doc.metadata.insert(keys::Slug, slug);
        }

        doc
    }

    fn table() -> Permalinks {
        let mut permalinks = Permalinks::new();
        permalinks.insert("blog", Rule::new("blog", "blog/:slug", None).unwrap());
        permalinks
    }

    #[test]
    fn resolves_and_normalizes() {
        let doc = post(Some("hello-world"));
        assert_eq!(resolve(&doc, &table()).as_deref(), Some("/blog/hello-world/"));
    }

    #[test]
    fn missing_fields_resolve_to_nothing() {
        let doc = post(None);
        assert_eq!(resolve(&doc, &table()), None);
        assert_eq!(&*table().resolve(&doc).unwrap_err().field, "slug");

        let doc = post(Some(""));
        assert_eq!(resolve(&doc, &table()), None);
    }

    #[test]
    fn falsy_but_present_values_substitute() {
        let mut doc = post(Some("x"));
        doc.metadata.insert_raw("draft", false);
        doc.metadata.insert_raw("n", 0u8);
        doc.permalink = Permalink::Pattern("t/:draft/:n".into());
        assert_eq!(resolve(&doc, &table()).as_deref(), Some("/t/false/0/"));
    }

    #[test]
    fn disabled_and_unconfigured() {
        let mut doc = post(Some("x"));
        doc.permalink = Permalink::Disabled;
        assert_eq!(table().resolve(&doc), Ok(None));

        let orphan = Document::text("about.html", "");
        orphan.metadata.insert(keys::Slug, "about");
        assert_eq!(table().resolve(&orphan), Ok(None));
    }

    #[test]
    fn type_field_selects_the_rule() {
        let mut permalinks = table();
        permalinks.insert("news", Rule::new("news", "news/:date/:slug", Some("%Y-%m")).unwrap());

        let doc = post(Some("launch"));
        doc.metadata.insert(keys::Type, "news");
        doc.metadata.insert(keys::Date, parse_date("2021-07-04").unwrap());
        assert_eq!(resolve(&doc, &permalinks).as_deref(), Some("/news/2021-07/launch/"));
    }

    #[test]
    fn locale_is_a_field() {
        let mut doc = post(Some("x"));
        doc.locale = Some("fr".into());
        doc.permalink = Permalink::Pattern(":locale/:slug".into());
        assert_eq!(resolve(&doc, &table()).as_deref(), Some("/fr/x/"));
    }

    #[test]
    fn malformed_rules() {
        assert!(Rule::new("permalinks.post", "", None).is_err());
        assert!(Rule::new("permalinks.post", " / ", None).is_err());
        let error = Rule::new("permalinks.post", "blog/:/x", None).unwrap_err();
        assert!(error.to_string().contains("permalinks.post"));
        assert_eq!(Rule::new("p", "a/:x/:y/:x", None).unwrap().tokens(), ["x", "y"]);
        assert!(Rule::new("p", "a/:x", Some("%Y/%Q")).is_err());
    }

    #[test]
    fn slugs_default_to_the_stem() {
        assert_eq!(&*default_slug(&post(None)), "hello");
        assert_eq!(&*default_slug(&post(Some("given"))), "given");
    }
}
