//! `sitemap.xml` generation.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/blog/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{Fault, Result};
use crate::taxonomy::{keys, DocumentSet};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    /// Scheme and host prepended to every path, without a trailing `/`.
    pub hostname: Arc<str>,
    /// Identity of the generated document in the default locale.
    pub path: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

impl Sitemap {
    pub fn new(hostname: &str, path: Option<&str>) -> Result<Sitemap> {
        let hostname = hostname.trim().trim_end_matches('/');
        if !(hostname.starts_with("http://") || hostname.starts_with("https://")) {
            let reason = format!("`{hostname}` is not an http(s) URL");
            return Err(Fault::config("sitemap.hostname", reason).into());
        }

        let path = path.unwrap_or("sitemap.xml").trim_matches('/');
        if path.is_empty() {
            return Err(Fault::config("sitemap.path", "sitemap path is empty").into());
        }

        Ok(Sitemap { hostname: hostname.into(), path: path.into() })
    }

    /// The sitemap's identity in a pass: prefixed with `locale` unless it is
    /// the default.
    pub fn identity(&self, locale: Option<&str>, default: Option<&str>) -> String {
        match locale {
            Some(locale) if Some(locale) != default => format!("{locale}/{}", self.path),
            _ => self.path.to_string(),
        }
    }

    /// Lists every document with an output path, sorted by path, with the
    /// `date` field as `lastmod`.
    pub fn render(&self, set: &DocumentSet) -> String {
        let mut urls: Vec<UrlEntry> = set.iter()
            .filter_map(|(_, doc)| {
                let path = doc.path.as_deref()?;
                let lastmod = doc.metadata.get_ok(keys::Date).map(lastmod_ymd);
                Some(UrlEntry { loc: format!("{}{path}", self.hostname), lastmod })
            })
            .collect();

        urls.sort();
        urls.dedup_by(|a, b| a.loc == b.loc);
        into_xml(urls)
    }
}

fn lastmod_ymd(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn into_xml(urls: Vec<UrlEntry>) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for entry in urls {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::taxonomy::Document;
    use crate::value::parse_date;

    #[test]
    fn lists_paths_in_order() {
        let mut set: DocumentSet = ["b.html", "a.html", "logo.png"].into_iter()
            .map(|id| Document::text(id, ""))
            .collect::<Result<_>>()
            .unwrap();

        let b = set.by_identity("b.html").unwrap();
        set[b].path = Some("/b/?x=1&y=2".into());
        set[b].metadata.insert(keys::Date, parse_date("2024-05-06").unwrap());
        let a = set.by_identity("a.html").unwrap();
        set[a].path = Some("/a/".into());

        let sitemap = Sitemap::new("https://example.com/", None).unwrap();
        let xml = sitemap.render(&set);
        let a = xml.find("<loc>https://example.com/a/</loc>").unwrap();
        let b = xml.find("<loc>https://example.com/b/?x=1&amp;y=2</loc>").unwrap();
        assert!(a < b);
        assert!(xml.contains("<lastmod>2024-05-06</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), 2);
    }

    #[test]
    fn localized_identities() {
        let sitemap = Sitemap::new("http://x.org", Some("/maps/site.xml")).unwrap();
        assert_eq!(sitemap.identity(None, Some("en")), "maps/site.xml");
        assert_eq!(sitemap.identity(Some("en"), Some("en")), "maps/site.xml");
        assert_eq!(sitemap.identity(Some("fr"), Some("en")), "fr/maps/site.xml");
        assert!(Sitemap::new("example.com", None).is_err());
    }
}
