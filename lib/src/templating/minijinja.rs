use std::path::Path;

use minijinja::{Environment, path_loader};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::Result;
use crate::templating::{Engine, Page};

/// Jinja layouts through minijinja.
///
/// Layouts load from a directory; the configured globals are visible as
/// `site`. Besides the builtins, templates get the `date`, `deslug`, and
/// `split` filters and the `link(path)` function, which places `path` under
/// the page's locale.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new<G: Serialize>(layouts: Option<&Path>, globals: G) -> Self {
        let mut env = Environment::new();
        if let Some(root) = layouts {
            env.set_loader(path_loader(root));
        }

        env.add_global("site", Value::from_serializable(&globals));
        env.add_function("link", ext::link);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        MiniJinjaEngine { env }
    }

    /// Registers a template that isn't on disk, shadowing the loader.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.env.add_template_owned(name.to_string(), source.to_string())?;
        Ok(())
    }
}

impl Engine for MiniJinjaEngine {
    fn extension(&self) -> &str {
        "html"
    }

    fn render(&self, name: &str, page: &Page) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(page)?)
    }

    fn render_str(&self, name: &str, template: &str, page: &Page) -> Result<String> {
        Ok(self.env.render_named_str(name, template, page)?)
    }
}

mod ext {
    use std::sync::Arc;

    use std::fmt::{Display, Write};

    use chrono::{DateTime, NaiveTime};
    use minijinja::{value::{intern, Value}, Error, ErrorKind, State};

    pub fn link(state: &State<'_, '_>, path: &str) -> Value {
        let locale = state.lookup("locale")
            .and_then(|v| v.as_str().map(String::from));

        let locales: Vec<Arc<str>> = state.lookup("locales")
            .and_then(|v| v.try_iter().ok().map(|iter| iter.collect::<Vec<_>>()))
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(Arc::from))
            .collect();

        let path = crate::path::fixup(path, locale.as_deref(), Some(locales.as_slice()));
        Value::from_safe_string(path)
    }

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return render(datetime.naive_utc().format(fmt), fmt);
        }

        let kind = value.kind();
        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {kind}")
            ))?;

        let formatted = crate::value::parse_date(string).map(|dt| dt.format(fmt))
            .or_else(|| string.parse::<NaiveTime>().ok().map(|t| t.format(fmt)))
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse `{string}` as a date")
            ))?;

        render(formatted, fmt)
    }

    fn render(formatted: impl Display, fmt: &str) -> Result<Value, Error> {
        let mut string = String::new();
        write!(&mut string, "{formatted}").map_err(|_| Error::new(
            ErrorKind::InvalidOperation,
            format!("`{fmt}` is not a valid date format")
        ))?;

        Ok(string.into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(intern).collect()),
        }
    }
}

impl_error_detail_with_std_error!(minijinja::Error);

#[cfg(test)]
mod tests {
    use super::*;

    fn page(locale: Option<&str>) -> Page {
        Page {
            metadata: crate::dict![
                "title" => "Hello",
                "date" => crate::value::parse_date("2021-03-04").unwrap(),
            ],
            identity: "blog/hello.html".into(),
            path: Some("/blog/hello/".into()),
            contents: "<p>Hi</p>".into(),
            collections: vec!["blog".into()],
            next: None,
            previous: None,
            pagination: None,
            locale: locale.map(Into::into),
            locales: vec!["en".into(), "fr".into()],
        }
    }

    fn engine() -> MiniJinjaEngine {
        let globals: crate::value::Dict = crate::dict!["name" => "Site"];
        MiniJinjaEngine::new(None, globals)
    }

    #[test]
    fn renders_layouts() {
        let mut engine = engine();
        engine.add_template("post.html", "{{ site.name }}: {{ title }} {{ contents|safe }}").unwrap();
        let html = engine.render("post.html", &page(None)).unwrap();
        assert_eq!(html, "Site: Hello <p>Hi</p>");
        assert!(engine.render("missing.html", &page(None)).is_err());
    }

    #[test]
    fn filters_and_links() {
        let engine = engine();
        let html = engine.render_str("t", "{{ date|date('%Y') }} {{ 'a-b'|deslug }}", &page(None)).unwrap();
        assert_eq!(html, "2021 a b");

        let template = "{{ link('about') }} {{ link('/fr/x/') }}";
        assert_eq!(engine.render_str("t", template, &page(Some("fr"))).unwrap(), "/fr/about/ /fr/x/");
        assert_eq!(engine.render_str("t", template, &page(Some("en"))).unwrap(), "/about/ /fr/x/");
        assert_eq!(engine.render_str("t", "{{ 'a,b'|split(',', 1) }}", &page(None)).unwrap(), "b");
    }
}
