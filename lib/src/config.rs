use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::collection::Grouping;
use crate::error::{Chainable, Fault, Result};
use crate::locale::{Expand, Locales};
use crate::paginate::PageRule;
use crate::permalink::{Permalinks, Rule};
use crate::sitemap::Sitemap;
use crate::tags::Tagging;
use crate::value::{Dict, Format, Json, Toml, Value, Yaml};

pub const CONFIG_FILE: &str = "config.toml";

/// What happens when two documents are emitted to the same location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collisions {
    /// The later document wins; the collision is logged.
    #[default]
    Warn,
    /// The pass fails.
    Error,
}

/// The site configuration as written. Unknown top-level keys are template
/// globals, visible as `site.*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: PathBuf,
    pub layouts: PathBuf,
    pub ignore: Vec<String>,
    pub collisions: Collisions,
    pub i18n: Option<I18nSettings>,
    /// Collection tables in the order they are written.
    pub collections: toml::Table,
    pub permalinks: BTreeMap<String, String>,
    pub tags: Option<TagSettings>,
    pub highlight: HighlightSettings,
    pub sitemap: Option<SitemapSettings>,
    #[serde(flatten)]
    pub globals: toml::Table,
}

#[derive(Debug, Clone, Deserialize)]
pub struct I18nSettings {
    pub locales: Vec<String>,
    #[serde(default)]
    pub expand: Expand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub pattern: String,
    #[serde(default, alias = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub reverse: bool,
    pub permalink: Option<String>,
    pub layout: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub metadata: toml::Table,
    pub paginate: Option<PaginateSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginateSettings {
    #[serde(alias = "perPage")]
    pub per_page: i64,
    pub path: Option<String>,
    pub first: Option<String>,
    pub layout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagSettings {
    #[serde(default = "TagSettings::default_field")]
    pub field: String,
    #[serde(default = "TagSettings::default_path")]
    pub path: String,
    #[serde(default = "TagSettings::default_layout")]
    pub layout: String,
    #[serde(default, alias = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default = "TagSettings::default_per_page", alias = "perPage")]
    pub per_page: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub enable: bool,
    pub line_numbers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SitemapSettings {
    pub hostname: String,
    pub path: Option<String>,
}

/// Validated configuration, ready to drive a build.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub groupings: Vec<Grouping>,
    /// Page rules by collection name.
    pub pages: BTreeMap<Arc<str>, PageRule>,
    pub permalinks: Permalinks,
    pub locales: Option<Locales>,
    pub expand: Expand,
    pub tags: Option<Tagging>,
    pub sitemap: Option<Sitemap>,
    pub collisions: Collisions,
}

impl TagSettings {
    fn default_field() -> String { "tags".into() }
    fn default_path() -> String { "tags/:tag".into() }
    fn default_layout() -> String { "tag".into() }
    fn default_per_page() -> i64 { 10 }
}

impl Default for HighlightSettings {
    fn default() -> Self {
        HighlightSettings { enable: true, line_numbers: false }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source: "content".into(),
            layouts: "templates".into(),
            ignore: vec!["layouts".into(), "includes".into(), ".DS_Store".into()],
            collisions: Collisions::default(),
            i18n: None,
            collections: toml::Table::new(),
            permalinks: BTreeMap::new(),
            tags: None,
            highlight: HighlightSettings::default(),
            sitemap: None,
            globals: toml::Table::new(),
        }
    }
}

impl Settings {
    /// Reads settings from `path` as TOML, JSON, or YAML by its extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Json::read::<_, Settings>(path),
            Some("yaml" | "yml") => Yaml::read::<_, Settings>(path),
            _ => Toml::read::<_, Settings>(path),
        };

        settings.chain_with(|| error!("failed to load configuration", "path" => path.display()))
    }

    /// Makes relative `source` and `layouts` directories relative to `base`.
    pub fn rebase<P: AsRef<Path>>(mut self, base: P) -> Self {
        self.source = base.as_ref().join(&self.source);
        self.layouts = base.as_ref().join(&self.layouts);
        self
    }

    /// The template globals, with TOML dates as dates.
    pub fn globals(&self) -> Dict {
        match Value::from(toml::Value::Table(self.globals.clone())) {
            Value::Dict(dict) => (*dict).clone(),
            _ => Dict::new(),
        }
    }

    /// Checks every pattern, page size, and locale, naming the offending
    /// field on failure.
    pub fn validate(&self) -> Result<Plan> {
        let mut plan = Plan { collisions: self.collisions, ..Plan::default() };

        for (name, table) in &self.collections {
            let field = format!("collections.{name}");
            let settings: CollectionSettings = table.clone().try_into()
                .map_err(|e: toml::de::Error| Fault::config(&field, e.message().to_string()))?;

            let layout: Arc<str> = settings.layout.as_deref().unwrap_or(name).into();
            let mut grouping = Grouping::new(name, &settings.pattern)?;
            grouping.sort_by = settings.sort_by.as_deref().map(Arc::from);
            grouping.reverse = settings.reverse;
            grouping.layout = Some(layout);
            if let Value::Dict(metadata) = Value::from(toml::Value::Table(settings.metadata)) {
                grouping.metadata = (*metadata).clone();
            }

            let pattern = settings.permalink.unwrap_or_else(|| format!("{name}/:slug"));
            let pattern = pattern.trim_start_matches('/');
            let rule = Rule::new(&format!("{field}.permalink"), pattern, settings.date.as_deref())?;
            plan.permalinks.insert(name.as_str(), rule);

            if let Some(paginate) = &settings.paginate {
                let rule = PageRule::new(
                    &format!("{field}.paginate"),
                    paginate.per_page,
                    paginate.path.as_deref(),
                    paginate.first.as_deref(),
                    paginate.layout.as_deref(),
                )?;

                plan.pages.insert(name.as_str().into(), rule);
            }

            plan.groupings.push(grouping);
        }

        for (kind, pattern) in &self.permalinks {
            let date_format = plan.permalinks.get(kind).map(|r| r.date_format.clone());
            let rule = Rule::new(&format!("permalinks.{kind}"), pattern, date_format.as_deref())?;
            plan.permalinks.insert(kind.as_str(), rule);
        }

        if let Some(i18n) = &self.i18n {
            plan.locales = Some(Locales::new(i18n.locales.iter().map(String::as_str))?);
            plan.expand = i18n.expand;
        }

        if let Some(tags) = &self.tags {
            let mut tagging = Tagging::new(&tags.field, &tags.path, tags.per_page)?;
            tagging.layout = Some(tags.layout.as_str().into());
            tagging.sort_by = tags.sort_by.as_deref().map(Arc::from);
            tagging.reverse = tags.reverse;
            plan.tags = Some(tagging);
        }

        if let Some(sitemap) = &self.sitemap {
            plan.sitemap = Some(Sitemap::new(&sitemap.hostname, sitemap.path.as_deref())?);
        }

        for (i, pattern) in self.ignore.iter().enumerate() {
            glob::Pattern::new(pattern)
                .map_err(|e| Fault::config(format!("ignore[{i}]"), e.to_string()))?;
        }

        Ok(plan)
    }
}
