use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::collection::forget;
use crate::config::Collisions;
use crate::emit::Emission;
use crate::error::{Chainable, Fault, Result};
use crate::paginate::{attach, paginate, PageLink};
use crate::path::fixup;
use crate::permalink::{default_path, Unresolved};
use crate::pipeline::{Context, Driver, Emitted};
use crate::templating::{layout_name, Page};
use crate::taxonomy::{DocId, Document, Permalink};
use crate::util::{is_template, with_ext};
use crate::value::Value;

/// One step of a pass. Every stage sees the document set exactly as the
/// previous one left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Collection membership and order.
    Group,
    /// Locale scoping, rewriting, and cloning.
    Expand,
    /// Tag listings.
    Tags,
    /// Markup to HTML; renames `.md` and friends to `.html`.
    Markup,
    /// Page shells for paginated collections and tag listings.
    Paginate,
    /// Pattern paths, then default paths for the remaining pages.
    Permalink,
    /// Localizes and normalizes every path.
    Fixup,
    /// Layouts and in-place templates.
    Layout,
    /// Post-layout HTML transforms.
    Transform,
    Sitemap,
    Emit,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Group => "group",
            Stage::Expand => "expand",
            Stage::Tags => "tags",
            Stage::Markup => "markup",
            Stage::Paginate => "paginate",
            Stage::Permalink => "permalink",
            Stage::Fixup => "fixup",
            Stage::Layout => "layout",
            Stage::Transform => "transform",
            Stage::Sitemap => "sitemap",
            Stage::Emit => "emit",
        }
    }

    pub(crate) fn run(self, driver: &Driver, cx: &mut Context) -> Result<()> {
        match self {
            Stage::Group => group(driver, cx),
            Stage::Expand => expand(driver, cx),
            Stage::Tags => tags(driver, cx),
            Stage::Markup => markup(driver, cx),
            Stage::Paginate => paginate_all(driver, cx),
            Stage::Permalink => permalink(driver, cx),
            Stage::Fixup => fixup_paths(cx),
            Stage::Layout => layout(driver, cx),
            Stage::Transform => transform(driver, cx),
            Stage::Sitemap => sitemap(driver, cx),
            Stage::Emit => emit(driver, cx),
        }
    }
}

fn group(driver: &Driver, cx: &mut Context) -> Result<()> {
    cx.collections = crate::collection::group(&mut cx.documents, &driver.plan.groupings);
    Ok(())
}

fn expand(driver: &Driver, cx: &mut Context) -> Result<()> {
    let Some(locales) = &driver.plan.locales else { return Ok(()) };
    crate::locale::expand(
        &mut cx.documents,
        &mut cx.collections,
        locales,
        driver.plan.expand,
        cx.locale.as_deref(),
    )
}

/// Listings and paginated collections share the shell namespace.
fn tags(driver: &Driver, cx: &mut Context) -> Result<()> {
    let Some(tagging) = &driver.plan.tags else { return Ok(()) };
    let listings = crate::tags::tag(&cx.documents, tagging, cx.locale.as_deref());
    if let Some(taken) = listings.iter().find(|l| driver.plan.pages.contains_key(&l.name)) {
        let reason = format!("tag listing `{}` is also a paginated collection", taken.name);
        return Err(Fault::config("tags.path", reason)).chain_with(|| Fault::stage("tags", None));
    }

    cx.listings = listings;
    Ok(())
}

fn markup(driver: &Driver, cx: &mut Context) -> Result<()> {
    let markup = &*driver.markup;
    let accepts = |doc: &Document| markup.accepts(&doc.identity) && doc.as_text().is_some();

    cx.documents.par_iter_mut()
        .filter(|(_, doc)| accepts(doc))
        .try_for_each(|(_, doc)| -> Result<()> {
            let html = doc.as_text()
                .map(|text| markup.render(text))
                .transpose()
                .chain_with(|| Fault::stage("markup", Some(&doc.identity)))?;

            if let Some(html) = html {
                doc.set_text(html);
            }

            Ok(())
        })?;

    let prefix = cx.log_prefix();
    for id in cx.documents.ids() {
        let Some(doc) = cx.documents.get(id).filter(|doc| accepts(*doc)) else { continue };
        let source = doc.identity.clone();
        let html = with_ext(&source, "html");

        if let Some(owner) = cx.documents.by_identity(&html).filter(|owner| *owner != id) {
            match driver.plan.collisions {
                Collisions::Warn => {
                    log::warn!("{prefix}{source} and {html} share an identity; keeping {source}");
                    cx.documents.retire(owner);
                    forget(&mut cx.documents, &mut cx.collections, &[owner]);
                }
                Collisions::Error => return Err(Fault::Collision {
                    location: html,
                    first: cx.documents[owner].identity.clone(),
                    second: source,
                }.into()),
            }
        }

        cx.documents.rename(id, html)
            .chain_with(|| Fault::stage("markup", Some(&source)))?;
    }

    Ok(())
}

fn paginate_all(driver: &Driver, cx: &mut Context) -> Result<()> {
    for grouping in &driver.plan.groupings {
        let Some(rule) = driver.plan.pages.get(&grouping.name) else { continue };
        let Some(members) = cx.collections.get(&grouping.name) else { continue };

        let pages = paginate(&grouping.name, members, rule);
        attach(&mut cx.documents, pages, rule, grouping.layout.as_ref())
            .chain_with(|| Fault::stage("paginate", Some(&grouping.name)))?;
    }

    for listing in std::mem::take(&mut cx.listings) {
        let pages = paginate(&listing.name, &listing.members, &listing.rule);
        attach(&mut cx.documents, pages, &listing.rule, None)
            .chain_with(|| Fault::stage("paginate", Some(&listing.name)))?;
    }

    Ok(())
}

fn permalink(driver: &Driver, cx: &mut Context) -> Result<()> {
    for (_, doc) in cx.documents.iter_mut() {
        if !doc.is_page() {
            continue;
        }

        match driver.plan.permalinks.resolve(doc) {
            Ok(Some(path)) => doc.path = Some(path),
            Ok(None) => {}
            Err(Unresolved { field }) => {
                log::debug!("no permalink for {}: missing or empty `{field}`", doc.identity);
            }
        }

        if doc.path.is_none() {
            doc.path = Some(default_path(&doc.identity));
        }
    }

    Ok(())
}

/// Runs twice: after permalinks and again after layouts and transforms, so
/// whatever those left behind ends up canonical. Page lists shared between
/// the shells of a collection are fixed once and stay shared.
fn fixup_paths(cx: &mut Context) -> Result<()> {
    let current = cx.locale.clone();
    let locales = cx.locales.clone();
    let locales = (!locales.is_empty()).then_some(locales.as_slice());

    let mut fixed: BTreeMap<Arc<str>, Arc<[PageLink]>> = BTreeMap::new();
    for (_, doc) in cx.documents.iter_mut() {
        let locale = doc.locale.clone().or_else(|| current.clone());
        let fix = |path: &str| fixup(path, locale.as_deref(), locales);

        if let Some(path) = doc.path.take() {
            doc.path = Some(fix(&path));
        }

        if let Some(pagination) = &mut doc.pagination {
            let pages = fixed.entry(pagination.collection.clone())
                .or_insert_with(|| {
                    pagination.pages.iter().map(|link| PageLink { path: fix(&link.path) }).collect()
                });

            pagination.pages = pages.clone();
            for link in pagination.next.iter_mut().chain(pagination.previous.iter_mut()) {
                link.path = fix(&link.path);
            }
        }
    }

    Ok(())
}

enum Render {
    Layout(String),
    InPlace(Arc<str>),
}

fn layout(driver: &Driver, cx: &mut Context) -> Result<()> {
    let engine = &*driver.engine;
    let mut jobs: Vec<(DocId, Render, Page)> = vec![];
    for (id, doc) in cx.documents.iter() {
        if doc.pagination.is_none() && !doc.is_page() {
            continue;
        }

        let render = match (&doc.layout, doc.as_text()) {
            (Some(layout), _) => Render::Layout(layout_name(layout, engine)),
            (None, Some(text)) if is_template(text) => Render::InPlace(text.into()),
            _ => continue,
        };

        let page = Page::of(&cx.documents, &cx.collections, id, cx.locale.as_ref(), &cx.locales);
        jobs.push((id, render, page));
    }

    let rendered: Vec<(DocId, String)> = jobs.into_par_iter()
        .map(|(id, render, page)| {
            let html = match &render {
                Render::Layout(name) => engine.render(name, &page)
                    .chain_with(|| error!("failed to apply layout", "layout" => name)),
                Render::InPlace(text) => engine.render_str(&page.identity, text, &page),
            };

            html.chain_with(|| Fault::stage("layout", Some(&page.identity)))
                .map(|html| (id, html))
        })
        .collect::<Result<_>>()?;

    for (id, html) in rendered {
        cx.documents[id].set_text(html);
    }

    Ok(())
}

fn transform(driver: &Driver, cx: &mut Context) -> Result<()> {
    let transforms = &driver.transforms;
    cx.documents.par_iter_mut()
        .filter(|(_, doc)| doc.pagination.is_some() || doc.is_page())
        .try_for_each(|(_, doc)| -> Result<()> {
            for transform in transforms {
                let enabled = doc.metadata.get_raw(transform.gate())
                    .map_or(false, |v| v == Value::Bool(true));

                let Some(text) = doc.as_text().filter(|_| enabled) else { continue };
                let html = transform.apply(text)
                    .chain_with(|| error!("transform failed", "transform" => transform.name()))
                    .chain_with(|| Fault::stage("transform", Some(&doc.identity)))?;

                doc.set_text(html);
            }

            Ok(())
        })
}

fn sitemap(driver: &Driver, cx: &mut Context) -> Result<()> {
    let Some(sitemap) = &driver.plan.sitemap else { return Ok(()) };
    let default = cx.locales.first().map(|l| &**l);
    let identity = sitemap.identity(cx.locale.as_deref(), default);

    let mut document = Document::text(identity, sitemap.render(&cx.documents));
    document.permalink = Permalink::Disabled;
    cx.documents.insert(document).chain_with(|| Fault::stage("sitemap", None))?;
    Ok(())
}

fn emit(driver: &Driver, cx: &mut Context) -> Result<()> {
    let prefix = cx.log_prefix();
    let mut written: FxHashMap<String, Arc<str>> = FxHashMap::default();
    for (_, doc) in cx.documents.iter() {
        let emission = Emission {
            identity: doc.identity.clone(),
            path: doc.path.clone(),
            contents: doc.contents.clone(),
        };

        let location = emission.location();
        if let Some(first) = written.insert(location.clone(), doc.identity.clone()) {
            match driver.plan.collisions {
                Collisions::Warn => log::warn!(
                    "{prefix}{first} and {} are both written to {location}; keeping {}",
                    doc.identity, doc.identity
                ),
                Collisions::Error => return Err(Fault::Collision {
                    location,
                    first,
                    second: doc.identity.clone(),
                }.into()),
            }
        }

        driver.emitter.emit(&emission)
            .chain_with(|| Fault::stage("emit", Some(&doc.identity)))?;

        log::info!("{prefix}generated {}", doc.identity);
        cx.emitted.push(Emitted { identity: emission.identity, path: emission.path, location });
    }

    Ok(())
}
