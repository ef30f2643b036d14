//! The ordered stage sequence and the per-locale build loop.
//!
//! A build runs one pass per configured locale, strictly in order, or a
//! single pass without i18n (and in clone mode, which expands every locale
//! inside one pass). Each pass reads the sources afresh, then runs the
//! stages present for the configuration:
//!
//! ```text
//! group -> expand? -> tags? -> markup -> paginate -> permalink -> fixup
//!       -> layout -> transform? -> fixup -> sitemap? -> emit
//! ```
//!
//! A failing stage ends its pass. In [`Mode::OneShot`] the failure ends the
//! build; in [`Mode::Watch`] it is logged, recorded in the pass's
//! [`Outcome`], and the remaining passes still run.

mod context;
mod stage;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub use context::{Context, Emitted};
pub use stage::Stage;

use crate::config::{Plan, Settings};
use crate::emit::{Emitter, FsEmitter};
use crate::error::{Chainable, Error, Fault, Result};
use crate::ingest::{prepare, FsProvider, Provider};
use crate::locale::Expand;
use crate::markdown::{CommonMark, Markup};
use crate::templating::{minijinja::MiniJinjaEngine, Engine};

/// How failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The first failed pass fails the build.
    OneShot,
    /// Failed passes are logged; the build goes on.
    Watch,
}

/// An opaque HTML to HTML service run after layouts, on pages whose
/// frontmatter sets [`Transform::gate()`] to `true`.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// The frontmatter flag enabling this transform.
    fn gate(&self) -> &str;

    fn apply(&self, html: &str) -> Result<String>;
}

/// The result of one locale pass.
#[derive(Debug, Clone)]
pub struct Pass {
    pub locale: Option<Arc<str>>,
    /// Everything handed to the emitter, in emission order.
    pub emitted: Vec<Emitted>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Built,
    Failed(Error),
}

/// Runs passes over the documents of a provider.
pub struct Driver {
    plan: Plan,
    provider: Box<dyn Provider>,
    markup: Box<dyn Markup>,
    engine: Box<dyn Engine>,
    emitter: Box<dyn Emitter>,
    transforms: Vec<Box<dyn Transform>>,
}

impl Outcome {
    pub fn is_built(&self) -> bool {
        matches!(self, Outcome::Built)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Built => None,
            Outcome::Failed(e) => Some(e),
        }
    }
}

impl Driver {
    pub fn new<P, M, E, O>(plan: Plan, provider: P, markup: M, engine: E, emitter: O) -> Self
        where P: Provider + 'static,
              M: Markup + 'static,
              E: Engine + 'static,
              O: Emitter + 'static,
    {
        Driver {
            plan,
            provider: Box::new(provider),
            markup: Box::new(markup),
            engine: Box::new(engine),
            emitter: Box::new(emitter),
            transforms: vec![],
        }
    }

    /// A driver reading `settings.source` from disk, rendering Markdown with
    /// CommonMark and layouts from `settings.layouts` with minijinja, and
    /// writing under `output`.
    pub fn for_site<P: AsRef<Path>>(settings: &Settings, output: P) -> Result<Driver> {
        let plan = settings.validate()?;
        let provider = FsProvider::new(&settings.source).ignoring(&settings.ignore)?;
        let markup = CommonMark::new()
            .highlight(settings.highlight.enable, settings.highlight.line_numbers);

        let layouts = settings.layouts.is_dir().then_some(settings.layouts.as_path());
        let engine = MiniJinjaEngine::new(layouts, settings.globals());
        Ok(Driver::new(plan, provider, markup, engine, FsEmitter::new(output)))
    }

    /// Appends a post-layout transform. Transforms run in insertion order.
    pub fn transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// The stages every pass runs, in order.
    pub fn stages(&self) -> Vec<Stage> {
        [
            Some(Stage::Group),
            self.plan.locales.as_ref().map(|_| Stage::Expand),
            self.plan.tags.as_ref().map(|_| Stage::Tags),
            Some(Stage::Markup),
            Some(Stage::Paginate),
            Some(Stage::Permalink),
            Some(Stage::Fixup),
            Some(Stage::Layout),
            (!self.transforms.is_empty()).then_some(Stage::Transform),
            Some(Stage::Fixup),
            self.plan.sitemap.as_ref().map(|_| Stage::Sitemap),
            Some(Stage::Emit),
        ].into_iter().flatten().collect()
    }

    /// The locale of every pass, in order.
    pub fn passes(&self) -> Vec<Option<Arc<str>>> {
        match &self.plan.locales {
            None => vec![None],
            Some(locales) if self.plan.expand == Expand::Clone => {
                vec![Some(locales.default_locale().clone())]
            }
            Some(locales) => locales.iter().cloned().map(Some).collect(),
        }
    }

    /// Runs every pass. In [`Mode::OneShot`], returns the first failure.
    pub fn build(&self, mode: Mode) -> Result<Vec<Pass>> {
        let stages = self.stages();
        let locales: Vec<Arc<str>> = self.plan.locales.iter()
            .flat_map(|l| l.iter().cloned())
            .collect();

        let mut passes = vec![];
        for locale in self.passes() {
            let start = Instant::now();
            let mut cx = Context::new(locale.clone(), locales.clone());
            let prefix = cx.log_prefix();
            let outcome = match self.run(&stages, &mut cx) {
                Ok(()) => {
                    let elapsed = start.elapsed().as_millis();
                    log::info!("{prefix}built {} documents in {elapsed}ms", cx.emitted.len());
                    Outcome::Built
                }
                Err(e) if mode == Mode::Watch => {
                    log::error!("{prefix}build failed\n{e}");
                    Outcome::Failed(e)
                }
                Err(e) => return Err(e),
            };

            passes.push(Pass { locale, emitted: cx.emitted, outcome });
        }

        Ok(passes)
    }

    fn run(&self, stages: &[Stage], cx: &mut Context) -> Result<()> {
        let documents = self.provider.provide()
            .chain_with(|| Fault::stage("provide", None))?;

        log::info!("{}building {} source documents", cx.log_prefix(), documents.len());
        for mut document in documents {
            prepare(&mut document);
            cx.documents.insert(document)
                .chain_with(|| Fault::stage("provide", None))?;
        }

        for stage in stages {
            log::debug!("{}stage {}", cx.log_prefix(), stage.name());
            stage.run(self, cx)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("plan", &self.plan)
            .field("engine", &self.engine)
            .field("transforms", &self.transforms.len())
            .finish_non_exhaustive()
    }
}
