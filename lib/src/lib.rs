#![doc = svgbobdoc::transform!(
//! The ordered document pipeline of a static site generator.
//!
//! # Overview
//!
//! Smithy takes a set of source documents, Markdown, HTML templates, and
//! opaque assets, and runs it through a fixed sequence of stages that group,
//! localize, paginate, route, and render it into an output tree. Every stage
//! sees the whole document set as the previous stage left it:
//!
//! ```svgbob
//!  +----------+    +-------+    +---------+    +-------+    +--------+
//!  | Provider +--->| group +--->| expand? +--->| tags? +--->| markup |
//!  +----------+    +-------+    +---------+    +-------+    +---+----+
//!                                                               |
//!  +--------+    +-------+    +-----------+    +----------+     |
//!  | layout |<---+ fixup |<---+ permalink |<---+ paginate |<----+
//!  +---+----+    +-------+    +-----------+    +----------+
//!      |
//!  +---v--------+    +-------+    +----------+    +------+    +---------+
//!  | transform? +--->| fixup +--->| sitemap? +--->| emit +--->| Emitter |
//!  +------------+    +-------+    +----------+    +------+    +---------+
//! ```
//!
//! A build is one such pass per configured locale, run in order; see
//! [`pipeline`].
//!
//! ## Documents
//!
//! A [`Document`] has an _identity_, its path relative to the source root,
//! which is unique within a pass but may be rewritten (`blog/a.md` becomes
//! `fr/blog/a.html` on its way through a French pass). Collections and page
//! shells therefore refer to documents by [`DocId`], a handle that never
//! changes. Frontmatter lives in the document's [`Metadata`], an open map of
//! [`Value`](value::Value)s.
//!
//! ## Paths
//!
//! Output paths are computed by [`permalink`] patterns such as
//! `blog/:date/:slug` or by the [`paginate`] rules, and then pass through
//! [`path::fixup()`]: localized for the pass (never for the default locale)
//! and normalized to an absolute path ending in `/` or `.html`.
//!
//! ## Collaborators
//!
//! Reading sources, rendering Markdown, applying layouts, and writing output
//! are behind the [`Provider`](ingest::Provider),
//! [`Markup`](markdown::Markup), [`Engine`](templating::Engine), and
//! [`Emitter`](emit::Emitter) traits, each with a filesystem or library
//! backed implementation and, where useful for tests, an in-memory one.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod taxonomy;
pub mod path;
pub mod permalink;
pub mod collection;
pub mod paginate;
pub mod tags;
pub mod locale;
pub mod markdown;
pub mod templating;
pub mod fstree;
pub mod ingest;
pub mod emit;
pub mod sitemap;
pub mod config;
pub mod pipeline;

pub use taxonomy::*;

pub use rayon;

#[cfg(test)] static_assertions::assert_impl_all!(value::Value: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(Document: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(DocumentSet: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(error::Error: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(pipeline::Pass: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(pipeline::Driver: Send, Sync);
