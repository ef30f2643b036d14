use std::fs;
use std::sync::Arc;

use smithy::config::Settings;
use smithy::emit::MemoryEmitter;
use smithy::error::Result;
use smithy::ingest::MemoryProvider;
use smithy::markdown::CommonMark;
use smithy::pipeline::{Driver, Mode, Transform};
use smithy::templating::minijinja::MiniJinjaEngine;
use smithy::value::{Format, Toml};

struct Site {
    sources: Arc<MemoryProvider>,
    output: Arc<MemoryEmitter>,
    driver: Driver,
}

fn site(config: &str, layouts: &[(&str, &str)]) -> Site {
    let settings: Settings = Toml::from_str(config).unwrap();
    let mut engine = MiniJinjaEngine::new(None, settings.globals());
    for (name, source) in layouts {
        engine.add_template(name, source).unwrap();
    }

    let sources = Arc::new(MemoryProvider::new());
    let output = Arc::new(MemoryEmitter::new());
    let plan = settings.validate().unwrap();
    let driver = Driver::new(plan, sources.clone(), CommonMark::new(), engine, output.clone());
    Site { sources, output, driver }
}

impl Site {
    fn add(&self, identity: &str, text: &str) -> &Self {
        self.sources.add(identity, text).unwrap();
        self
    }

    fn text(&self, location: &str) -> String {
        let emission = self.output.get(location)
            .unwrap_or_else(|| panic!("nothing written to {location}"));

        emission.as_text().unwrap().to_string()
    }

    fn locations(&self) -> Vec<String> {
        self.output.emissions().iter().map(|e| e.location()).collect()
    }
}

// Paths go through `safe`: HTML autoescaping encodes `/`.
const BLOG_LAYOUT: &str = "\
{%- if pagination -%}
page {{ pagination.num }}:{% for f in pagination.files %} {{ f.path|safe }}{% endfor %}
{%- if pagination.previous %} prev={{ pagination.previous.path|safe }}{% endif %}
{%- if pagination.next %} next={{ pagination.next.path|safe }}{% endif %}
{%- else -%}
<h1>{{ title }}</h1>{{ contents|safe }}
{%- endif -%}";

#[test]
fn six_posts_two_pages() {
    let site = site(r#"
        [collections.blog]
        pattern = "blog/*.md"
        sort_by = "date"
        paginate = { per_page = 5 }
    "#, &[("blog.html", BLOG_LAYOUT)]);

    for n in 1..=6 {
        let post = format!("---\ntitle: Post {n}\ndate: 2020-01-0{}\n---\nBody {n}\n", 7 - n);
        site.add(&format!("blog/post-{n}.md"), &post);
    }

    let passes = site.driver.build(Mode::OneShot).unwrap();
    assert_eq!(passes.len(), 1);
    assert!(passes[0].outcome.is_built());
    assert_eq!(passes[0].locale, None);
    assert_eq!(passes[0].emitted.len(), 8);

    let first = site.text("blog/index.html");
    assert_eq!(first, "page 1: /blog/post-6/ /blog/post-5/ /blog/post-4/ /blog/post-3/ /blog/post-2/ next=/blog/2/");
    assert_eq!(site.text("blog/2/index.html"), "page 2: /blog/post-1/ prev=/blog/");

    let post = site.text("blog/post-3/index.html");
    assert_eq!(post, "<h1>Post 3</h1><p>Body 3</p>\n");

    let shells: Vec<_> = passes[0].emitted.iter()
        .filter(|e| e.identity.ends_with("/index"))
        .map(|e| e.path.as_deref().unwrap())
        .collect();

    assert_eq!(shells, ["/blog/", "/blog/2/"]);
    for emitted in &passes[0].emitted {
        let path = emitted.path.as_deref().unwrap();
        assert!(smithy::path::is_canonical(path), "{path} is not canonical");
    }
}

#[test]
fn rebuilding_is_byte_identical() {
    let site = site(r#"
        [collections.notes]
        pattern = "notes/*.md"
        reverse = true
        paginate = { per_page = 2, path = "notes/page/:num" }
    "#, &[("notes.html", BLOG_LAYOUT)]);

    site.add("notes/a.md", "# A")
        .add("notes/b.md", "# B")
        .add("notes/c.md", "# C")
        .add("style.css", "body {}");

    site.driver.build(Mode::OneShot).unwrap();
    let first = site.output.emissions();
    site.output.clear();
    site.driver.build(Mode::OneShot).unwrap();
    assert_eq!(first, site.output.emissions());

    assert!(site.locations().contains(&"notes/page/2/index.html".to_string()));
    assert_eq!(site.text("style.css"), "body {}");
    assert_eq!(site.text("notes/page/1/index.html"), "page 1: /notes/c/ /notes/b/ next=/notes/page/2/");
}

#[test]
fn rewrite_builds_one_pass_per_locale() {
    let site = site(r#"
        [i18n]
        locales = ["en", "fr"]

        [collections.blog]
        pattern = "blog/*.md"
    "#, &[("blog.html", "{{ title }}|{{ locale }}|{{ link('/about/') }}")]);

    site.add("blog/a.md", "---\ntitle: A\n---\n")
        .add("blog/b.md", "---\ntitle: B\n---\n")
        .add("fr/blog/a.md", "---\ntitle: A fr\n---\n");

    let passes = site.driver.build(Mode::OneShot).unwrap();
    let locales: Vec<_> = passes.iter().map(|p| p.locale.as_deref().unwrap()).collect();
    assert_eq!(locales, ["en", "fr"]);

    assert_eq!(site.text("blog/a/index.html"), "A|en|/about/");
    assert_eq!(site.text("blog/b/index.html"), "B|en|/about/");
    assert_eq!(site.text("fr/blog/a/index.html"), "A fr|fr|/fr/about/");
    assert_eq!(site.text("fr/blog/b/index.html"), "B|fr|/fr/about/");

    let en: Vec<_> = passes[0].emitted.iter().map(|e| &*e.identity).collect();
    assert_eq!(en, ["blog/a.html", "blog/b.html"]);
    assert_eq!(passes[1].emitted.len(), 2);
}

#[test]
fn clone_expands_in_a_single_pass() {
    let site = site(r#"
        [i18n]
        locales = ["en", "fr", "de"]
        expand = "clone"
    "#, &[]);

    site.add("about.html", "<p>{{ locale }}</p>")
        .add("de/about.html", "---\ntitle: Über\n---\n<p>{{ title }}</p>");

    let passes = site.driver.build(Mode::OneShot).unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(site.locations(), ["about.html", "de/about.html", "fr/about.html"]);
    assert_eq!(site.text("about.html"), "<p>en</p>");
    assert_eq!(site.text("fr/about.html"), "<p>fr</p>");
    assert_eq!(site.text("de/about.html"), "<p>Über</p>");
}

#[test]
fn clones_link_within_their_locale() {
    let layout = "{{ path|safe }}\
        {% if previous %} prev={{ previous.path|safe }}{% endif %}\
        {% if next %} next={{ next.path|safe }}{% endif %}";

    let site = site(r#"
        [i18n]
        locales = ["en", "fr"]
        expand = "clone"

        [collections.blog]
        pattern = "blog/*.md"
    "#, &[("blog.html", layout)]);

    site.add("blog/a.md", "A").add("blog/b.md", "B");
    site.driver.build(Mode::OneShot).unwrap();

    assert_eq!(site.text("blog/a/index.html"), "/blog/a/ next=/blog/b/");
    assert_eq!(site.text("fr/blog/a/index.html"), "/fr/blog/a/ next=/fr/blog/b/");
    assert_eq!(site.text("fr/blog/b/index.html"), "/fr/blog/b/ prev=/fr/blog/a/");
}

#[test]
fn failed_passes_in_watch_mode() {
    let site = site(r#"
        [i18n]
        locales = ["en", "fr"]
        expand = "off"

        [collections.blog]
        pattern = "**/blog/*.md"
    "#, &[("blog.html", "{{ title }}")]);

    site.add("blog/a.md", "---\ntitle: A\nlocale: en\n---\n")
        .add("fr/blog/a.md", "---\ntitle: A\nlayout: missing\n---\n");

    let error = site.driver.build(Mode::OneShot).unwrap_err();
    assert!(error.to_string().contains("stage `layout` failed"), "{error}");

    site.output.clear();
    let passes = site.driver.build(Mode::Watch).unwrap();
    assert_eq!(passes.len(), 2);
    assert!(passes[0].outcome.is_built());
    assert!(passes[1].outcome.error().is_some());
    assert_eq!(site.locations(), ["blog/a/index.html"]);
}

#[test]
fn collisions() {
    let config = |policy: &str| format!("collisions = \"{policy}\"");
    let pages = [
        ("a.html", "---\npermalink: same\n---\nA"),
        ("b.html", "---\npermalink: same\n---\nB"),
    ];

    let warn = site(&config("warn"), &[]);
    pages.iter().for_each(|(id, text)| { warn.add(id, text); });
    warn.driver.build(Mode::OneShot).unwrap();
    assert_eq!(warn.text("same/index.html"), "B");

    let error = site(&config("error"), &[]);
    pages.iter().for_each(|(id, text)| { error.add(id, text); });
    let e = error.driver.build(Mode::OneShot).unwrap_err();
    assert!(e.to_string().contains("output collision at `same/index.html`"), "{e}");

    // Markup renames onto an existing page.
    let pages = [("about.html", "<p>html</p>"), ("about.md", "markdown")];

    let warn = site(&config("warn"), &[]);
    pages.iter().for_each(|(id, text)| { warn.add(id, text); });
    let passes = warn.driver.build(Mode::OneShot).unwrap();
    assert_eq!(passes[0].emitted.len(), 1);
    assert_eq!(warn.text("about.html"), "<p>markdown</p>\n");

    let error = site(&config("error"), &[]);
    pages.iter().for_each(|(id, text)| { error.add(id, text); });
    let e = error.driver.build(Mode::OneShot).unwrap_err();
    assert!(e.to_string().contains("output collision at `about.html`"), "{e}");
}

#[test]
fn tag_listings() {
    let site = site(r#"
        [tags]
        per_page = 1
    "#, &[("tag.html", "{{ tag }}:{% for f in pagination.files %}{{ f.title }}{% endfor %}")]);

    site.add("a.md", "---\ntitle: A\ntags: [Rust, Web Dev]\n---\n")
        .add("b.md", "---\ntitle: B\ntags: rust\n---\n");

    site.driver.build(Mode::OneShot).unwrap();
    assert_eq!(site.text("tags/rust/index.html"), "Rust:A");
    assert_eq!(site.text("tags/rust/2/index.html"), "Rust:B");
    assert_eq!(site.text("tags/web-dev/index.html"), "Web Dev:A");
    assert!(site.text("a.html").is_empty());
}

#[test]
fn tag_listings_cannot_shadow_collections() {
    let site = site(r#"
        [collections.blog]
        pattern = "blog/*.md"
        paginate = { per_page = 2 }

        [tags]
        path = ":tag"
    "#, &[("blog.html", BLOG_LAYOUT), ("tag.html", "{{ tag }}")]);

    site.add("blog/a.md", "---\ntags: news\n---\n");
    site.driver.build(Mode::OneShot).unwrap();
    assert_eq!(site.text("news/index.html"), "news");

    site.add("blog/b.md", "---\ntags: Blog\n---\n");
    let e = site.driver.build(Mode::OneShot).unwrap_err();
    assert!(e.to_string().contains("tag listing `blog` is also a paginated collection"), "{e}");
}

struct Shout;

impl Transform for Shout {
    fn name(&self) -> &str { "shout" }

    fn gate(&self) -> &str { "shout" }

    fn apply(&self, html: &str) -> Result<String> {
        Ok(html.to_uppercase())
    }
}

#[test]
fn gated_transforms() {
    let Site { sources, output, driver } = site("", &[]);
    let driver = driver.transform(Shout);
    assert!(driver.stages().contains(&smithy::pipeline::Stage::Transform));

    sources.add("loud.md", "---\nshout: true\n---\nhello").unwrap();
    sources.add("quiet.md", "hello").unwrap();
    driver.build(Mode::OneShot).unwrap();

    assert_eq!(output.get("loud.html").unwrap().as_text(), Some("<P>HELLO</P>\n"));
    assert_eq!(output.get("quiet.html").unwrap().as_text(), Some("<p>hello</p>\n"));
}

#[test]
fn builds_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("site");
    let output = dir.path().join("public");
    fs::create_dir_all(input.join("content/blog")).unwrap();
    fs::create_dir_all(input.join("templates")).unwrap();

    fs::write(input.join("content/blog/hello.md"), "\
+++
title = \"Hello\"
date = 2024-03-01
+++
```rust
fn main() {}
```
").unwrap();

    fs::write(input.join("content/logo.png"), [0x89, b'P', b'N', b'G', 0xff]).unwrap();
    fs::write(input.join("content/.DS_Store"), "junk").unwrap();
    fs::write(input.join("templates/post.html"), "<title>{{ site.name }}: {{ title }}</title>{{ contents|safe }}").unwrap();

    let settings: Settings = Toml::from_str(r#"
        name = "Example"

        [collections.blog]
        pattern = "blog/*.md"
        layout = "post"
        permalink = "/:date/:slug"
        date = "%Y/%m"

        [sitemap]
        hostname = "https://example.com"
    "#).unwrap();

    let driver = Driver::for_site(&settings.rebase(&input), &output).unwrap();
    driver.build(Mode::OneShot).unwrap();

    let post = fs::read_to_string(output.join("2024/03/hello/index.html")).unwrap();
    assert!(post.starts_with("<title>Example: Hello</title>"), "{post}");
    assert!(post.contains("language-rust"), "{post}");

    assert!(output.join("logo.png").is_file());
    assert!(!output.join(".DS_Store").exists());

    let sitemap = fs::read_to_string(output.join("sitemap.xml")).unwrap();
    assert!(sitemap.contains("<loc>https://example.com/2024/03/hello/</loc>"));
    assert!(sitemap.contains("<lastmod>2024-03-01</lastmod>"));
}
