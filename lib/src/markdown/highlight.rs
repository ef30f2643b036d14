use pulldown_cmark::{Event, Tag, CodeBlockKind, TagEnd};
use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::{SyntaxSet, SyntaxReference};
use syntect::util::LinesWithEndings;
use once_cell::sync::Lazy;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static DEFAULT_SYNTAX: Lazy<&'static SyntaxReference>
    = Lazy::new(|| SYNTAX_SET.find_syntax_plain_text());

/// Replaces fenced code blocks in an event stream with syntax-highlighted
/// HTML using `language-*` classes.
pub struct Highlighter<I> {
    inner: I,
    line_numbers: bool,
    block: Option<(String, String)>,
}

impl<I> Highlighter<I> {
    pub fn new(inner: I, line_numbers: bool) -> Self {
        Highlighter { inner, line_numbers, block: None }
    }
}

/// Loads the syntax definitions in the background.
#[inline]
pub fn warm_up() {
    rayon::spawn(|| { Lazy::force(&DEFAULT_SYNTAX); });
}

/// The language of a fence label such as `rust,ignore`, restricted to
/// characters safe inside a class attribute.
fn language(label: &str) -> String {
    label.split(|c: char| c == ',' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect()
}

fn syntax(lang: &str) -> &'static SyntaxReference {
    if lang.is_empty() {
        return *DEFAULT_SYNTAX;
    }

    match SYNTAX_SET.find_syntax_by_token(lang) {
        Some(syntax) => syntax,
        None => {
            log::warn!("no syntax highlighting available for `{lang}`");
            *DEFAULT_SYNTAX
        }
    }
}

/// Renders one code block.
///
/// ```rust
/// use smithy::markdown::highlight;
///
/// let html = highlight("rust", "fn main() {}\n", false);
/// assert!(html.starts_with(r#"<pre class="language-rust"><code class="language-rust">"#));
/// assert!(html.ends_with("</code></pre>"));
/// ```
pub fn highlight(lang: &str, code: &str, line_numbers: bool) -> String {
    use std::fmt::Write;

    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax(lang),
        &SYNTAX_SET,
        ClassStyle::Spaced,
    );

    for line in LinesWithEndings::from(code) {
        let _ = generator.parse_html_for_line_which_includes_newline(line);
    }

    let class = match lang {
        "" => String::new(),
        lang => format!(" class=\"language-{lang}\""),
    };

    let mut html = String::new();
    if line_numbers {
        let lines = memchr::memchr_iter(b'\n', code.as_bytes()).count().max(1);
        let _ = write!(&mut html, "<div class=\"code\" style=\"display: flex;\">");
        let _ = write!(&mut html, "<pre class=\"line-nums\">");
        for i in 1..=lines {
            if i < lines { let _ = writeln!(&mut html, "{i}"); }
            else { let _ = write!(&mut html, "{i}"); }
        }

        let _ = write!(&mut html, "</pre>");
    }

    let _ = write!(&mut html, "<pre{class}><code{class}>{}</code></pre>", generator.finalize());
    if line_numbers {
        html.push_str("</div>");
    }

    html
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Highlighter<I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label))) => {
                    self.block = Some((language(&label), String::new()));
                }
                Event::Text(text) if self.block.is_some() => {
                    if let Some((_, code)) = self.block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if self.block.is_some() => {
                    let (lang, code) = self.block.take()?;
                    let html = highlight(&lang, &code, self.line_numbers);
                    return Some(Event::Html(html.into()));
                },
                ev => return Some(ev),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_labels() {
        assert_eq!(language("rust,ignore"), "rust");
        assert_eq!(language("c++ title=x"), "c++");
        assert_eq!(language("\"><script>"), "script");
        assert_eq!(language(""), "");
    }

    #[test]
    fn line_numbers() {
        let html = highlight("", "a\nb\nc\n", true);
        assert!(html.contains("<pre class=\"line-nums\">1\n2\n3</pre>"));
        assert!(html.contains("<pre><code>"));
    }

    #[test]
    fn unknown_languages_fall_back_to_plain_text() {
        let html = highlight("no-such-language", "x < y\n", false);
        assert!(html.starts_with("<pre class=\"language-no-such-language\">"));
        assert!(html.contains("x &lt; y"));
    }
}
