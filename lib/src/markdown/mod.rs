mod frontmatter;
mod highlight;

pub use frontmatter::split_frontmatter;
pub use highlight::{highlight, warm_up, Highlighter};

use pulldown_cmark::{html, Options, Parser};

use crate::error::Result;
use crate::util::file_ext;

/// Converts a markup language to HTML.
pub trait Markup: Send + Sync {
    /// Whether documents at `identity` are written in this markup.
    fn accepts(&self, identity: &str) -> bool {
        matches!(file_ext(identity), Some("md" | "markdown" | "mdown"))
    }

    fn render(&self, input: &str) -> Result<String>;
}

/// CommonMark with GitHub extensions, highlighting fenced code blocks.
#[derive(Debug, Clone)]
pub struct CommonMark {
    options: Options,
    highlight: bool,
    line_numbers: bool,
}

impl CommonMark {
    pub fn new() -> Self {
        CommonMark {
            options: Options::all().difference(Options::ENABLE_SMART_PUNCTUATION),
            highlight: true,
            line_numbers: false,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn highlight(mut self, enable: bool, line_numbers: bool) -> Self {
        self.highlight = enable;
        self.line_numbers = line_numbers;
        self
    }
}

impl Default for CommonMark {
    fn default() -> Self {
        CommonMark::new()
    }
}

impl Markup for CommonMark {
    fn render(&self, input: &str) -> Result<String> {
        let parser = Parser::new_ext(input, self.options);
        let mut output = String::with_capacity(input.len() * 3 / 2);
        if self.highlight {
            html::push_html(&mut output, Highlighter::new(parser, self.line_numbers));
        } else {
            html::push_html(&mut output, parser);
        }

        Ok(output)
    }
}
