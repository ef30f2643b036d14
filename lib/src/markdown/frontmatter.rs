use crate::error::Result;
use crate::value::{Dict, Format, Toml, Value, Yaml};

/// Splits a leading frontmatter block off `input`.
///
/// A `+++` fence opens a TOML block and a `---` fence a YAML block; the
/// block ends at the next line holding only the same fence. Input without a
/// complete block is returned whole with no frontmatter.
///
/// ```rust
/// use smithy::markdown::split_frontmatter;
///
/// let (front, body) = split_frontmatter("+++\ntitle = 'Hi'\n+++\n# Hi\n").unwrap();
/// assert_eq!(front.unwrap()["title"].as_str(), Some("Hi"));
/// assert_eq!(body, "# Hi\n");
///
/// let (front, body) = split_frontmatter("# Hi\n").unwrap();
/// assert!(front.is_none());
/// assert_eq!(body, "# Hi\n");
/// ```
pub fn split_frontmatter(input: &str) -> Result<(Option<Dict>, &str)> {
    let Some((fence, block, body)) = ["+++", "---"].into_iter().find_map(|f| fenced(input, f)) else {
        return Ok((None, input));
    };

    let value = match fence {
        "+++" => Toml::value(block)?,
        _ => Yaml::value(block)?,
    };

    match value {
        Value::Null => Ok((Some(Dict::new()), body)),
        Value::Dict(dict) => Ok((Some((*dict).clone()), body)),
        other => err! {
            "frontmatter is not a table",
            "found" => other.kind(),
        },
    }
}

fn fenced<'a>(input: &'a str, fence: &'static str) -> Option<(&'static str, &'a str, &'a str)> {
    let rest = input.strip_prefix(fence)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == fence {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((fence, block, body));
        }

        offset += line.len();
    }

    None
}
