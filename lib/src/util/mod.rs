mod macros;

pub use macros::*;

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        // `\n` and other control characters transliterate to nothing.
        let ascii = match deunicode::deunicode_char(ch) {
            Some(s) if !ch.is_whitespace() && !ch.is_control() => s,
            _ => "-",
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters not alphanumeric or `_` are
                    // converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Returns `true` if `input` is likely to contain a template.
pub fn is_template(input: &str) -> bool {
    let mut slice = input.as_bytes();
    while let Some(i) = memchr::memchr(b'{', slice) {
        match slice.get(i + 1) {
            Some(b'{') | Some(b'%') => return true,
            Some(_) => slice = &slice[(i + 1)..],
            None => return false,
        }
    }

    false
}

/// The last `/`-separated segment of an identity.
///
/// ```rust
/// use smithy::util::file_name;
///
/// assert_eq!(file_name("blog/2020/hello.md"), "hello.md");
/// assert_eq!(file_name("index.html"), "index.html");
/// ```
pub fn file_name(identity: &str) -> &str {
    identity.rsplit_once('/').map_or(identity, |(_, name)| name)
}

/// File name without the extension.
pub fn file_stem(identity: &str) -> &str {
    let name = file_name(identity);
    match name.rsplit_once('.') {
        Some(("", _)) | None => name,
        Some((left, _)) => left,
    }
}

/// The extension, if any, without the dot.
pub fn file_ext(identity: &str) -> Option<&str> {
    match file_name(identity).rsplit_once('.') {
        Some(("", _)) | None => None,
        Some((_, ext)) => Some(ext),
    }
}

/// Replaces the extension of `identity` with `ext`, adding one if missing.
///
/// ```rust
/// use smithy::util::with_ext;
///
/// assert_eq!(with_ext("blog/post.md", "html"), "blog/post.html");
/// assert_eq!(with_ext("blog/README", "html"), "blog/README.html");
/// ```
pub fn with_ext(identity: &str, ext: &str) -> String {
    let stem_len = match file_ext(identity) {
        Some(old) => identity.len() - old.len() - 1,
        None => identity.len(),
    };

    format!("{}.{ext}", &identity[..stem_len])
}

/// Appends `.{ext}` to `name` if it has no extension of its own.
pub fn ensure_ext(name: &str, ext: &str) -> String {
    match file_ext(name) {
        Some(_) => name.to_string(),
        None => format!("{name}.{ext}"),
    }
}

#[cfg(test)]
mod slug_tests {
    #[test]
    fn test_slugify() {
        use crate::util::slugify;

        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string-1-1");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("Æúű--cool?"), "aeuu-cool");
        assert_eq!(slugify("You & Me"), "you-me");
        assert_eq!(slugify("tab\tand\r\nbreaks"), "tab-and-breaks");
        assert_eq!(slugify("bell\u{7}rings"), "bell-rings");
    }
}

#[cfg(test)]
mod name_tests {
    use super::*;

    #[test]
    fn stems_and_extensions() {
        assert_eq!(file_stem("blog/hello-world.md"), "hello-world");
        assert_eq!(file_stem("blog/.hidden"), ".hidden");
        assert_eq!(file_ext("blog/.hidden"), None);
        assert_eq!(file_ext("a/b/c.tar.gz"), Some("gz"));
        assert_eq!(ensure_ext("post", "html"), "post.html");
        assert_eq!(ensure_ext("post.jinja", "html"), "post.jinja");
    }

    #[test]
    fn template_detection() {
        assert!(is_template("<p>{{ title }}</p>"));
        assert!(is_template("{% if x %}y{% endif %}"));
        assert!(!is_template("function() { return 1; }"));
        assert!(!is_template("ends with {"));
    }
}
