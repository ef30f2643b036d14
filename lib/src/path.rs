//! Output path canonicalization.
//!
//! Every output path ends up absolute (`/`-prefixed) and either a directory
//! (`/`-suffixed) or an `.html` file. Locale prefixes are applied first with
//! [`localize()`], then the result is made canonical with [`normalize()`];
//! [`fixup()`] does both in that order.

/// Characters a path may be made of. A path containing none of them is left
/// alone by [`normalize()`].
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.')
}

/// Makes `path` absolute and, unless it names an `.html` file, a directory.
///
/// Input without a single path character passes through unchanged. The
/// function is total and idempotent.
///
/// ```rust
/// use smithy::path::normalize;
///
/// assert_eq!(normalize("blog/hello-world"), "/blog/hello-world/");
/// assert_eq!(normalize("/blog/"), "/blog/");
/// assert_eq!(normalize("404.html"), "/404.html");
/// assert_eq!(normalize("???"), "???");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(path: &str) -> String {
    if !path.chars().any(is_path_char) {
        return path.to_string();
    }

    let mut normalized = String::with_capacity(path.len() + 2);
    if !path.starts_with('/') {
        normalized.push('/');
    }

    normalized.push_str(path);
    if !normalized.ends_with(".html") && !normalized.ends_with('/') {
        normalized.push('/');
    }

    normalized
}

/// Prefixes `path` with `current` unless `current` is the default locale (the
/// first of `locales`) or the path already starts with a known locale.
///
/// Without a current locale or a non-empty locale list, `path` is returned
/// as is. Otherwise empty segments are dropped and the result is rejoined
/// with a single leading `/` and no trailing one; follow with [`normalize()`].
///
/// ```rust
/// use smithy::path::localize;
///
/// let locales = ["en", "fr"];
/// assert_eq!(localize("/blog/a/", Some("fr"), Some(&locales[..])), "/fr/blog/a");
/// assert_eq!(localize("/fr/blog/a/", Some("fr"), Some(&locales[..])), "/fr/blog/a");
/// assert_eq!(localize("/blog/a/", Some("en"), Some(&locales[..])), "/blog/a/");
/// assert_eq!(localize("/blog/a/", None, Some(&locales[..])), "/blog/a/");
/// ```
pub fn localize<L: AsRef<str>>(path: &str, current: Option<&str>, locales: Option<&[L]>) -> String {
    let (Some(current), Some(locales)) = (current, locales) else {
        return path.to_string();
    };

    match locales.first() {
        Some(default) if default.as_ref() != current => {},
        _ => return path.to_string(),
    }

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let prefixed = segments.first()
        .map_or(false, |first| locales.iter().any(|l| l.as_ref() == *first));

    if !prefixed {
        segments.insert(0, current);
    }

    format!("/{}", segments.join("/"))
}

/// [`localize()`] then [`normalize()`]: the path fixup applied to every
/// output path. Applying it twice is the same as applying it once.
///
/// ```rust
/// use smithy::path::fixup;
///
/// let locales = ["en", "fr"];
/// assert_eq!(fixup("blog/a", Some("fr"), Some(&locales[..])), "/fr/blog/a/");
/// assert_eq!(fixup("blog/a", Some("en"), Some(&locales[..])), "/blog/a/");
/// assert_eq!(fixup("/fr/", Some("fr"), Some(&locales[..])), "/fr/");
/// ```
pub fn fixup<L: AsRef<str>>(path: &str, current: Option<&str>, locales: Option<&[L]>) -> String {
    normalize(&localize(path, current, locales))
}

/// `true` if `path` is in its final form: absolute and ending in `/` or
/// `.html`.
pub fn is_canonical(path: &str) -> bool {
    path.starts_with('/') && (path.ends_with('/') || path.ends_with(".html"))
}
