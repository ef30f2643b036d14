use std::path::{Path, PathBuf};
use std::sync::Arc;

use either::Either;
use parking_lot::Mutex;

use crate::error::{Chainable, Result};
use crate::value::Sink;

/// A finished document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub identity: Arc<str>,
    pub path: Option<String>,
    pub contents: Either<Arc<str>, Arc<[u8]>>,
}

/// Persists finished documents.
pub trait Emitter: Send + Sync {
    fn emit(&self, emission: &Emission) -> Result<()>;
}

impl Emission {
    /// The output file, relative to the output root: a directory path gets
    /// an `index.html`, a file path is used as is, and documents without a
    /// path are written at their identity.
    ///
    /// ```rust
    /// use smithy::emit::location;
    ///
    /// assert_eq!(location("blog/a.md", Some("/blog/a/")), "blog/a/index.html");
    /// assert_eq!(location("x.html", Some("/")), "index.html");
    /// assert_eq!(location("x.html", Some("/old/page.html")), "old/page.html");
    /// assert_eq!(location("img/logo.png", None), "img/logo.png");
    /// ```
    pub fn location(&self) -> String {
        location(&self.identity, self.path.as_deref())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_ref().either(|s| s.as_bytes(), |b| &b[..])
    }

    pub fn as_text(&self) -> Option<&str> {
        self.contents.as_ref().left().map(|s| &**s)
    }
}

/// See [`Emission::location()`].
pub fn location(identity: &str, path: Option<&str>) -> String {
    let Some(path) = path else {
        return identity.trim_start_matches('/').to_string();
    };

    let path = path.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path.to_string()
    }
}

/// Writes documents under an output directory.
#[derive(Debug, Clone)]
pub struct FsEmitter {
    root: PathBuf,
}

impl FsEmitter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsEmitter { root: root.as_ref().to_path_buf() }
    }
}

impl Emitter for FsEmitter {
    fn emit(&self, emission: &Emission) -> Result<()> {
        let location = emission.location();
        if location.split('/').any(|segment| segment == "..") {
            return err! {
                "output location escapes the output directory",
                "document" => &emission.identity,
                "location" => location,
            };
        }

        let file = self.root.join(&location);
        file.as_path().write_bytes(emission.as_bytes())
            .chain_with(|| error!("failed to write document", "document" => &emission.identity))
    }
}

/// Records emissions in memory.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    emitted: Mutex<Vec<Emission>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        MemoryEmitter::default()
    }

    /// Everything emitted so far, in order.
    pub fn emissions(&self) -> Vec<Emission> {
        self.emitted.lock().clone()
    }

    /// The last emission written to `location`.
    pub fn get(&self, location: &str) -> Option<Emission> {
        self.emitted.lock().iter().rev().find(|e| e.location() == location).cloned()
    }

    pub fn clear(&self) {
        self.emitted.lock().clear();
    }
}

impl Emitter for MemoryEmitter {
    fn emit(&self, emission: &Emission) -> Result<()> {
        self.emitted.lock().push(emission.clone());
        Ok(())
    }
}

impl<E: Emitter + ?Sized> Emitter for Arc<E> {
    fn emit(&self, emission: &Emission) -> Result<()> {
        (**self).emit(emission)
    }
}
