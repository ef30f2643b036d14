use std::{fs, io};
use std::path::{Path, PathBuf};
use std::fmt::Debug;

use crate::error::{Result, Chainable};
use crate::value::{Value, Source};

/// Something bytes and values can be written to.
pub trait Sink: Debug {
    fn write<V: Into<Value> + 'static>(&self, value: V) -> Result<()> {
        self.write_value(value.into())
    }

    fn write_bytes(&self, bytes: &[u8]) -> Result<()>;

    fn write_value(&self, value: Value) -> Result<()> {
        match value {
            Value::Null => self.write_bytes(&[]),
            Value::String(s) => self.write_bytes(s.as_bytes()),
            Value::Dict(_) => Err("sink does not support dictionary writes".into()),
            Value::Array(ref values) => {
                let bytes = values.iter()
                    .map(|v| v.to_num().and_then(|n| u8::try_from(n.to_u128_lossy().ok()?).ok()))
                    .collect::<Option<Vec<u8>>>();

                match bytes {
                    Some(bytes) => self.write_bytes(&bytes),
                    None => err!("sink only supports arrays of bytes", "found" => value.kind()),
                }
            }
            other => match other.to_text("%Y-%m-%dT%H:%M:%S") {
                Some(text) => self.write_bytes(text.as_bytes()),
                None => err!("value has no text form", "kind" => other.kind()),
            }
        }
    }

    #[inline]
    fn write_from<S: Source>(&self, source: S) -> Result<()> {
        self.write(source.read()?)
    }
}

impl Sink for fs::File {
    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        use io::Write;

        let mut file = io::BufWriter::new(self);
        file.write_all(bytes)?;
        Ok(file.flush()?)
    }
}

impl Sink for &Path {
    /// Creates missing parent directories, then (re)creates the file.
    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent).chain_with(|| error! {
                "failed to create parent directory",
                "directory" => parent.display()
            })?;
        }

        fs::File::create(self)
            .chain(error! {
                "failed to open/create file for writing",
                "file path" => self.display()
            })?
            .write_bytes(bytes)
    }
}

impl Sink for PathBuf {
    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        <&Path as Sink>::write_bytes(&self.as_path(), bytes)
    }
}

impl<T: Sink> Sink for &T {
    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        <T as Sink>::write_bytes(self, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_create_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/index.html");
        target.write("<p>hi</p>").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "<p>hi</p>");

        target.write(Value::from(vec![104u8, 105])).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hi");
        assert!(target.write(Value::from(crate::value::Dict::<String, Value>::new())).is_err());
    }
}
