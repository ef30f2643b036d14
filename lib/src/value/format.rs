use std::sync::Arc;

use crate::error::{ErrorDetail, Result};
use crate::value::{Value, Source};

/// A textual data format: TOML, JSON, or YAML.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`.
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Parses `string` into a [`Value`], keeping format-native dates as
    /// [`Value::Date`].
    fn value(string: &str) -> Result<Value, Self::Error>;

    fn read<I: Source, T: serde::de::DeserializeOwned>(input: I) -> Result<T> {
        let input = input.try_read::<Arc<str>>()?;
        Ok(Self::from_str(&input)?)
    }

    fn read_value<I: Source>(input: I) -> Result<Value> {
        let input = input.try_read::<Arc<str>>()?;
        Ok(Self::value(&input)?)
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $V:ty, $E:ty) => (
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }

            fn value(s: &str) -> Result<Value, $E> {
                let value: $V = $func(s)?;
                Ok(Value::from(value))
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::Value, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::Value, serde_json::Error);
impl_format!(Yaml: serde_yaml::from_str, serde_yaml::Value, serde_yaml::Error);
