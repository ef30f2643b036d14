use std::{hash::Hash, sync::Arc};
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use either::Either;
use serde::{Serialize, Deserialize};

pub type Dict<K = Arc<str>, V = Value> = BTreeMap<K, V>;

/// Represents any valid value.
#[derive(Debug, Serialize, Hash, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Num(Num),
    String(Arc<str>),
    Date(NaiveDateTime),
    Array(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
}

impl Value {
    pub fn to_null(&self) -> Option<()> {
        match self {
            Value::Null => Some(()),
            _ => None
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn to_num(&self) -> Option<Num> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None
        }
    }

    pub fn to_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None
        }
    }

    pub fn into_str(self) -> Result<Arc<str>, Value> {
        match self {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None
        }
    }

    pub fn into_vec(self) -> Result<Arc<Vec<Value>>, Value> {
        match self {
            Value::Array(v) => Ok(v),
            _ => Err(self)
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(v) => Some(&**v),
            _ => None
        }
    }

    pub fn into_dict(self) -> Result<Arc<Dict>, Value> {
        match self {
            Value::Dict(v) => Ok(v),
            _ => Err(self)
        }
    }

    /// `true` for values that carry nothing: null, `""`, `[]`, and `{}`.
    /// `false` and `0` are not empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(v) => v.is_empty(),
            Value::Dict(v) => v.is_empty(),
            Value::Bool(_) | Value::Num(_) | Value::Date(_) => false,
        }
    }

    /// The value as it appears when spliced into text. Dates use `date_format`.
    /// Arrays join their elements with `,`; dictionaries have no text form.
    pub fn to_text(&self, date_format: &str) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Num(n) => Some(n.to_string()),
            Value::String(s) => Some(s.to_string()),
            Value::Date(d) => Some(d.format(date_format).to_string()),
            Value::Array(v) => v.iter()
                .map(|v| v.to_text(date_format))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            Value::Dict(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
        }
    }
}

/// Parses the date forms frontmatter authors actually write: `2020-01-31`,
/// `2020-01-31 10:00:00`, and RFC 3339 timestamps.
///
/// ```rust
/// use smithy::value::parse_date;
///
/// assert!(parse_date("2021-06-01").is_some());
/// assert!(parse_date("2021-06-01T12:30:00Z").is_some());
/// assert!(parse_date("June 1st").is_none());
/// ```
pub fn parse_date(string: &str) -> Option<NaiveDateTime> {
    let string = string.trim();
    if let Ok(date) = chrono::DateTime::parse_from_rfc3339(string) {
        return Some(date.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(string, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(string, "%Y-%m-%d").ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

macro_rules! impl_from_primitive {
    ($($T:ty),+ => $E:ident::$kind:ident) => {
        $(
            impl From<$T> for $E {
                fn from(value: $T) -> Self {
                    $E::$kind(value.into())
                }
            }
        )+
    };
}

impl_from_primitive!(bool => Value::Bool);
impl_from_primitive!(&str => Value::String);
impl_from_primitive!(std::borrow::Cow<'_, str> => Value::String);
impl_from_primitive!(String => Value::String);
impl_from_primitive!(Arc<str> => Value::String);
impl_from_primitive!(NaiveDateTime => Value::Date);
impl_from_primitive!(Arc<Vec<Value>> => Value::Array);
impl_from_primitive!(Arc<Dict> => Value::Dict);
impl_from_primitive!(u8, u16, u32, u64, u128, usize => Value::Num);
impl_from_primitive!(i8, i16, i32, i64, i128, isize => Value::Num);
impl_from_primitive!(f64 => Value::Num);

impl From<()> for Value  {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<A, B> From<Either<A, B>> for Value where Value: From<A>, Value: From<B> {
    fn from(value: Either<A, B>) -> Self {
        either::for_both!(value, v => v.into())
    }
}

impl<T> From<Option<T>> for Value where Value: From<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl<T> From<Vec<T>> for Value where Value: From<T> {
    fn from(value: Vec<T>) -> Self {
        value.into_iter()
            .map(Value::from)
            .collect()
    }
}

impl<K, V> From<Dict<K, V>> for Value where Arc<str>: From<K>, Value: From<V> {
    fn from(value: Dict<K, V>) -> Self {
        let dict = value.into_iter()
            .map(|(k, v)| (<Arc::<str>>::from(k), Value::from(v)))
            .collect::<Dict>();

        Value::Dict(Arc::new(dict))
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let vec = iter.into_iter().collect::<Vec<Value>>();
        Value::Array(Arc::from(vec))
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::from(s),
            toml::Value::Integer(i) => Value::from(i),
            toml::Value::Float(f) => Value::from(f),
            toml::Value::Boolean(b) => Value::from(b),
            toml::Value::Datetime(d) => {
                let string = d.to_string();
                parse_date(&string).map(Value::Date).unwrap_or_else(|| Value::from(string))
            }
            toml::Value::Array(v) => v.into_iter().map(Value::from).collect(),
            toml::Value::Table(t) => t.into_iter().collect::<Dict<String, toml::Value>>().into(),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::from(b),
            Yaml::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
                (Some(u), _, _) => Value::from(u),
                (_, Some(i), _) => Value::from(i),
                (_, _, Some(f)) => Value::from(f),
                _ => Value::Null,
            },
            Yaml::String(s) => parse_date(&s).map(Value::Date).unwrap_or_else(|| Value::from(s)),
            Yaml::Sequence(v) => v.into_iter().map(Value::from).collect(),
            Yaml::Mapping(m) => {
                let dict = m.into_iter()
                    .filter_map(|(k, v)| match k {
                        Yaml::String(k) => Some((Arc::from(k), Value::from(v))),
                        Yaml::Number(n) => Some((Arc::from(n.to_string()), Value::from(v))),
                        Yaml::Bool(b) => Some((Arc::from(b.to_string()), Value::from(v))),
                        _ => None,
                    })
                    .collect::<Dict>();

                Value::Dict(Arc::new(dict))
            }
            Yaml::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::from(b),
            Json::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
                (Some(u), _, _) => Value::from(u),
                (_, Some(i), _) => Value::from(i),
                (_, _, Some(f)) => Value::from(f),
                _ => Value::Null,
            },
            Json::String(s) => Value::from(s),
            Json::Array(v) => v.into_iter().map(Value::from).collect(),
            Json::Object(m) => m.into_iter().collect::<Dict<String, Json>>().into(),
        }
    }
}

/// A signed, unsigned, or floating point numeric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Num {
    /// An 8-bit unsigned integer.
    U8(u8),
    /// A 16-bit unsigned integer.
    U16(u16),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A 128-bit unsigned integer.
    U128(u128),
    /// An unsigned integer of platform width.
    USize(usize),
    /// An 8-bit signed integer.
    I8(i8),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 128-bit signed integer.
    I128(i128),
    /// A signed integer of platform width.
    ISize(isize),
    /// A 64-bit float.
    F64(f64),
}

impl Num {
    /// Converts `self` into a `u128` if it is a non-negative integer.
    pub fn to_u128_lossy(self) -> Result<u128, i128> {
        Ok(match self {
            Num::U8(v) => v as u128,
            Num::U16(v) => v as u128,
            Num::U32(v) => v as u128,
            Num::U64(v) => v as u128,
            Num::U128(v) => v,
            Num::USize(v) => v as u128,
            Num::I8(v) if v >= 0 => v as u128,
            Num::I16(v) if v >= 0 => v as u128,
            Num::I32(v) if v >= 0 => v as u128,
            Num::I64(v) if v >= 0 => v as u128,
            Num::I128(v) if v >= 0 => v as u128,
            Num::ISize(v) if v >= 0 => v as u128,
            Num::F64(v) if v >= 0.0 && v.fract() == 0.0 => v as u128,
            Num::I8(v) => return Err(v as i128),
            Num::I16(v) => return Err(v as i128),
            Num::I32(v) => return Err(v as i128),
            Num::I64(v) => return Err(v as i128),
            Num::I128(v) => return Err(v),
            Num::ISize(v) => return Err(v as i128),
            Num::F64(v) => return Err(v as i128),
        })
    }

    /// The float this number denotes, if it has a fractional part.
    fn fraction(self) -> Option<f64> {
        match self {
            Num::F64(v) if v.fract() != 0.0 || !v.is_finite() => Some(v),
            _ => None,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Num::F64(v) => v,
            n => match n.to_u128_lossy() {
                Ok(v) => v as f64,
                Err(v) => v as f64,
            }
        }
    }
}

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fraction() {
            Some(v) => v.fmt(f),
            None => match self.to_u128_lossy() {
                Ok(v) => v.fmt(f),
                Err(v) => v.fmt(f),
            }
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Num { }

impl std::hash::Hash for Num {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self.fraction() {
            Some(v) => v.to_bits().hash(state),
            None => match self.to_u128_lossy() {
                Ok(v) => v.hash(state),
                Err(v) => v.hash(state),
            }
        }
    }
}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    /// ```rust
    /// use smithy::value::Num;
    ///
    /// assert!(Num::from(-1i8) < Num::from(0u8));
    /// assert!(Num::from(-0i8) == Num::from(0u8));
    /// assert!(Num::from(-20i32) == Num::from(-20i32));
    /// assert!(Num::from(10i32) == Num::from(10u64));
    /// assert!(Num::from(-2i8) > Num::from(-3i8));
    /// assert!(Num::from(1i8) > Num::from(0u8));
    /// assert!(Num::from(5u32) > Num::from(-1i64));
    /// assert!(Num::from(1.5f64) > Num::from(1u8));
    /// assert!(Num::from(2.0f64) == Num::from(2u8));
    /// ```
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.fraction().is_some() || other.fraction().is_some() {
            return self.to_f64().total_cmp(&other.to_f64());
        }

        match (self.to_u128_lossy(), other.to_u128_lossy()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Greater,
            (Err(_), Ok(_)) => std::cmp::Ordering::Less,
            (Err(a), Err(b)) => a.cmp(&b),
        }
    }
}

macro_rules! impl_from_for_num_value {
    ($($T:ty: $V:ident),* $(,)?) => ($(
        impl From<$T> for Num {
            fn from(value: $T) -> Num {
                Num::$V(value)
            }
        }
    )*)
}

impl_from_for_num_value! {
    u8: U8, u16: U16, u32: U32, u64: U64, u128: U128, usize: USize,
    i8: I8, i16: I16, i32: I32, i64: I64, i128: I128, isize: ISize,
    f64: F64,
}

macro_rules! impl_try_from_value {
    ($($T:ty),+ => | $v:ident | $e:expr) => {
        $(
            impl TryFrom<$crate::value::Value> for $T {
                type Error = Value;

                fn try_from($v: $crate::value::Value) -> Result<Self, Self::Error> {
                    (|| $e)()
                }
            }
        )+
    };
}

impl_try_from_value!(() => |v| v.to_null().ok_or(v));
impl_try_from_value!(bool => |v| v.to_bool().ok_or(v));
impl_try_from_value!(Arc<str> => |v| v.into_str());
impl_try_from_value!(Arc<Dict> => |v| v.into_dict());
impl_try_from_value!(NaiveDateTime => |v| v.to_date().ok_or(v));
impl_try_from_value!(Num => |v| v.to_num().ok_or(v));

impl_try_from_value!(u8, u16, u32, u64, u128, usize =>
    |v| v.to_num().and_then(|v| v.to_u128_lossy().ok()?.try_into().ok()).ok_or(v));

impl_try_from_value!(i8, i16, i32, i64, i128, isize =>
    |v| v.to_num().and_then(|v| match v.to_u128_lossy() {
        Ok(u) => u.try_into().ok(),
        Err(i) => i.try_into().ok(),
    }).ok_or(v));

impl<T: TryFrom<Value, Error = Value>> TryFrom<Value> for Vec<T> {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let arc = value.into_vec()?;
        match Arc::try_unwrap(arc) {
            Ok(vec) => vec.into_iter().map(|v| v.try_into()).collect(),
            Err(arc) => arc.iter().cloned().map(|v| v.try_into()).collect()
        }
    }
}
