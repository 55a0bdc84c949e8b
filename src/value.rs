use std::fmt;

use smol_str::SmolStr;

/// A dynamically typed SQL value.
///
/// Used both for bound arguments and for raw column values handed back by a
/// driver. Drivers are expected to hand back the narrow set of 64-bit
/// integers, 64-bit floats, strings, booleans, byte sequences and null, plus
/// whatever optional types are enabled through features.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    #[cfg(feature = "chrono")]
    Timestamp(chrono::DateTime<chrono::Utc>),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is the zero value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::I64(i) => *i == 0,
            Value::F64(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            #[cfg(feature = "chrono")]
            Value::Timestamp(t) => t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0,
            #[cfg(feature = "uuid")]
            Value::Uuid(u) => u.is_nil(),
            #[cfg(feature = "json")]
            Value::Json(j) => j.is_null(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            #[cfg(feature = "chrono")]
            Value::Timestamp(_) => "timestamp",
            #[cfg(feature = "uuid")]
            Value::Uuid(_) => "uuid",
            #[cfg(feature = "json")]
            Value::Json(_) => "json",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I64(i) => write!(f, "{i}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "{b:?}"),
            #[cfg(feature = "chrono")]
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            #[cfg(feature = "uuid")]
            Value::Uuid(u) => write!(f, "{u}"),
            #[cfg(feature = "json")]
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    #[inline]
    fn into_value(self) -> Value {
        self
    }
}

impl<T> IntoValue for Option<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

macro_rules! into_value {
    ($variant:ident as $cast:ty: $($ty:ty),+) => {
        $(
            impl IntoValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self as $cast)
                }
            }
        )+
    };
}

into_value!(I64 as i64: i8, i16, i32, i64, isize, u8, u16, u32);
into_value!(F64 as f64: f32, f64);

impl IntoValue for bool {
    #[inline]
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoValue for &String {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(self.clone())
    }
}

impl IntoValue for SmolStr {
    #[inline]
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

#[cfg(feature = "chrono")]
impl IntoValue for chrono::DateTime<chrono::Utc> {
    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }
}

#[cfg(feature = "uuid")]
impl IntoValue for uuid::Uuid {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

#[cfg(feature = "json")]
impl IntoValue for serde_json::Value {
    fn into_value(self) -> Value {
        Value::Json(self)
    }
}

/// The right hand side of a condition: a single value or an ordered list.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    One(Value),
    Many(Vec<Value>),
}

impl Operand {
    pub fn len(&self) -> usize {
        match self {
            Operand::One(_) => 1,
            Operand::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl<T> IntoOperand for T
where
    T: IntoValue,
{
    fn into_operand(self) -> Operand {
        Operand::One(self.into_value())
    }
}

impl<T> IntoOperand for Vec<T>
where
    T: IntoValue,
{
    fn into_operand(self) -> Operand {
        Operand::Many(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T, const N: usize> IntoOperand for [T; N]
where
    T: IntoValue,
{
    fn into_operand(self) -> Operand {
        Operand::Many(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T> IntoOperand for &[T]
where
    T: IntoValue + Clone,
{
    fn into_operand(self) -> Operand {
        Operand::Many(self.iter().cloned().map(IntoValue::into_value).collect())
    }
}

/// Values bound to a raw statement.
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValues for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl IntoValues for Vec<Value> {
    fn into_values(self) -> Vec<Value> {
        self
    }
}

impl<T, const N: usize> IntoValues for [T; N]
where
    T: IntoValue,
{
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(IntoValue::into_value).collect()
    }
}
