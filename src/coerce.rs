//! Conversion of raw driver values into typed record fields.
//!
//! Every field type implements [`FieldValue`]. [`assign`] tries the fast
//! path first, an exact match between a driver value and the field's kind,
//! and falls back to [`FieldValue::convert`] for widening, truncation,
//! optional unwrapping and parsing.

use smol_str::SmolStr;
use thiserror::Error;

use crate::{model::ScalarKind, value::Value};

/// What happens when a column value has no representation in its field type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// The field keeps its zero value.
    #[default]
    Lenient,
    /// The scan fails with the field name.
    Strict,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoerceError {
    #[error("cannot convert {from} into {to}")]
    Unconvertible { from: &'static str, to: ScalarKind },

    #[error("no field at position {0}")]
    UnknownPosition(usize),

    #[error("{from} value {value} does not fit a signed 64-bit parameter")]
    Overflow { from: ScalarKind, value: u64 },
}

pub trait FieldValue: Default {
    const KIND: ScalarKind;
    const OPTIONAL: bool = false;

    /// Assigns a value that already has the field's exact kind.
    fn fast(&mut self, value: Value) -> Result<(), Value> {
        Err(value)
    }

    /// Assigns any other non-null value, handing it back when there is no conversion.
    fn convert(&mut self, value: Value) -> Result<(), Value>;

    /// Resets the field when the column is null.
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// The value bound for this field in a statement.
    fn to_value(&self) -> Result<Value, CoerceError>;
}

/// Coerces `value` into `field`.
///
/// A null value clears optional fields and leaves every other field as it
/// is. A value with no conversion leaves the field untouched unless `mode`
/// is strict, so an optional field stays `None` rather than holding the
/// inner type's zero value.
pub fn assign<F: FieldValue>(
    field: &mut F,
    value: Value,
    mode: Coercion,
) -> Result<(), CoerceError> {
    let value = match field.fast(value) {
        Ok(()) => return Ok(()),
        Err(value) => value,
    };

    if value.is_null() {
        if F::OPTIONAL {
            field.clear();
        }
        return Ok(());
    }

    match field.convert(value) {
        Ok(()) => Ok(()),
        Err(value) => {
            let error = CoerceError::Unconvertible {
                from: value.type_name(),
                to: F::KIND,
            };
            match mode {
                Coercion::Lenient => {
                    tracing::trace!(%error, "leaving field at its zero value");
                    Ok(())
                }
                Coercion::Strict => Err(error),
            }
        }
    }
}

macro_rules! signed {
    ($($ty:ty => $bits:literal),+) => {
        $(
            impl FieldValue for $ty {
                const KIND: ScalarKind = ScalarKind::Int { bits: $bits };

                #[inline]
                fn fast(&mut self, value: Value) -> Result<(), Value> {
                    match value {
                        Value::I64(i) => {
                            *self = i as $ty;
                            Ok(())
                        }
                        other => Err(other),
                    }
                }

                fn convert(&mut self, value: Value) -> Result<(), Value> {
                    match value {
                        Value::I64(i) => *self = i as $ty,
                        // truncates toward zero, then narrows like an integer
                        Value::F64(f) => *self = (f as i64) as $ty,
                        other => return Err(other),
                    }
                    Ok(())
                }

                fn to_value(&self) -> Result<Value, CoerceError> {
                    Ok(Value::I64(*self as i64))
                }
            }
        )+
    };
}

signed!(i8 => 8, i16 => 16, i32 => 32, i64 => 64, isize => 64);

macro_rules! unsigned {
    ($($ty:ty => $bits:literal),+) => {
        $(
            impl FieldValue for $ty {
                const KIND: ScalarKind = ScalarKind::Uint { bits: $bits };

                fn convert(&mut self, value: Value) -> Result<(), Value> {
                    match value {
                        Value::I64(i) if i >= 0 => *self = i as $ty,
                        Value::F64(f) if f >= 0.0 && f <= u64::MAX as f64 => {
                            *self = (f as u64) as $ty
                        }
                        other => return Err(other),
                    }
                    Ok(())
                }

                fn to_value(&self) -> Result<Value, CoerceError> {
                    i64::try_from(*self)
                        .map(Value::I64)
                        .map_err(|_| CoerceError::Overflow {
                            from: Self::KIND,
                            value: *self as u64,
                        })
                }
            }
        )+
    };
}

unsigned!(u8 => 8, u16 => 16, u32 => 32, u64 => 64, usize => 64);

macro_rules! float {
    ($($ty:ty => $bits:literal),+) => {
        $(
            impl FieldValue for $ty {
                const KIND: ScalarKind = ScalarKind::Float { bits: $bits };

                #[inline]
                fn fast(&mut self, value: Value) -> Result<(), Value> {
                    match value {
                        Value::F64(f) => {
                            *self = f as $ty;
                            Ok(())
                        }
                        other => Err(other),
                    }
                }

                fn convert(&mut self, value: Value) -> Result<(), Value> {
                    match value {
                        Value::F64(f) => *self = f as $ty,
                        Value::I64(i) => *self = i as $ty,
                        other => return Err(other),
                    }
                    Ok(())
                }

                fn to_value(&self) -> Result<Value, CoerceError> {
                    Ok(Value::F64(*self as f64))
                }
            }
        )+
    };
}

float!(f32 => 32, f64 => 64);

impl FieldValue for String {
    const KIND: ScalarKind = ScalarKind::String;

    #[inline]
    fn fast(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::String(s) => {
                *self = s;
                Ok(())
            }
            other => Err(other),
        }
    }

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::String(s) => *self = s,
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => *self = s,
                Err(error) => return Err(Value::Bytes(error.into_bytes())),
            },
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::String(self.clone()))
    }
}

impl FieldValue for SmolStr {
    const KIND: ScalarKind = ScalarKind::String;

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        let mut inner = String::new();
        inner.convert(value)?;
        *self = SmolStr::from(inner);
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::String(self.to_string()))
    }
}

impl FieldValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    #[inline]
    fn fast(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Bool(b) => {
                *self = b;
                Ok(())
            }
            other => Err(other),
        }
    }

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Bool(b) => *self = b,
            // sqlite and mysql hand booleans back as integers
            Value::I64(i) => *self = i != 0,
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Bool(*self))
    }
}

impl FieldValue for Vec<u8> {
    const KIND: ScalarKind = ScalarKind::Bytes;

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Bytes(bytes) => *self = bytes,
            Value::String(s) => *self = s.into_bytes(),
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Bytes(self.clone()))
    }
}

impl FieldValue for Value {
    const KIND: ScalarKind = ScalarKind::Other("value");

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        *self = value;
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(self.clone())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ScalarKind = T::KIND;
    const OPTIONAL: bool = true;

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        let mut inner = T::default();
        let value = match inner.fast(value) {
            Ok(()) => {
                *self = Some(inner);
                return Ok(());
            }
            Err(value) => value,
        };
        inner.convert(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(feature = "chrono")]
impl FieldValue for chrono::DateTime<chrono::Utc> {
    const KIND: ScalarKind = ScalarKind::Other("timestamp");

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Timestamp(t) => *self = t,
            Value::String(s) => match chrono::DateTime::parse_from_rfc3339(&s) {
                Ok(t) => *self = t.with_timezone(&chrono::Utc),
                Err(_) => return Err(Value::String(s)),
            },
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Timestamp(*self))
    }
}

#[cfg(feature = "uuid")]
impl FieldValue for uuid::Uuid {
    const KIND: ScalarKind = ScalarKind::Other("uuid");

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Uuid(u) => *self = u,
            Value::String(s) => match uuid::Uuid::parse_str(&s) {
                Ok(u) => *self = u,
                Err(_) => return Err(Value::String(s)),
            },
            Value::Bytes(b) => match uuid::Uuid::from_slice(&b) {
                Ok(u) => *self = u,
                Err(_) => return Err(Value::Bytes(b)),
            },
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Uuid(*self))
    }
}

#[cfg(feature = "json")]
impl FieldValue for serde_json::Value {
    const KIND: ScalarKind = ScalarKind::Other("json");

    fn convert(&mut self, value: Value) -> Result<(), Value> {
        match value {
            Value::Json(j) => *self = j,
            Value::String(s) => match serde_json::from_str(&s) {
                Ok(j) => *self = j,
                Err(_) => return Err(Value::String(s)),
            },
            Value::Bytes(b) => match serde_json::from_slice(&b) {
                Ok(j) => *self = j,
                Err(_) => return Err(Value::Bytes(b)),
            },
            other => return Err(other),
        }
        Ok(())
    }

    fn to_value(&self) -> Result<Value, CoerceError> {
        Ok(Value::Json(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient<F: FieldValue>(value: Value) -> F {
        let mut field = F::default();
        assign(&mut field, value, Coercion::Lenient).unwrap();
        field
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(42i8, lenient::<i8>(Value::I64(42)));
        assert_eq!(-7i16, lenient::<i16>(Value::I64(-7)));
        assert_eq!(3i32, lenient::<i32>(Value::F64(3.0)));
        assert_eq!(-3i64, lenient::<i64>(Value::F64(-3.9)));
    }

    #[test]
    fn test_out_of_width_wraps_from_any_source() {
        assert_eq!(44u8, lenient::<u8>(Value::I64(300)));
        assert_eq!(44u8, lenient::<u8>(Value::F64(300.0)));
        assert_eq!(-56i8, lenient::<i8>(Value::I64(200)));
        assert_eq!(-56i8, lenient::<i8>(Value::F64(200.7)));
        assert_eq!(lenient::<u16>(Value::I64(70_000)), lenient::<u16>(Value::F64(70_000.0)));
    }

    #[test]
    fn test_unsigned() {
        assert_eq!(7u32, lenient::<u32>(Value::I64(7)));
        assert_eq!(0u32, lenient::<u32>(Value::I64(-1)));
        assert_eq!(2u8, lenient::<u8>(Value::F64(2.5)));
        assert_eq!(0u64, lenient::<u64>(Value::F64(-2.5)));
        assert_eq!(0u64, lenient::<u64>(Value::F64(1e30)));
    }

    #[test]
    fn test_floats() {
        assert_eq!(1.5f32, lenient::<f32>(Value::F64(1.5)));
        assert_eq!(4.0f64, lenient::<f64>(Value::I64(4)));
    }

    #[test]
    fn test_strings_and_bytes() {
        assert_eq!("alice", lenient::<String>(Value::String("alice".into())));
        assert_eq!("bob", lenient::<String>(Value::Bytes(b"bob".to_vec())));
        assert_eq!("", lenient::<String>(Value::Bytes(vec![0xff, 0xfe])));
        assert_eq!(b"raw".to_vec(), lenient::<Vec<u8>>(Value::Bytes(b"raw".to_vec())));
        assert_eq!(b"txt".to_vec(), lenient::<Vec<u8>>(Value::String("txt".into())));
        assert_eq!(SmolStr::new("x"), lenient::<SmolStr>(Value::String("x".into())));
    }

    #[test]
    fn test_bool() {
        assert!(lenient::<bool>(Value::Bool(true)));
        assert!(lenient::<bool>(Value::I64(1)));
        assert!(!lenient::<bool>(Value::I64(0)));
    }

    #[test]
    fn test_optional() {
        assert_eq!(Some(5i32), lenient::<Option<i32>>(Value::I64(5)));
        assert_eq!(Some(2.0f64), lenient::<Option<f64>>(Value::I64(2)));
        assert_eq!(None, lenient::<Option<i32>>(Value::Null));
        assert_eq!(None, lenient::<Option<u8>>(Value::I64(-4)));

        let mut field = Some(String::from("stale"));
        assign(&mut field, Value::Null, Coercion::Lenient).unwrap();
        assert_eq!(None, field);
    }

    #[test]
    fn test_null_leaves_required_field() {
        let mut field = 9i64;
        assign(&mut field, Value::Null, Coercion::Strict).unwrap();
        assert_eq!(9, field);
    }

    #[test]
    fn test_mismatch() {
        assert_eq!(0i32, lenient::<i32>(Value::String("12".into())));

        let mut field = 0i32;
        let error = assign(&mut field, Value::String("12".into()), Coercion::Strict).unwrap_err();
        assert_eq!(
            CoerceError::Unconvertible {
                from: "string",
                to: ScalarKind::Int { bits: 32 }
            },
            error
        );
    }

    #[test]
    fn test_to_value() {
        assert_eq!(Ok(Value::I64(3)), 3u8.to_value());
        assert_eq!(Ok(Value::Null), None::<String>.to_value());
        assert_eq!(Ok(Value::String("a".into())), Some(String::from("a")).to_value());
        assert_eq!(Ok(Value::I64(i64::MAX)), (i64::MAX as u64).to_value());
    }

    #[test]
    fn test_unsigned_overflow_is_rejected() {
        assert_eq!(
            Err(CoerceError::Overflow {
                from: ScalarKind::Uint { bits: 64 },
                value: u64::MAX,
            }),
            u64::MAX.to_value()
        );
        assert!(matches!(Some(1u64 << 63).to_value(), Err(CoerceError::Overflow { .. })));
    }
}
