use std::{any::TypeId, fmt, sync::Arc};

use smol_str::SmolStr;

use crate::{
    coerce::{CoerceError, Coercion},
    value::Value,
};

/// The unwrapped type a field is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int { bits: u8 },
    Uint { bits: u8 },
    Float { bits: u8 },
    String,
    Bool,
    Bytes,
    Other(&'static str),
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Int { bits } => write!(f, "i{bits}"),
            ScalarKind::Uint { bits } => write!(f, "u{bits}"),
            ScalarKind::Float { bits } => write!(f, "f{bits}"),
            ScalarKind::String => f.write_str("string"),
            ScalarKind::Bool => f.write_str("bool"),
            ScalarKind::Bytes => f.write_str("bytes"),
            ScalarKind::Other(name) => f.write_str(name),
        }
    }
}

/// Static description of one declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldShape {
    pub name: &'static str,
    /// `column[,option...]`, `"-"` for skipped fields, `None` when unannotated.
    pub tag: Option<&'static str>,
    pub visible: bool,
    pub optional: bool,
    pub kind: ScalarKind,
}

#[derive(Debug, Clone)]
pub struct RecordShape {
    /// Fully qualified type name.
    pub type_name: &'static str,
    /// Bare type name.
    pub name: &'static str,
    pub table_name: Option<fn() -> String>,
    /// Every declared field, in declaration order.
    pub fields: &'static [FieldShape],
}

#[derive(Debug, Clone)]
pub enum Shape {
    Record(RecordShape),
    /// A pointer-like wrapper around another model.
    Indirect { target: TypeId, shape: fn() -> Shape },
    Scalar(&'static str),
}

/// A type the metadata cache can be asked about.
///
/// Usually derived with `#[derive(Record)]`.
pub trait Model: 'static {
    fn shape() -> Shape;
}

/// A model whose fields can be written and read by declared position.
pub trait Record: Model + Default {
    fn assign(&mut self, position: usize, value: Value, mode: Coercion) -> Result<(), CoerceError>;

    /// The bind value of the field at `position`.
    fn value_at(&self, position: usize) -> Result<Value, CoerceError>;
}

macro_rules! scalar_model {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Model for $ty {
                fn shape() -> Shape {
                    Shape::Scalar(std::any::type_name::<$ty>())
                }
            }
        )+
    };
}

scalar_model!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char, String, SmolStr,
    Value,
);

impl<T: 'static> Model for Vec<T> {
    fn shape() -> Shape {
        Shape::Scalar(std::any::type_name::<Self>())
    }
}

impl<T: 'static> Model for Option<T> {
    fn shape() -> Shape {
        Shape::Scalar(std::any::type_name::<Self>())
    }
}

macro_rules! indirect_model {
    ($($wrapper:ident),+) => {
        $(
            impl<T: Model> Model for $wrapper<T> {
                fn shape() -> Shape {
                    Shape::Indirect {
                        target: TypeId::of::<T>(),
                        shape: T::shape,
                    }
                }
            }
        )+
    };
}

indirect_model!(Box, Arc);

impl<T: Model> Model for &'static T {
    fn shape() -> Shape {
        Shape::Indirect {
            target: TypeId::of::<T>(),
            shape: T::shape,
        }
    }
}
