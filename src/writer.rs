use std::fmt::Write;

use crate::{dialect::Dialect, ident::Ident, value::Value};

pub(crate) trait FormatWriter {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result;
}

/// Rendering state shared by every fragment of one statement.
///
/// `placeholder` is the index of the last emitted placeholder, so the next
/// one written is `placeholder + 1`. Values bound while rendering land in
/// `binds` in placeholder order.
pub(crate) struct FormatContext<'a, W: Write> {
    pub(crate) writer: &'a mut W,
    pub(crate) dialect: Dialect,
    pub(crate) placeholder: usize,
    pub(crate) binds: Vec<Value>,
}

impl<'a, W: Write> FormatContext<'a, W> {
    pub fn new(writer: &'a mut W, dialect: Dialect) -> Self {
        Self {
            writer,
            dialect,
            placeholder: 0,
            binds: Vec::new(),
        }
    }

    /// Starts numbering after `placeholder` instead of zero.
    pub fn starting_at(writer: &'a mut W, dialect: Dialect, placeholder: usize) -> Self {
        Self {
            writer,
            dialect,
            placeholder,
            binds: Vec::new(),
        }
    }

    pub(crate) fn write_table(&mut self, ident: &str) -> std::fmt::Result {
        self.dialect.write_identifier(self.writer, ident)
    }

    pub(crate) fn write_idents(&mut self, idents: &[Ident]) -> std::fmt::Result {
        for (i, ident) in idents.iter().enumerate() {
            if i > 0 {
                self.writer.write_str(", ")?;
            }
            ident.format_writer(self)?;
        }
        Ok(())
    }

    pub(crate) fn write_placeholder(&mut self) -> std::fmt::Result {
        self.placeholder += 1;
        self.dialect.write_placeholder(self.writer, self.placeholder)
    }

    /// Writes the next placeholder and records the value bound to it.
    pub(crate) fn bind(&mut self, value: Value) -> std::fmt::Result {
        self.write_placeholder()?;
        self.binds.push(value);
        Ok(())
    }

    pub(crate) fn take_binds(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.binds)
    }
}

impl<T> FormatWriter for &T
where
    T: FormatWriter + ?Sized,
{
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> std::fmt::Result {
        (**self).format_writer(context)
    }
}

/// Renders a whole statement into a fresh string along with its binds.
pub(crate) fn render<F: FormatWriter + ?Sized>(
    fragment: &F,
    dialect: Dialect,
) -> (String, Vec<Value>) {
    let mut sql = String::with_capacity(256);
    let mut context = FormatContext::new(&mut sql, dialect);
    fragment
        .format_writer(&mut context)
        .expect("should not fail on a string writer");
    let binds = context.take_binds();
    (sql, binds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_numbers_placeholders() {
        let mut sql = String::new();
        let mut context = FormatContext::starting_at(&mut sql, Dialect::Postgres, 2);
        context.bind(Value::I64(1)).unwrap();
        context.writer.push_str(", ");
        context.bind(Value::Bool(true)).unwrap();
        assert_eq!(4, context.placeholder);
        assert_eq!(vec![Value::I64(1), Value::Bool(true)], context.take_binds());
        assert_eq!("$3, $4", sql);
    }

    #[test]
    fn test_bind_positional() {
        let mut sql = String::new();
        let mut context = FormatContext::new(&mut sql, Dialect::MySql);
        context.bind(Value::I64(1)).unwrap();
        context.bind(Value::I64(2)).unwrap();
        assert_eq!(2, context.placeholder);
        assert_eq!("??", sql);
    }
}
