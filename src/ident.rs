use std::{borrow::Cow, sync::Arc};

use smol_str::SmolStr;

use crate::writer::{self, FormatWriter};

/// A column or table name, optionally aliased with `name as alias`.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ident(SmolStr);

pub trait IntoIdent {
    fn into_ident(self) -> Ident;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> Ident {
        self
    }
}

impl IntoIdent for &str {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for &String {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for String {
    #[inline(always)]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for Arc<str> {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for Cow<'_, str> {
    #[inline]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

impl IntoIdent for SmolStr {
    #[inline(always)]
    fn into_ident(self) -> Ident {
        Ident::new(self)
    }
}

/// A list of identifiers, built from a single name or any collection of names.
pub trait IntoIdents {
    fn into_idents(self) -> Vec<Ident>;
}

impl<T: IntoIdent> IntoIdents for T {
    fn into_idents(self) -> Vec<Ident> {
        vec![self.into_ident()]
    }
}

impl<T: IntoIdent> IntoIdents for Vec<T> {
    fn into_idents(self) -> Vec<Ident> {
        self.into_iter().map(IntoIdent::into_ident).collect()
    }
}

impl<T: IntoIdent, const N: usize> IntoIdents for [T; N] {
    fn into_idents(self) -> Vec<Ident> {
        self.into_iter().map(IntoIdent::into_ident).collect()
    }
}

impl Ident {
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        T: Into<SmolStr>,
    {
        Self(value.into())
    }

    #[inline]
    pub fn new_static(value: &'static str) -> Self {
        Self(SmolStr::new_static(value))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn split_alias(&self) -> (&str, Option<&str>) {
        let s = self.0.as_str();
        match find_as(s.as_bytes()) {
            Some(idx) => (&s[..idx], Some(&s[idx + 4..])),
            None => (s, None),
        }
    }
}

impl FormatWriter for Ident {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut writer::FormatContext<'_, W>,
    ) -> std::fmt::Result {
        let (name, alias) = self.split_alias();
        context.write_table(name)?;
        if let Some(alias) = alias {
            context.writer.write_str(" AS ")?;
            context.dialect.write_identifier(context.writer, alias)?;
        }
        Ok(())
    }
}

/// Return the index of " as " in bytes case insensitive with no allocations.
fn find_as(h: &[u8]) -> Option<usize> {
    if h.len() < 4 {
        return None;
    }
    h.windows(4).position(|w| {
        w[0] == b' ' && w[3] == b' ' && (w[1] | 0x20) == b'a' && (w[2] | 0x20) == b's'
    })
}

#[cfg(test)]
mod tests {
    use crate::{dialect::Dialect, tests::format_writer};

    use super::*;

    #[test]
    fn test_find_as() {
        assert_eq!(Some(5), find_as(b"users as u"));
        assert_eq!(None, find_as(b"users"));
        assert_eq!(Some(5), find_as(b"users AS u as bob"));
    }

    #[test]
    fn test_format_ident_simple() {
        let ident = format_writer(Ident::new_static("users"), Dialect::Postgres);
        assert_eq!("\"users\"", ident);
        let ident = format_writer(Ident::new_static("users"), Dialect::MySql);
        assert_eq!("`users`", ident)
    }

    #[test]
    fn test_format_alias() {
        let ident = format_writer(Ident::new_static("users as foo"), Dialect::Postgres);
        assert_eq!("\"users\" AS \"foo\"", ident);
    }

    #[test]
    fn test_format_space_dot() {
        let ident = Ident::new_static("some space.x.y as some.table");
        let ident = format_writer(ident, Dialect::MySql);
        assert_eq!("`some space`.`x`.`y` AS `some.table`", ident);
    }

    #[test]
    fn test_into_idents() {
        assert_eq!(vec![Ident::new("id")], "id".into_idents());
        assert_eq!(2, ["id", "name"].into_idents().len());
    }
}
