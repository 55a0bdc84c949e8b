use std::fmt::Write;

use crate::{join::Join, order::OrderBy};

/// The SQL flavour a statement is rendered for.
///
/// Postgres uses numbered `$n` placeholders, MySQL and SQLite use positional
/// `?` placeholders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Picks a dialect from a driver name, falling back to Postgres.
    pub fn detect(driver: &str) -> Self {
        let driver = driver.to_ascii_lowercase();
        if driver.contains("pq") || driver.contains("postgres") {
            Dialect::Postgres
        } else if driver.contains("mysql") {
            Dialect::MySql
        } else if driver.contains("sqlite") {
            Dialect::Sqlite
        } else {
            Dialect::Postgres
        }
    }

    pub fn placeholder(&self, index: usize) -> String {
        let mut out = String::new();
        self.write_placeholder(&mut out, index)
            .expect("should not fail on a string writer");
        out
    }

    pub(crate) fn write_placeholder<W: Write>(
        &self,
        writer: &mut W,
        index: usize,
    ) -> std::fmt::Result {
        match self {
            Dialect::Postgres => write!(writer, "${index}"),
            Dialect::MySql | Dialect::Sqlite => writer.write_char('?'),
        }
    }

    pub(crate) fn quote_char(&self) -> char {
        match self {
            Dialect::Postgres | Dialect::Sqlite => '"',
            Dialect::MySql => '`',
        }
    }

    /// Quotes every dot separated part of an identifier, doubling embedded quotes.
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let mut out = String::with_capacity(identifier.len() + 2);
        self.write_identifier(&mut out, identifier)
            .expect("should not fail on a string writer");
        out
    }

    pub(crate) fn write_identifier<W: Write>(
        &self,
        writer: &mut W,
        identifier: &str,
    ) -> std::fmt::Result {
        for (i, part) in identifier.split('.').enumerate() {
            if i > 0 {
                writer.write_char('.')?;
            }
            self.write_ident_part(writer, part)?;
        }
        Ok(())
    }

    fn write_ident_part<W: Write>(&self, writer: &mut W, part: &str) -> std::fmt::Result {
        if part == "*" {
            return writer.write_char('*');
        }

        let quote = self.quote_char();
        writer.write_char(quote)?;

        let mut last = 0;
        for (index, char) in part.char_indices() {
            if char == quote {
                writer.write_str(&part[last..index])?;
                writer.write_char(quote)?;
                writer.write_char(quote)?;
                last = index + char.len_utf8();
            }
        }
        if last < part.len() {
            writer.write_str(&part[last..])?;
        }

        writer.write_char(quote)
    }

    pub fn build_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (self, limit, offset) {
            (_, None, None) => String::new(),
            (_, Some(limit), None) => format!("LIMIT {limit}"),
            (_, Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            // mysql refuses OFFSET without LIMIT
            (Dialect::MySql, None, Some(offset)) => {
                format!("LIMIT 18446744073709551615 OFFSET {offset}")
            }
            (_, None, Some(offset)) => format!("OFFSET {offset}"),
        }
    }

    pub fn build_order_by(&self, orders: &[OrderBy]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let mut out = String::from("ORDER BY ");
        for (i, order) in orders.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_identifier(&mut out, &order.column)
                .expect("should not fail on a string writer");
            out.push(' ');
            out.push_str(order.direction.as_str());
        }
        out
    }

    pub fn build_join(&self, join: &Join) -> String {
        let mut out = String::new();
        out.push_str(join.kind.as_str());
        out.push(' ');
        self.write_identifier(&mut out, &join.table)
            .expect("should not fail on a string writer");
        out.push_str(" ON ");
        out.push_str(&join.condition);
        out
    }

    pub fn supports_returning(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}
