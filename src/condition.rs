use smol_str::SmolStr;

use crate::{
    dialect::Dialect,
    error::{Error, Result},
    operator::{Family, Operator},
    value::{IntoOperand, Operand, Value},
    writer::{FormatContext, FormatWriter},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// One `column operator value` test, joined to the clause before it by `conjunction`.
///
/// The operator is kept as written and only checked when the statement is
/// rendered, so an unknown operator never reaches the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub column: SmolStr,
    pub operator: SmolStr,
    pub value: Operand,
    pub conjunction: Conjunction,
}

impl WhereClause {
    pub fn new<C, O, V>(conjunction: Conjunction, column: C, operator: O, value: V) -> Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into_operand(),
            conjunction,
        }
    }

    fn resolve(&self) -> Result<Operator> {
        let Some(operator) = Operator::parse(&self.operator) else {
            return Err(Error::InvalidOperator {
                column: self.column.clone(),
                operator: self.operator.clone(),
            });
        };

        let well_formed = match (operator.family(), &self.value) {
            (Family::Null, _) => true,
            (Family::Membership, Operand::Many(values)) => !values.is_empty(),
            (Family::Range, Operand::Many(values)) => values.len() == 2,
            (Family::Comparison, Operand::One(_)) => true,
            _ => false,
        };

        if !well_formed {
            return Err(Error::MalformedClause {
                column: self.column.clone(),
                operator: SmolStr::new_static(operator.as_str()),
            });
        }

        Ok(operator)
    }

    fn write_resolved<W: std::fmt::Write>(
        &self,
        operator: Operator,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        context.write_table(&self.column)?;
        context.writer.write_char(' ')?;
        context.writer.write_str(operator.as_str())?;

        match (operator.family(), &self.value) {
            (Family::Null, _) => Ok(()),
            (Family::Membership, Operand::Many(values)) => {
                context.writer.write_str(" (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        context.writer.write_str(", ")?;
                    }
                    context.bind(value.clone())?;
                }
                context.writer.write_char(')')
            }
            (Family::Range, Operand::Many(values)) => {
                context.writer.write_char(' ')?;
                context.bind(values[0].clone())?;
                context.writer.write_str(" AND ")?;
                context.bind(values[1].clone())
            }
            (_, Operand::One(value)) => {
                context.writer.write_char(' ')?;
                context.bind(value.clone())
            }
            // resolve() rejects every other shape
            _ => Ok(()),
        }
    }
}

/// An ordered list of clauses rendered as one boolean expression.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Conditions(pub(crate) Vec<WhereClause>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: WhereClause) {
        self.0.push(clause);
    }

    pub fn extend(&mut self, other: &Conditions) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WhereClause> {
        self.0.iter()
    }

    /// Whether at least one clause would produce SQL.
    pub fn has_renderable(&self) -> bool {
        self.0.iter().any(|clause| clause.resolve().is_ok())
    }

    /// Fails on the first clause that would be dropped.
    pub fn validate(&self) -> Result<()> {
        self.0.iter().try_for_each(|clause| clause.resolve().map(|_| ()))
    }

    /// Renders the clauses without a leading keyword.
    ///
    /// `param_index` is the last placeholder index already used by the
    /// statement and is advanced past every placeholder written here, so
    /// WHERE and HAVING of one statement share a single sequence. Returns an
    /// empty fragment when no clause renders.
    pub fn build(&self, dialect: Dialect, param_index: &mut usize) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut context = FormatContext::starting_at(&mut sql, dialect, *param_index);
        self.format_writer(&mut context)
            .expect("should not fail on a string writer");
        *param_index = context.placeholder;
        let binds = context.take_binds();
        (sql, binds)
    }
}

impl FormatWriter for Conditions {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        let mut emitted = false;
        for clause in &self.0 {
            let operator = match clause.resolve() {
                Ok(operator) => operator,
                Err(error) => {
                    tracing::trace!(
                        column = %clause.column,
                        operator = %clause.operator,
                        %error,
                        "skipping clause"
                    );
                    continue;
                }
            };
            if emitted {
                context.writer.write_char(' ')?;
                context.writer.write_str(clause.conjunction.as_str())?;
                context.writer.write_char(' ')?;
            }
            clause.write_resolved(operator, context)?;
            emitted = true;
        }
        Ok(())
    }
}

/// Writes ` KEYWORD conditions` when at least one clause renders.
pub(crate) fn write_clause<W: std::fmt::Write>(
    keyword: &str,
    conditions: &Conditions,
    context: &mut FormatContext<'_, W>,
) -> std::fmt::Result {
    if !conditions.has_renderable() {
        return Ok(());
    }
    context.writer.write_char(' ')?;
    context.writer.write_str(keyword)?;
    context.writer.write_char(' ')?;
    conditions.format_writer(context)
}
