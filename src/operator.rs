use std::fmt;

/// The operators a WHERE or HAVING clause may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    LtGt,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
}

/// How an operator consumes its right hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// No bound value.
    Null,
    /// One placeholder per element of a non-empty list.
    Membership,
    /// Exactly two placeholders.
    Range,
    /// One placeholder.
    Comparison,
}

impl Operator {
    /// Matches an operator case-insensitively, ignoring surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        let operator = match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::NotEq,
            "<>" => Operator::LtGt,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            _ => return None,
        };
        Some(operator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::LtGt => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Operator::IsNull | Operator::IsNotNull => Family::Null,
            Operator::In | Operator::NotIn => Family::Membership,
            Operator::Between | Operator::NotBetween => Family::Range,
            _ => Family::Comparison,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
